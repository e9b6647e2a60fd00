// SPDX-License-Identifier: MIT

use super::*;
use chrono::Utc;

#[test]
fn end_reason_round_trips_through_str() {
    for reason in [EndReason::Client, EndReason::CrashRecovered] {
        let parsed: EndReason = reason.as_str().parse().unwrap();
        assert_eq!(parsed, reason);
    }
}

#[test]
fn session_is_active_until_ended() {
    let session = Session {
        session_id: SessionId::new(),
        agent_id: AgentId::from_string("agent:implementer:core:abc123abc123"),
        started_at: Utc::now(),
        ended_at: None,
        end_reason: None,
        last_seen_at: Utc::now(),
    };
    assert!(session.is_active());
}

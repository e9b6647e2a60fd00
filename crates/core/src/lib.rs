// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! thrum-core: identities, domain types, and event definitions shared by the
//! thrum repo-scoped multi-agent coordination daemon.

#[macro_use]
pub mod macros;

pub mod agent;
pub mod clock;
pub mod errors;
pub mod event;
pub mod group;
pub mod id;
pub mod message;
pub mod session;
pub mod subscription;
pub mod work_context;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{Agent, RegisterOutcome};
pub use clock::{Clock, FakeClock, SystemClock};
pub use errors::ThrumError;
pub use event::{Event, EventRecord};
pub use group::{Group, GroupMember};
pub use id::{
    derive_agent_id, everyone_group_id, is_valid_name, role_group_id, user_id, AgentId, AgentKind,
    EventId, GroupId, MessageId, SessionId, SubscriptionId, ThreadId, EVERYONE_GROUP_NAME,
};
pub use message::{BodyFormat, Message, MessageEdit, Ref, Scope};
pub use session::{EndReason, Session};
pub use subscription::Subscription;
pub use work_context::{AgentWorkContext, GitSnapshot, NullWorkContextExtractor, WorkContextError, WorkContextExtractor};

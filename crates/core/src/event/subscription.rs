// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::id::{SessionId, SubscriptionId};
use crate::message::Scope;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPayload {
    pub subscription_id: SubscriptionId,
    pub session_id: SessionId,
    pub scope: Option<Scope>,
    pub mention_role: Option<String>,
    pub all: bool,
}

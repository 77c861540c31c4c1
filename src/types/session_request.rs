use serde::{Deserialize, Serialize};

use crate::types::{Role, ThreadId};

/// Body posted to `/end_session` and `/review_session`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRequest {
    /// Thread being closed or reviewed.
    pub thread_id: ThreadId,
    /// Role the thread was opened for.
    pub role: Role,
}

impl SessionRequest {
    /// Creates a new session request.
    pub fn new(thread_id: ThreadId, role: Role) -> Self {
        Self { thread_id, role }
    }
}

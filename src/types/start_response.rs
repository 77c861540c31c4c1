use serde::{Deserialize, Serialize};

use crate::types::ThreadId;

/// Body returned by `GET /start?role=<role>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartResponse {
    /// The thread that subsequent turns must reference.
    pub thread_id: ThreadId,
}

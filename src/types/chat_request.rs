use serde::{Deserialize, Serialize};

use crate::types::{Role, ThreadId};

/// Body posted to `/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// Thread the message belongs to.
    pub thread_id: ThreadId,
    /// The user's text, already trimmed.
    pub message: String,
    /// Role the user is speaking as.
    pub role: Role,
}

impl ChatRequest {
    /// Creates a new chat request.
    pub fn new(thread_id: ThreadId, message: impl Into<String>, role: Role) -> Self {
        Self {
            thread_id,
            message: message.into(),
            role,
        }
    }
}

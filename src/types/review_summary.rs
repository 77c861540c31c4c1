use serde::{Deserialize, Serialize};

/// Body returned by `/review_session`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewSummary {
    /// Server-rendered HTML summary of the conversation so far.
    pub summary: String,
}

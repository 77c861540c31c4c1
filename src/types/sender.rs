use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person at the keyboard.
    User,
    /// The backend's reply.
    Assistant,
    /// Notices produced by the client itself.
    System,
}

impl Sender {
    /// The lowercase name used in CSS classes and serialized transcripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
            Sender::System => "system",
        }
    }

    /// The header shown above a message, if the sender has one.
    ///
    /// System notices are rendered without a header.
    pub fn header(&self) -> Option<&'static str> {
        match self {
            Sender::User => Some("You"),
            Sender::Assistant => Some("Assistant"),
            Sender::System => None,
        }
    }

    /// The capitalized name used in exported transcripts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "User",
            Sender::Assistant => "Assistant",
            Sender::System => "System",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Body returned by `/chat`.
///
/// A successful turn carries `response`.  The backend reports failures such as an unknown thread
/// by setting `error`, sometimes alongside a 4xx status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    /// Assistant text, usually markdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Backend-reported failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// A successful reply.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            error: None,
        }
    }

    /// A backend-reported failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            response: None,
            error: Some(message.into()),
        }
    }

    /// Extracts the assistant text, turning an `error` field into [`Error::Backend`].
    pub fn into_text(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(Error::backend(error));
        }
        self.response.ok_or_else(|| {
            Error::serialization("chat response carried neither `response` nor `error`", None)
        })
    }
}

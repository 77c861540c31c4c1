use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::markup;
use crate::types::Sender;

/// How a message's text was turned into HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderedAs {
    /// Text inserted as-is (escaped unless configured otherwise).
    Plain,
    /// Text passed through the markdown converter.
    Markdown,
    /// Server-produced HTML inserted verbatim.
    Html,
}

/// One entry of the transcript.
///
/// Messages are created on submit or when a response arrives and are never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Who authored the message.
    pub sender: Sender,
    /// The source text as typed or received.
    pub text: String,
    /// How `html` was produced from `text`.
    pub rendered_as: RenderedAs,
    /// Content HTML, without the surrounding container markup.
    pub html: String,
    /// When the message entered the transcript.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,
}

impl Message {
    fn new(sender: Sender, text: String, rendered_as: RenderedAs, html: String) -> Self {
        Self {
            sender,
            text,
            rendered_as,
            html,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// A message typed by the user.
    pub fn user(text: impl Into<String>, escape: bool) -> Self {
        let text = text.into();
        let html = if escape {
            markup::escape_html(&text)
        } else {
            text.clone()
        };
        Self::new(Sender::User, text, RenderedAs::Plain, html)
    }

    /// A reply from the backend, rendered as markdown.
    ///
    /// With `escape` set, raw HTML in the reply is neutralized before conversion.
    pub fn assistant(text: impl Into<String>, escape: bool) -> Self {
        let text = text.into();
        let html = if escape {
            markup::markdown_to_html(&markup::escape_html(&text))
        } else {
            markup::markdown_to_html(&text)
        };
        Self::new(Sender::Assistant, text, RenderedAs::Markdown, html)
    }

    /// A notice from the client itself.  Always escaped.
    pub fn system(text: impl Into<String>) -> Self {
        let text = text.into();
        let html = markup::escape_html(&text);
        Self::new(Sender::System, text, RenderedAs::Plain, html)
    }

    /// A system entry carrying server-rendered HTML, such as a review summary.
    pub fn system_html(html: impl Into<String>) -> Self {
        let html = html.into();
        Self::new(Sender::System, html.clone(), RenderedAs::Html, html)
    }

    /// Renders the message with its container markup.
    pub fn to_html(&self) -> String {
        markup::render_message_html(self)
    }
}

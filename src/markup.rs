//! HTML production for transcript entries.
//!
//! Markdown conversion is delegated to `pulldown-cmark`; this module only escapes text and wraps
//! content in the container layout the chat page styles against.

use pulldown_cmark::{Options, Parser, html};

use crate::types::Message;

/// Escapes the five HTML-significant characters.
pub fn escape_html(unsafe_text: &str) -> String {
    let mut escaped = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Converts markdown to an HTML fragment.
pub fn markdown_to_html(input: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(input, options);
    let mut output = String::new();
    html::push_html(&mut output, parser);
    output
}

/// Wraps a message's content HTML in its container.
pub fn render_message_html(message: &Message) -> String {
    let sender = message.sender.as_str();
    let mut out = format!(
        "<div class=\"message-container {sender}-container\">\n  <div class=\"message {sender}-message\">\n"
    );
    if let Some(header) = message.sender.header() {
        out.push_str(&format!("    <div class=\"message-header\">{header}</div>\n"));
    }
    out.push_str(&format!(
        "    <div class=\"message-content\">{}</div>\n  </div>\n</div>\n",
        message.html
    ));
    out
}

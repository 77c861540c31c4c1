//! Output rendering for the chat client.
//!
//! The client never writes to the terminal directly.  Every user-visible side effect (a new
//! transcript entry, the loading indicator, a warning) goes through a [`Renderer`], so the same
//! session logic can drive a terminal, an HTML page, or a test double.

use std::io::{self, Stdout, Write};

use scraper::{ElementRef, Html, Node};

use crate::types::{Message, RenderedAs, Sender, Theme};

/// ANSI escape code for bold text (used for message headers).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for system notices).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for system notices).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (user header on dark backgrounds).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for blue text (user header on light backgrounds).
const ANSI_BLUE: &str = "\x1b[34m";

/// ANSI escape code for green text (assistant header on dark backgrounds).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for magenta text (assistant header on light backgrounds).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for yellow text (used for alerts).
const ANSI_YELLOW: &str = "\x1b[33m";

/// Erases the current line and returns the cursor to column zero.
const ANSI_CLEAR_LINE: &str = "\r\x1b[2K";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording doubles in tests
pub trait Renderer: Send {
    /// Display a message that was just appended to the transcript.
    fn append_message(&mut self, message: &Message);

    /// The transcript was emptied.
    fn clear_transcript(&mut self) {}

    /// Show or hide the "waiting for a reply" indicator.
    fn set_loading(&mut self, loading: bool) {
        _ = loading;
    }

    /// Synchronously warn the user about rejected input or a backend complaint.
    fn alert(&mut self, warning: &str);

    /// Switch presentation to `theme`.
    fn apply_theme(&mut self, theme: Theme) {
        _ = theme;
    }

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Messages are written to stdout as they are appended; markdown replies are printed as their
/// source text.  Alerts and errors go to stderr.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    theme: Theme,
    loading: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            theme: Theme::default(),
            loading: false,
        }
    }

    /// The theme currently used for colors.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Flushes stdout to ensure immediate display.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn header_color(&self, sender: Sender) -> &'static str {
        match (sender, self.theme) {
            (Sender::User, Theme::Dark) => ANSI_CYAN,
            (Sender::User, Theme::Light) => ANSI_BLUE,
            (Sender::Assistant, Theme::Dark) => ANSI_GREEN,
            (Sender::Assistant, Theme::Light) => ANSI_MAGENTA,
            (Sender::System, _) => ANSI_DIM,
        }
    }

    fn clear_loading(&mut self) {
        if self.loading {
            if self.use_color {
                print!("{ANSI_CLEAR_LINE}");
                self.flush();
            }
            self.loading = false;
        }
    }

    /// Formats a message for the terminal.
    fn format_message(&self, message: &Message) -> String {
        let body = match message.rendered_as {
            RenderedAs::Plain | RenderedAs::Markdown => message.text.trim_end().to_string(),
            RenderedAs::Html => html_to_text(&message.html),
        };
        match (message.sender.header(), self.use_color) {
            (Some(header), true) => {
                let color = self.header_color(message.sender);
                format!("{ANSI_BOLD}{color}{header}:{ANSI_RESET} {body}\n")
            }
            (Some(header), false) => format!("{header}: {body}\n"),
            (None, true) => format!("{ANSI_DIM}{ANSI_ITALIC}{body}{ANSI_RESET}\n"),
            (None, false) => format!("[{body}]\n"),
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn append_message(&mut self, message: &Message) {
        self.clear_loading();
        let text = self.format_message(message);
        print!("{text}");
        self.flush();
    }

    fn clear_transcript(&mut self) {
        self.clear_loading();
        println!();
        self.flush();
    }

    fn set_loading(&mut self, loading: bool) {
        if loading == self.loading {
            return;
        }
        if loading {
            if self.use_color {
                print!("{ANSI_DIM}waiting for reply...{ANSI_RESET}");
            } else {
                println!("(waiting for reply)");
            }
            self.flush();
            self.loading = true;
        } else {
            self.clear_loading();
        }
    }

    fn alert(&mut self, warning: &str) {
        self.clear_loading();
        if self.use_color {
            eprintln!("{ANSI_YELLOW}{warning}{ANSI_RESET}");
        } else {
            eprintln!("Warning: {warning}");
        }
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    fn print_error(&mut self, error: &str) {
        self.clear_loading();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.clear_loading();
        println!("{info}");
        self.flush();
    }
}

/// Elements that start and end a line of their own.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Converts server HTML to terminal text: entities decoded, one line per block element.
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut lines = Vec::new();
    let mut line = String::new();
    collect_lines(fragment.root_element(), &mut lines, &mut line);
    finish_line(&mut lines, &mut line);
    lines.join("\n")
}

fn collect_lines(element: ElementRef<'_>, lines: &mut Vec<String>, line: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_text(line, text),
            Node::Element(el) => {
                let name = el.name();
                if matches!(name, "script" | "style") {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    finish_line(lines, line);
                }
                collect_lines(child, lines, line);
                if block {
                    finish_line(lines, line);
                }
            }
            _ => {}
        }
    }
}

/// Appends text with whitespace runs collapsed to one space.
fn push_text(line: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            if !line.is_empty() && !line.ends_with(' ') {
                line.push(' ');
            }
        } else {
            line.push(c);
        }
    }
}

fn finish_line(lines: &mut Vec<String>, line: &mut String) {
    let trimmed = line.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
    line.clear();
}

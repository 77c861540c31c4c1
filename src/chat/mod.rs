//! Role-play chat client.
//!
//! This module provides the session client and the pieces the terminal front end is built
//! from. It supports:
//!
//! - Selecting a role, which opens a backend thread for it
//! - Sending messages and rendering markdown replies
//! - Ending sessions and optional review summaries
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing and configuration
//! - `session`: The session client and its lifecycle
//! - `transcript`: The displayed messages and their exports
//! - `commands`: Slash command parsing and handling

mod commands;
mod config;
mod session;
mod transcript;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ClientConfig};
pub use session::{AbortHandle, ChatSessionClient, SESSION_STARTED_NOTICE};
pub use transcript::Transcript;

//! Client library for role-play chat backends.
//!
//! A backend exposes `GET /start?role=<role>`, `POST /chat`, `POST /end_session`, and optionally
//! `POST /review_session`.  [`ChatSessionClient`] drives those endpoints through a
//! [`ChatBackend`], keeps the transcript, and reports every visible effect through a
//! [`Renderer`].

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod markup;
pub mod preferences;
pub mod render;
pub mod types;
pub mod utils;

mod observability;

// Re-exports
pub use chat::{ChatSessionClient, ClientConfig, Transcript};
pub use client::{ChatBackend, HttpBackend};
pub use error::{Error, InputError, Result};
pub use observability::register_biometrics;
pub use preferences::{FileStore, MemoryStore, PreferenceStore, ThemeController};
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;

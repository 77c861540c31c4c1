//! Configuration types for the chat client.
//!
//! This module provides CLI argument parsing via `arrrg`, a YAML configuration file, and the
//! resolved [`ClientConfig`] that controls client behavior.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Theme;

/// Default backend location.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Command-line arguments for the rolechat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend base URL (default: http://127.0.0.1:5000/)", "URL")]
    pub base_url: Option<String>,

    /// Role to start a session with immediately.
    #[arrrg(optional, "Role to select on startup", "ROLE")]
    pub role: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Directory for persisted preferences.
    #[arrrg(optional, "Directory for persisted preferences", "DIR")]
    pub state_dir: Option<String>,

    /// Theme to apply and persist on startup.
    #[arrrg(optional, "Theme to apply on startup: light or dark", "THEME")]
    pub theme: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 120)", "SECS")]
    pub timeout: Option<u64>,

    /// Log filter.
    #[arrrg(optional, "Log filter, e.g. info or rolechat=debug (default: warn)", "FILTER")]
    pub log: Option<String>,

    /// Render assistant replies without escaping raw HTML first.
    #[arrrg(flag, "Pass raw HTML in assistant replies through to the renderer")]
    pub raw_assistant: bool,

    /// Enable the /review command.
    #[arrrg(flag, "Enable session review summaries")]
    pub review: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat client.
///
/// This struct holds the resolved configuration values after merging the configuration file and
/// command-line arguments over the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Escape HTML in user-typed text.
    pub escape_user_text: bool,

    /// Escape raw HTML in assistant text before markdown conversion.
    pub escape_assistant_text: bool,

    /// Allow `/review_session` calls.
    pub enable_review_summary: bool,

    /// Alert the user when the backend reports an error in its response body.
    pub surface_backend_errors: bool,

    /// Append a system line to the transcript when a turn fails.
    pub append_error_messages: bool,

    /// Whether to use ANSI colors and styles in terminal output.
    pub use_color: bool,

    /// Directory for persisted preferences.
    pub state_dir: Option<PathBuf>,

    /// Role to select on startup.
    pub initial_role: Option<String>,

    /// Theme to apply on startup, overriding the stored one.
    pub theme: Option<Theme>,

    /// Log filter directive.
    pub log_filter: Option<String>,
}

impl ClientConfig {
    /// Creates a new ClientConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: http://127.0.0.1:5000/
    /// - Timeout: 120 seconds
    /// - User and assistant text: escaped
    /// - Review summaries: disabled
    /// - Backend errors: surfaced, no transcript line
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            escape_user_text: true,
            escape_assistant_text: true,
            enable_review_summary: false,
            surface_backend_errors: true,
            append_error_messages: false,
            use_color: true,
            state_dir: None,
            initial_role: None,
            theme: None,
            log_filter: None,
        }
    }

    /// Load a configuration from a YAML file.  Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a YAML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .map_err(|err| Error::io("failed to write configuration", err))
    }

    /// Checks values that cannot be represented by the type alone.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::config("base_url must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be positive"));
        }
        Ok(())
    }

    /// The request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets whether user text is escaped.
    pub fn with_escape_user_text(mut self, escape: bool) -> Self {
        self.escape_user_text = escape;
        self
    }

    /// Sets whether assistant text is escaped before markdown conversion.
    pub fn with_escape_assistant_text(mut self, escape: bool) -> Self {
        self.escape_assistant_text = escape;
        self
    }

    /// Enables or disables review summaries.
    pub fn with_review_summary(mut self, enabled: bool) -> Self {
        self.enable_review_summary = enabled;
        self
    }

    /// Sets whether backend-reported errors are alerted.
    pub fn with_surface_backend_errors(mut self, surface: bool) -> Self {
        self.surface_backend_errors = surface;
        self
    }

    /// Sets whether failed turns leave a system line in the transcript.
    pub fn with_append_error_messages(mut self, append: bool) -> Self {
        self.append_error_messages = append;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the preferences directory.
    pub fn with_state_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.state_dir = dir;
        self
    }

    /// Merges command-line arguments over this configuration.
    pub fn merge_args(mut self, args: ChatArgs) -> Result<Self> {
        if let Some(base_url) = args.base_url {
            self.base_url = base_url;
        }
        if let Some(role) = args.role {
            self.initial_role = Some(role);
        }
        if let Some(dir) = args.state_dir {
            self.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(theme) = args.theme {
            self.theme = Some(theme.parse()?);
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(filter) = args.log {
            self.log_filter = Some(filter);
        }
        if args.raw_assistant {
            self.escape_assistant_text = false;
        }
        if args.review {
            self.enable_review_summary = true;
        }
        if args.no_color {
            self.use_color = false;
        }
        self.validate()?;
        Ok(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ClientConfig {
    type Error = Error;

    fn try_from(mut args: ChatArgs) -> Result<Self> {
        let base = match args.config.take() {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::new(),
        };
        base.merge_args(args)
    }
}

//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session without sending messages to the backend.

use crate::types::Theme;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Select a role, ending the current session and starting a new one.
    Role(String),

    /// End the current session.
    End,

    /// Ask the backend for a summary of the current session.
    Review,

    /// Switch to a specific theme.
    Theme(Theme),

    /// Flip between light and dark.
    ToggleTheme,

    /// Print the transcript.
    ShowTranscript,

    /// Export the transcript as markdown.
    Export(String),

    /// Save the transcript as JSON.
    SaveTranscript(String),

    /// Save the transcript as an HTML fragment.
    SaveHtml(String),

    /// Load a transcript saved as JSON.
    LoadTranscript(String),

    /// Display the selected role, thread, and settings.
    Status,

    /// Display help information.
    Help,

    /// End the session and exit.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use rolechat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/role village_chief").is_some());
/// assert!(parse_command("Hello, chief!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "role" => match argument {
            Some(role) => ChatCommand::Role(role.to_string()),
            None => ChatCommand::Invalid("/role requires a role name".to_string()),
        },
        "end" => ChatCommand::End,
        "review" | "summary" => ChatCommand::Review,
        "theme" => match argument {
            None => ChatCommand::ToggleTheme,
            Some(arg) if arg.eq_ignore_ascii_case("toggle") => ChatCommand::ToggleTheme,
            Some(arg) => match arg.parse::<Theme>() {
                Ok(theme) => ChatCommand::Theme(theme),
                Err(_) => {
                    ChatCommand::Invalid("/theme expects 'light', 'dark', or 'toggle'".to_string())
                }
            },
        },
        "transcript" | "history" => ChatCommand::ShowTranscript,
        "export" => path_command(argument, ChatCommand::Export, "/export"),
        "save" => path_command(argument, ChatCommand::SaveTranscript, "/save"),
        "html" => path_command(argument, ChatCommand::SaveHtml, "/html"),
        "load" => path_command(argument, ChatCommand::LoadTranscript, "/load"),
        "status" | "stats" => ChatCommand::Status,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn path_command<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(String) -> ChatCommand,
{
    match argument {
        Some(arg) => constructor(arg.to_string()),
        None => ChatCommand::Invalid(format!("{} requires a file path", name)),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /role <name>           Select a role and start a new conversation
  /end                   End the current conversation
  /review                Show a summary of the conversation (if enabled)
  /theme [light|dark]    Set the theme (no argument toggles it)
  /transcript            Print the current transcript
  /export <file>         Export the transcript as markdown
  /save <file>           Save the transcript as JSON
  /html <file>           Save the transcript as HTML
  /load <file>           Show a transcript saved with /save
  /status                Show role, thread, and settings
  /help                  Show this help message
  /quit                  End the conversation and exit"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_role() {
        assert_eq!(
            parse_command("/role village_chief"),
            Some(ChatCommand::Role("village_chief".to_string()))
        );
        assert_eq!(
            parse_command("/ROLE   merchant  "),
            Some(ChatCommand::Role("merchant".to_string()))
        );
        assert_eq!(
            parse_command("/role"),
            Some(ChatCommand::Invalid("/role requires a role name".to_string()))
        );
    }

    #[test]
    fn parse_theme() {
        assert_eq!(
            parse_command("/theme dark"),
            Some(ChatCommand::Theme(Theme::Dark))
        );
        assert_eq!(
            parse_command("/theme Light"),
            Some(ChatCommand::Theme(Theme::Light))
        );
        assert_eq!(parse_command("/theme"), Some(ChatCommand::ToggleTheme));
        assert_eq!(parse_command("/theme toggle"), Some(ChatCommand::ToggleTheme));
        assert!(matches!(
            parse_command("/theme neon"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
    }

    #[test]
    fn parse_file_commands() {
        assert_eq!(
            parse_command("/export transcripts/chief.md"),
            Some(ChatCommand::Export("transcripts/chief.md".to_string()))
        );
        assert_eq!(
            parse_command("/save chat.json"),
            Some(ChatCommand::SaveTranscript("chat.json".to_string()))
        );
        assert_eq!(
            parse_command("/html chat.html"),
            Some(ChatCommand::SaveHtml("chat.html".to_string()))
        );
        assert_eq!(
            parse_command("/load chat.json"),
            Some(ChatCommand::LoadTranscript("chat.json".to_string()))
        );
        assert!(matches!(
            parse_command("/load"),
            Some(ChatCommand::Invalid(msg)) if msg == "/load requires a file path"
        ));
        assert!(matches!(
            parse_command("/save"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/end"), Some(ChatCommand::End));
        assert_eq!(parse_command("/review"), Some(ChatCommand::Review));
        assert_eq!(parse_command("/transcript"), Some(ChatCommand::ShowTranscript));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Status));
        assert!(matches!(
            parse_command("/dance"),
            Some(ChatCommand::Invalid(msg)) if msg == "Unknown command: /dance"
        ));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello, chief!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/role"));
        assert!(help.contains("/theme"));
        assert!(help.contains("/export"));
    }
}

//! Interactive terminal client for role-play chat backends.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on the default address
//! rolechat
//!
//! # Point at another backend and start as a role right away
//! rolechat --base-url https://sim.example.com/ --role village_chief
//!
//! # Load settings from YAML and enable review summaries
//! rolechat --config rolechat.yaml --review
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/role <name>` - Select a role and start a conversation
//! - `/end` - End the current conversation
//! - `/theme [light|dark]` - Set or toggle the theme
//! - `/export <file>` - Export the transcript as markdown
//! - `/load <file>` - Show a transcript saved with `/save`
//! - `/quit` - End the conversation and exit
//!
//! Press Ctrl+C while waiting for a reply to cancel it.

use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use rolechat::chat::{
    ChatArgs, ChatCommand, ChatSessionClient, ClientConfig, PlainTextRenderer, Renderer,
    help_text, parse_command,
};
use rolechat::preferences::{FileStore, MemoryStore, PreferenceStore, os_theme_from_colorfgbg};
use rolechat::{ChatBackend, HttpBackend, Role};

/// Main entry point for the rolechat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("rolechat [OPTIONS]");
    let config = ClientConfig::try_from(args)?;
    init_logging(config.log_filter.as_deref());

    let backend = HttpBackend::with_options(Some(&config.base_url), Some(config.timeout()))?;
    let store = preference_store(&config);
    let os_theme = os_theme_from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref());
    let initial_role = config.initial_role.clone();
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut client = ChatSessionClient::with_preferences(backend, config, store, os_theme);
    renderer.apply_theme(client.theme());
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C while a reply is pending cancels the request.
    let abort = client.abort_handle();
    ctrlc::set_handler(move || {
        abort.abort();
    })?;

    println!("Role chat (backend: {})", client.backend().base_url());
    println!("Type /role <name> to begin, /help for commands, /quit to exit\n");

    if let Some(role) = initial_role {
        select_role(&mut client, &role, &mut renderer).await;
    }

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => break,
                        ChatCommand::Role(role) => {
                            select_role(&mut client, &role, &mut renderer).await;
                        }
                        ChatCommand::End => {
                            if client.end_session(&mut renderer).await {
                                renderer.print_info("Conversation ended.");
                            } else {
                                renderer.print_info("No active conversation.");
                            }
                        }
                        ChatCommand::Review => {
                            if let Err(err) = client.review_session(&mut renderer).await
                                && err.is_network()
                            {
                                renderer.print_error(&err.to_string());
                            }
                        }
                        ChatCommand::Theme(theme) => {
                            match client.set_theme(theme, &mut renderer) {
                                Ok(()) => renderer.print_info(&format!("Theme set to {theme}.")),
                                Err(err) => renderer
                                    .print_error(&format!("Theme applied but not saved: {err}")),
                            }
                        }
                        ChatCommand::ToggleTheme => {
                            let dark = !client.theme().is_dark();
                            match client.toggle_theme(dark, &mut renderer) {
                                Ok(()) => renderer
                                    .print_info(&format!("Theme set to {}.", client.theme())),
                                Err(err) => renderer
                                    .print_error(&format!("Theme applied but not saved: {err}")),
                            }
                        }
                        ChatCommand::ShowTranscript => {
                            for message in client.transcript().iter() {
                                renderer.append_message(message);
                            }
                        }
                        ChatCommand::Export(path) => {
                            let (Some(role), Some(thread_id)) = (client.role(), client.thread_id())
                            else {
                                renderer.print_error("No active conversation to export.");
                                continue;
                            };
                            match client.transcript().export_markdown(&path, role, thread_id) {
                                Ok(()) => {
                                    renderer.print_info(&format!("Transcript exported to {path}"))
                                }
                                Err(err) => renderer
                                    .print_error(&format!("Failed to export transcript: {err}")),
                            }
                        }
                        ChatCommand::SaveTranscript(path) => {
                            match client.transcript().save_json(&path) {
                                Ok(()) => {
                                    renderer.print_info(&format!("Transcript saved to {path}"))
                                }
                                Err(err) => renderer
                                    .print_error(&format!("Failed to save transcript: {err}")),
                            }
                        }
                        ChatCommand::SaveHtml(path) => match client.transcript().save_html(&path) {
                            Ok(()) => renderer.print_info(&format!("Transcript saved to {path}")),
                            Err(err) => {
                                renderer.print_error(&format!("Failed to save transcript: {err}"))
                            }
                        },
                        ChatCommand::LoadTranscript(path) => {
                            match client.load_transcript(&path, &mut renderer) {
                                Ok(count) => renderer
                                    .print_info(&format!("Loaded {count} messages from {path}")),
                                Err(err) => renderer
                                    .print_error(&format!("Failed to load transcript: {err}")),
                            }
                        }
                        ChatCommand::Status => print_status(&client),
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the backend
                if let Err(err) = client.send_message(line, &mut renderer).await {
                    if err.is_abort() {
                        renderer.print_info("[interrupted]");
                    } else if err.is_network() {
                        renderer.print_error(&err.to_string());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!();
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    client.end_session(&mut renderer).await;
    println!("Goodbye!");
    Ok(())
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn preference_store(config: &ClientConfig) -> Arc<dyn PreferenceStore> {
    let dir = config.state_dir.clone().or_else(|| {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".rolechat"))
    });
    match dir {
        Some(dir) => Arc::new(FileStore::in_dir(dir)),
        None => {
            tracing::warn!("no state directory; theme will not persist");
            Arc::new(MemoryStore::new())
        }
    }
}

async fn select_role<B: ChatBackend>(
    client: &mut ChatSessionClient<B>,
    role: &str,
    renderer: &mut dyn Renderer,
) {
    let role = match role.parse::<Role>() {
        Ok(role) => role,
        Err(err) => {
            renderer.print_error(&err.to_string());
            return;
        }
    };
    if let Err(err) = client.select_role(role, renderer).await {
        renderer.print_error(&format!("Could not start a conversation: {err}"));
    }
}

fn print_status<B: ChatBackend>(client: &ChatSessionClient<B>) {
    let config = client.config();
    println!("    Session Status:");
    match client.role() {
        Some(role) => println!("      Role: {role}"),
        None => println!("      Role: (none)"),
    }
    match client.thread_id() {
        Some(thread_id) => println!("      Thread: {thread_id}"),
        None => println!("      Thread: (no active conversation)"),
    }
    println!("      Messages: {}", client.transcript().len());
    println!("      Theme: {}", client.theme());
    println!("      Backend: {}", config.base_url);
    println!(
        "      Assistant HTML: {}",
        if config.escape_assistant_text {
            "escaped"
        } else {
            "raw"
        }
    );
    println!(
        "      Review summaries: {}",
        if config.enable_review_summary {
            "enabled"
        } else {
            "disabled"
        }
    );
}

//! The ordered, append-only record of the current conversation.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::error::{Error, Result};
use crate::types::{Message, Role, ThreadId};
use crate::utils::time::transcript_stamp;

/// Messages displayed for the current session, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if nothing has been displayed.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates over messages in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Returns the most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the messages as a slice.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Renders every message, in order, as one HTML fragment.
    pub fn to_html(&self) -> String {
        self.messages.iter().map(Message::to_html).collect()
    }

    /// Renders the transcript in the moderator export layout.
    pub fn to_markdown(&self, role: &Role, thread_id: &ThreadId) -> String {
        let mut out = format!("# Transcript for {role}\n_Thread ID: {thread_id}_\n---\n\n");
        let entries: Vec<String> = self
            .messages
            .iter()
            .map(|message| {
                format!(
                    "{} ({}): {}",
                    message.sender.display_name(),
                    transcript_stamp(&message.timestamp),
                    message.text
                )
            })
            .collect();
        out.push_str(&entries.join("\n\n"));
        out
    }

    /// Writes the markdown export to `path`, creating parent directories.
    pub fn export_markdown<P: AsRef<Path>>(
        &self,
        path: P,
        role: &Role,
        thread_id: &ThreadId,
    ) -> Result<()> {
        let path = path.as_ref();
        create_parent(path)?;
        fs::write(path, self.to_markdown(role, thread_id))
            .map_err(|err| Error::io("failed to write transcript export", err))
    }

    /// Writes the rendered HTML to `path`, creating parent directories.
    pub fn save_html<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        create_parent(path)?;
        fs::write(path, self.to_html())
            .map_err(|err| Error::io("failed to write transcript html", err))
    }

    /// Saves the transcript as versioned JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        create_parent(path)?;
        let file =
            File::create(path).map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &TranscriptFile::new(&self.messages)).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    /// Loads a transcript saved with [`Transcript::save_json`].
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|err| Error::io("failed to open transcript file", err))?;
        let reader = BufReader::new(file);
        let transcript: TranscriptFile = from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse transcript", Some(Box::new(err)))
        })?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(Error::serialization(
                format!("unsupported transcript version {}", transcript.version),
                None,
            ));
        }
        Ok(Self {
            messages: transcript.messages,
        })
    }
}

const TRANSCRIPT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    messages: Vec<Message>,
}

impl TranscriptFile {
    fn new(messages: &[Message]) -> Self {
        Self {
            version: TRANSCRIPT_VERSION,
            messages: messages.to_vec(),
        }
    }
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|err| Error::io("failed to create transcript directory", err)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sender;

    fn sample() -> Transcript {
        let mut transcript = Transcript::new();
        transcript.push(Message::system("New conversation started."));
        transcript.push(Message::user("Hello", true));
        transcript.push(Message::assistant("**Hi**", true));
        transcript
    }

    #[test]
    fn html_keeps_order() {
        let html = sample().to_html();
        let system = html.find("system-container").unwrap();
        let user = html.find("user-container").unwrap();
        let assistant = html.find("assistant-container").unwrap();
        assert!(system < user && user < assistant);
    }

    #[test]
    fn markdown_export_layout() {
        let role = Role::new("village_chief").unwrap();
        let thread = ThreadId::new("thread_1");
        let md = sample().to_markdown(&role, &thread);
        assert!(md.starts_with("# Transcript for village_chief\n_Thread ID: thread_1_\n---\n\n"));
        assert!(md.contains("\n\nUser ("));
        assert!(md.contains("): Hello\n\nAssistant ("));
        assert!(md.ends_with("): **Hi**"));
    }

    #[test]
    fn json_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.json");
        sample().save_json(&path).unwrap();
        let loaded = Transcript::load_json(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.last().unwrap().sender, Sender::Assistant);
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(&path, r#"{"version": 9, "messages": []}"#).unwrap();
        assert!(Transcript::load_json(&path).is_err());
    }

    #[test]
    fn clear_empties() {
        let mut transcript = sample();
        transcript.clear();
        assert!(transcript.is_empty());
        assert!(transcript.last().is_none());
    }
}

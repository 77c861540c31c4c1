//! Persistent client-side preferences.
//!
//! A [`PreferenceStore`] is a tiny string key/value store that outlives a single run of the
//! client.  The only key in use today is [`THEME_KEY`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::types::Theme;

/// Key under which the theme is stored.
pub const THEME_KEY: &str = "theme";

/// String key/value storage that survives restarts.
pub trait PreferenceStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// In-process store.  Share one instance through an `Arc` to simulate a reload.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::config("preference store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::config("preference store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a JSON object in a file.
///
/// A missing file reads as an empty store.  Every write rewrites the whole file through a
/// temporary sibling and a rename.  A file that does not parse is replaced on the next write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store at `path`.  Nothing is touched until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a store named `preferences.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join("preferences.json"))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => return Err(Error::io("failed to read preferences", err)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::config("preference store lock poisoned"))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::config("preference store lock poisoned"))?;
        let mut values = match self.read_all() {
            Ok(values) => values,
            Err(err @ Error::Io { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "overwriting unreadable preferences"
                );
                BTreeMap::new()
            }
        };
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|err| Error::io("failed to create preferences directory", err))?;
        }
        let content = serde_json::to_string_pretty(&values)?;
        let staging = self.staging_path();
        fs::write(&staging, content)
            .map_err(|err| Error::io("failed to write preferences", err))?;
        fs::rename(&staging, &self.path)
            .map_err(|err| Error::io("failed to replace preferences", err))
    }
}

/// Resolves and persists the light/dark preference.
pub struct ThemeController<S: PreferenceStore> {
    store: S,
    theme: Theme,
}

impl<S: PreferenceStore> ThemeController<S> {
    /// Loads the stored theme.
    ///
    /// A stored value always wins; `os_preference` only applies when nothing valid is stored.  An
    /// unreadable store or an unrecognized stored value is logged and treated as absent.
    pub fn load(store: S, os_preference: Option<Theme>) -> Self {
        let stored = match store.get(THEME_KEY) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "could not read stored theme");
                None
            }
        };
        let stored = stored.and_then(|value| match value.parse::<Theme>() {
            Ok(theme) => Some(theme),
            Err(err) => {
                tracing::warn!(value = %value, error = %err, "ignoring stored theme");
                None
            }
        });
        let theme = stored.or(os_preference).unwrap_or_default();
        Self { store, theme }
    }

    /// The theme currently in effect.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Applies and persists `theme`.
    ///
    /// The in-memory theme changes even if persisting fails; the error is returned so the caller
    /// can report it.
    pub fn set(&mut self, theme: Theme) -> Result<()> {
        self.theme = theme;
        self.store.set(THEME_KEY, theme.as_str())
    }

    /// Gives back the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }
}

/// Guesses the terminal's preference from `COLORFGBG` (`"<fg>;<bg>"`).
///
/// Background colors 0-6 and 8 are treated as dark.  Returns `None` when the variable is absent
/// or unparseable.
pub fn os_theme_from_colorfgbg(value: Option<&str>) -> Option<Theme> {
    let background = value?.rsplit(';').next()?.trim().parse::<u8>().ok()?;
    Some(Theme::from_dark(matches!(background, 0..=6 | 8)))
}

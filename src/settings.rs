//! Persisted settings — the tracker authentication token.
//!
//! The tracker mints one token per plugin identity and expects it back on
//! every reconnect, so the token must survive restarts. A small JSON file
//! stands in for the host application's settings store. Load failures
//! degrade to "no token" (forcing a fresh token request); save failures
//! are reported to the caller and logged there.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    vts_token: String,
}

/// Errors from writing the settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File-backed store for the persisted authentication token.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted token. Missing or unreadable files yield `None`.
    #[must_use]
    pub fn load(&self) -> Option<String> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no persisted settings");
                return None;
            }
        };
        let settings: SettingsFile = match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "settings file unreadable");
                return None;
            }
        };
        if settings.vts_token.is_empty() {
            return None;
        }
        Some(settings.vts_token)
    }

    /// Write the token back.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn save(&self, token: &str) -> Result<(), SettingsError> {
        let settings = SettingsFile { vts_token: token.to_owned() };
        let text = serde_json::to_string_pretty(&settings)?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

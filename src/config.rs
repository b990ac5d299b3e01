//! Config module - journal configuration (giournal.toml).
//!
//! The configuration is loaded once at startup and passed by reference into every
//! component; there is no global configuration state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration file path
pub const CONFIG_ENV: &str = "GIOURNAL_CONFIG";

/// Journal configuration, persisted as a flat TOML record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfiguration {
    /// Directory holding the entry files (and the git working tree)
    pub journal_path: PathBuf,

    /// Pull before and push after every mutation
    #[serde(default)]
    pub sync_to_git: bool,

    /// Remote URL (e.g. git@github.com:user/journal.git)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_remote: Option<String>,

    /// Store the password in the OS keyring
    #[serde(default = "default_use_keychain")]
    pub use_keychain: bool,

    /// Editor command, may include arguments (`code --wait`)
    #[serde(default = "default_editor")]
    pub editor_path: String,
}

fn default_use_keychain() -> bool {
    true
}

fn default_editor() -> String {
    "vi".to_string()
}

/// Default journal directory (~/journal)
pub fn default_journal_path() -> PathBuf {
    dirs::home_dir()
        .map(|d| d.join("journal"))
        .unwrap_or_else(|| PathBuf::from("./journal"))
}

/// Default config directory (~/.config/giournal/)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("giournal"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default config file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("giournal.toml")
}

impl Default for JournalConfiguration {
    fn default() -> Self {
        Self {
            journal_path: default_journal_path(),
            sync_to_git: false,
            git_remote: None,
            use_keychain: default_use_keychain(),
            editor_path: default_editor(),
        }
    }
}

impl JournalConfiguration {
    /// Config for a local-only journal at `journal_path`
    pub fn with_journal_path(journal_path: PathBuf) -> Self {
        Self {
            journal_path,
            ..Self::default()
        }
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("cannot parse config file {}: {}", path.display(), e))
        })
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create the parent directory if missing
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("cannot serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Remote URL, if syncing is enabled
    pub fn sync_remote(&self) -> Option<&str> {
        if self.sync_to_git {
            self.git_remote.as_deref()
        } else {
            None
        }
    }
}

/// Answers collected by the first-run initializer.
#[derive(Debug, Clone)]
pub struct InitAnswers {
    /// Empty means the default journal path
    pub journal_path: String,
    pub use_keychain: bool,
    pub sync_to_git: bool,
    /// Ignored unless syncing
    pub git_remote: String,
    /// Empty means `vi`
    pub editor_path: String,
}

impl Default for InitAnswers {
    fn default() -> Self {
        Self {
            journal_path: String::new(),
            use_keychain: true,
            sync_to_git: true,
            git_remote: String::new(),
            editor_path: String::new(),
        }
    }
}

impl InitAnswers {
    /// Build the configuration the initializer will write.
    pub fn into_config(self) -> JournalConfiguration {
        let journal_path = match self.journal_path.trim() {
            "" => default_journal_path(),
            path => PathBuf::from(path),
        };
        let git_remote = match self.git_remote.trim() {
            remote if self.sync_to_git && !remote.is_empty() => Some(remote.to_string()),
            _ => None,
        };
        let editor_path = match self.editor_path.trim() {
            "" => default_editor(),
            editor => editor.to_string(),
        };

        JournalConfiguration {
            journal_path,
            sync_to_git: self.sync_to_git,
            git_remote,
            use_keychain: self.use_keychain,
            editor_path,
        }
    }
}

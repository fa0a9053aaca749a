use std::{fs, path::{Path, PathBuf}};

use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use which::which;

use crate::{MkError, Result};

/// Environment variable overriding the notes directory
pub const NOTES_DIR_ENV: &str = "MKDOWN_DIR";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Directory holding the index and the note files
    pub notes_dir: PathBuf,

    /// Command used to open notes for editing
    #[serde(default)]
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notes_dir: default_notes_dir(),
            editor_command: None,
        }
    }
}

impl Config {
    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| MkError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&raw).map_err(|e| MkError::ConfigError {
            message: format!("invalid config {}: {}", path.display(), e),
        })
    }

    /// Builds the effective config. The notes directory comes from the
    /// command line, then `MKDOWN_DIR`, then the config file, then the
    /// platform data directory.
    pub fn resolve(config_file: Option<&Path>, notes_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        let from_env = std::env::var_os(NOTES_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        if let Some(dir) = notes_dir.or(from_env) {
            config.notes_dir = dir;
        }

        debug!("Using notes directory {}", config.notes_dir.display());
        Ok(config)
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            if !editor.trim().is_empty() {
                return editor;
            }
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -W -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

/// Platform data directory for mkdown, or `./files` when none can be determined.
pub fn default_notes_dir() -> PathBuf {
    ProjectDirs::from("", "", "mkdown")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("files"))
}

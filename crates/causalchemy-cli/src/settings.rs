use std::path::{Path, PathBuf};

use causalchemy_core::TieBreak;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "causalchemy.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// CLI defaults. Command-line flags override these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    pub run_dir: PathBuf,
    pub log_filter: String,
    pub tie_break: Option<TieBreak>,
    pub dependence_threshold: f64,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            run_dir: PathBuf::from("runs"),
            log_filter: "info".to_string(),
            tie_break: None,
            dependence_threshold: 0.1,
        }
    }
}

impl CliSettings {
    /// Load an explicit settings file, or `causalchemy.toml` when present.
    /// A missing default file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let path = Path::new(SETTINGS_FILE);
                if path.exists() {
                    Self::from_path(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(contents)?)
    }
}

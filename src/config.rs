//! Session configuration
//!
//! Stored as JSON. A missing or unreadable file yields the defaults.

use crate::error::ComputeError;
use crate::types::{DEFAULT_CONFIDENCE, DEFAULT_SESSION_LENGTH};
use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default number of attempts when persisting a submission
pub const DEFAULT_SUBMISSION_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuizConfig {
    /// Questions per session
    pub session_length: usize,
    /// Whether a participant may advance without selecting an answer
    pub allow_skip: bool,
    /// Confidence recorded when the slider is untouched
    pub default_confidence: u8,
    /// Attempts before a submission is reported as failed
    pub submission_attempts: u32,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            session_length: DEFAULT_SESSION_LENGTH,
            allow_skip: true,
            default_confidence: DEFAULT_CONFIDENCE,
            submission_attempts: DEFAULT_SUBMISSION_ATTEMPTS,
        }
    }
}

impl QuizConfig {
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.session_length == 0 {
            return Err(ComputeError::InvalidConfig(
                "session_length must be at least 1".to_string(),
            ));
        }
        if !(1..=5).contains(&self.default_confidence) {
            return Err(ComputeError::InvalidConfig(format!(
                "default_confidence must be between 1 and 5, got {}",
                self.default_confidence
            )));
        }
        if self.submission_attempts == 0 {
            return Err(ComputeError::InvalidConfig(
                "submission_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> QuizConfig;
    fn save(&self, cfg: &QuizConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "scaffold-flux") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("scaffold_flux_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> QuizConfig {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return QuizConfig::default(),
        };
        match serde_json::from_slice::<QuizConfig>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(
                    "ignoring invalid config at {}: {}",
                    self.path.display(),
                    e
                );
                QuizConfig::default()
            }
        }
    }

    fn save(&self, cfg: &QuizConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::session::{SessionConfig, ADVANCE_DELAY_MS, DEFAULT_SECS_PER_QUESTION};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Catalog document; falls back to the state dir when unset.
    pub data_path: Option<PathBuf>,
    /// Score document; falls back to the state dir when unset.
    pub scores_path: Option<PathBuf>,
    pub default_secs_per_question: u32,
    pub advance_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            scores_path: None,
            default_secs_per_question: DEFAULT_SECS_PER_QUESTION,
            advance_delay_ms: ADVANCE_DELAY_MS,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            default_secs_per_question: cfg.default_secs_per_question.max(1),
            advance_delay: Duration::from_millis(cfg.advance_delay_ms),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "logiq") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("logiq_config.json")
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
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable config {}: {e}", self.path.display()),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

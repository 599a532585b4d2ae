use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("logiq"),
            )
        } else {
            ProjectDirs::from("", "", "logiq").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn data_path() -> PathBuf {
        Self::in_state_dir("games.json")
    }

    pub fn scores_path() -> PathBuf {
        Self::in_state_dir("scores.json")
    }

    pub fn log_path() -> PathBuf {
        Self::in_state_dir("logiq.log")
    }

    fn in_state_dir(file: &str) -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join(file))
            .unwrap_or_else(|| PathBuf::from(file))
    }
}

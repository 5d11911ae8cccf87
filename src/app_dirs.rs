use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "numtype";
const CONFIG_FILE: &str = "config.json";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Platform config location, or the working directory when no home is known
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .map(|dir| dir.join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(format!("{APP_NAME}_{CONFIG_FILE}")))
    }

    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
    }
}

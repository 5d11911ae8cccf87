use crate::app_dirs::AppDirs;
use crate::keymap::KeyboardConfig;
use crate::session::{Routing, SessionConfig, DEFAULT_DURATION_SECS};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub duration_secs: u32,
    /// Unset means pick from what the terminal can tell apart
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<Routing>,
    pub player_one: KeyboardConfig,
    pub player_two: KeyboardConfig,
    /// Replaces the built-in sentence list when set
    pub sentences: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            routing: None,
            player_one: KeyboardConfig::player_one(),
            player_two: KeyboardConfig::player_two(),
            sentences: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "duration_secs must be at least 1".to_string(),
            ));
        }

        for (name, keyboard) in [("player_one", &self.player_one), ("player_two", &self.player_two)]
        {
            if let Some(key) = keyboard.empty_keys().first() {
                return Err(ConfigError::Invalid(format!(
                    "{name}: key {key:?} has no candidate characters"
                )));
            }
        }

        Ok(())
    }

    /// Fill in the routing when neither the file nor the command line chose one.
    ///
    /// Device routing needs the keypad to report as its own location; without
    /// that both keyboards share one fingerprint and player 2 never gets a key.
    pub fn settle_routing(&mut self, keypad_distinct: bool) -> Routing {
        if let Some(routing) = self.routing {
            return routing;
        }
        let routing = if keypad_distinct {
            Routing::Device
        } else {
            warn!("terminal cannot tell the keypad apart, routing by key set");
            Routing::KeySet
        };
        self.routing = Some(routing);
        routing
    }

    /// Session settings for one or two players
    pub fn session_config(&self, two_player: bool) -> SessionConfig {
        let config = if two_player {
            SessionConfig::head_to_head(
                self.player_one.clone(),
                self.player_two.clone(),
                self.routing.unwrap_or_default(),
            )
        } else {
            SessionConfig::single(self.player_one.clone())
        };
        config.with_duration(self.duration_secs)
    }
}

pub trait ConfigStore {
    /// Stored config, or defaults when missing or unreadable
    fn load(&self) -> Config;
    fn try_load(&self) -> Result<Option<Config>, ConfigError>;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
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
        match self.try_load() {
            Ok(Some(cfg)) => cfg,
            Ok(None) => Config::default(),
            Err(err) => {
                warn!("using default config: {err}");
                Config::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Config>, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let cfg: Config = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        cfg.validate()?;
        Ok(Some(cfg))
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, data).map_err(io_err)
    }
}

//! Layered application settings

use camera_capture::CameraConfig;
use config::{Config, ConfigError, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the settings file
pub const CONFIG_PATH_ENV: &str = "DROWSY_CONFIG";

/// Settings file used when `DROWSY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "drowsiness.toml";

/// Top-level settings for the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// HTTP listen address
    pub listen_addr: String,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Start recording as soon as the pipeline is up
    pub auto_start: bool,
    pub camera: CameraConfig,
    pub dms: DmsConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            auto_start: false,
            camera: CameraConfig::default(),
            dms: DmsConfig::default(),
        }
    }
}

impl AppSettings {
    /// Defaults, then the optional settings file, then `DROWSY__*` variables
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("DROWSY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::geo::Coordinate;
use crate::resume::Language;

pub const APP_DIR: &str = "footprint";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub language: Language,
    /// Resume TOML to load instead of the bundled sample.
    pub resume_path: Option<PathBuf>,
    pub map: MapConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub initial_center: Coordinate,
    pub initial_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom used for focus requests coming from location chips.
    pub focus_zoom: f64,
    /// Zoom used when a highlight resolves to a single marker.
    pub highlight_zoom: f64,
    pub fit_padding: f64,
    pub camera_duration_ms: u64,
    pub pulse_interval_ms: u64,
    pub tile_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub endpoint: String,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::En,
            resume_path: None,
            map: MapConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_center: Coordinate::new(55.0, 15.0),
            initial_zoom: 4.0,
            min_zoom: 2.0,
            max_zoom: 16.0,
            focus_zoom: 10.0,
            highlight_zoom: 8.0,
            fit_padding: 48.0,
            camera_duration_ms: 800,
            pulse_interval_ms: 1000,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_retries: 3,
            initial_backoff_ms: 1000,
        }
    }
}

impl AssistantConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl Config {
    /// `~/.config/footprint/config.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Loads the user config, falling back to defaults when there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

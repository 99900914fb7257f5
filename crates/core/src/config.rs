use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigIntervals {
    pub liveness_poll_ms: u64,
    pub search_debounce_ms: u64,
    pub file_watch_poll_ms: u64,
}

impl Default for ConfigIntervals {
    fn default() -> Self {
        Self {
            liveness_poll_ms: 2_000,
            search_debounce_ms: 500,
            file_watch_poll_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub api_base: String,
    pub search_limit: u32,
    pub new_releases_limit: u32,
    pub placeholder_cover: String,
    /// Unset means requests wait as long as the transport allows.
    pub request_timeout_ms: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            search_limit: 20,
            new_releases_limit: 12,
            placeholder_cover: "https://picsum.photos/200/200".to_string(),
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub api_base: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub initial_volume: u8,
    pub mpv_binary: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: 50,
            mpv_binary: "mpv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub log_level: String,
    pub token_path: Option<PathBuf>,
    pub intervals: ConfigIntervals,
    pub catalog: CatalogConfig,
    pub recommend: RecommendConfig,
    pub player: PlayerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: "info".to_string(),
            token_path: None,
            intervals: ConfigIntervals::default(),
            catalog: CatalogConfig::default(),
            recommend: RecommendConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn token_path_or_default(&self) -> PathBuf {
        self.token_path.clone().unwrap_or_else(default_token_path)
    }
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lumina")
}

pub fn default_token_path() -> PathBuf {
    data_dir().join("token")
}

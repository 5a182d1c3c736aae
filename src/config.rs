use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:7878";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_endpoint")]
    pub backend_endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Artificial latency before the settings panel persists; 0 disables it.
    #[serde(default = "default_save_delay_ms")]
    pub save_delay_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_save_delay_ms() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_endpoint: default_endpoint(),
            request_timeout_secs: default_timeout_secs(),
            save_delay_ms: default_save_delay_ms(),
        }
    }
}

impl AppConfig {
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to {:?}", path);
        Ok(())
    }
}

pub fn app_data_dir() -> PathBuf {
    let base = std::env::var("APPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            format!("{}/.local/share", home)
        });
    PathBuf::from(base).join("com.nas-scanner.app")
}

pub fn load_config(config_path: &Path) -> AppConfig {
    if !config_path.exists() {
        info!("No config found, creating default config");
        let default = AppConfig::default();
        if let Err(e) = default.save(config_path) {
            warn!("Could not write default config: {}", e);
        }
        return default;
    }
    let content = std::fs::read_to_string(config_path).unwrap_or_default();
    match serde_json::from_str::<AppConfig>(&content) {
        Ok(c) => {
            info!("Config loaded from {:?}", config_path);
            c
        }
        Err(e) => {
            warn!("Config parse failed, using defaults: {}", e);
            AppConfig::default()
        }
    }
}

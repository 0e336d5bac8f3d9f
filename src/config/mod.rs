use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub web: WebConfig,
    pub upstream: UpstreamConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the rendering service.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per template tag. Shared
    /// with the rendering service, which reads it.
    pub templates_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub short_link_ttl_days: u64,
    pub short_link_capacity: usize,
    pub overlay_capacity: usize,
    pub thumbnail_max_dimension: u32,
    pub thumbnail_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 5001,
                base_url: "http://localhost:5001".to_string(),
            },
            upstream: UpstreamConfig {
                url: "http://api:5000".to_string(),
            },
            storage: StorageConfig {
                templates_path: PathBuf::from("./data/templates"),
            },
            cache: CacheConfig {
                short_link_ttl_days: 31,
                short_link_capacity: 4096,
                overlay_capacity: 256,
                thumbnail_max_dimension: 300,
                thumbnail_quality: 35,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::create_dir_all(&default_config.storage.templates_path)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}

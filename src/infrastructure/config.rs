//! Application configuration
//!
//! Settings are loaded from an optional JSON file and fall back to defaults;
//! `HOST` and `PORT` environment variables override the server section so the
//! binary can be pointed at a different interface without editing the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Politeness and retry settings for the page fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User-Agent pool; one entry is picked per request.
    pub user_agents: Vec<String>,

    /// Base delay between requests in milliseconds.
    pub download_delay_ms: u64,

    /// Randomize the delay between 50% and 150% of the base value.
    pub randomize_delay: bool,

    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Maximum attempts per URL (first try included).
    pub max_retries: u32,

    /// HTTP status codes that trigger a retry.
    pub retry_http_codes: Vec<u16>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agents: vec![
                "GlobalInsights/1.0 (Educational Purpose)".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15".to_string(),
            ],
            download_delay_ms: 1000,
            randomize_delay: true,
            request_timeout_seconds: 30,
            max_retries: 3,
            retry_http_codes: vec![400, 408, 429, 500, 502, 503, 504],
        }
    }
}

/// Where per-job result files are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub results_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
        }
    }
}

/// Logging output settings; `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Loads and saves the application configuration file.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Default config path, overridable with `GLOBAL_INSIGHTS_CONFIG`.
    pub fn new() -> Self {
        let config_path = std::env::var("GLOBAL_INSIGHTS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("global_insights.json"));
        Self { config_path }
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load the configuration, falling back to defaults when no file exists,
    /// then apply environment overrides.
    pub async fn load(&self) -> Result<AppConfig> {
        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)
                .await
                .with_context(|| format!("Failed to read config file: {:?}", self.config_path))?;
            let config: AppConfig = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file: {:?}", self.config_path))?;
            info!("Loaded configuration from {:?}", self.config_path);
            config
        } else {
            info!("No config file at {:?}, using defaults", self.config_path);
            AppConfig::default()
        };

        apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Persist the configuration (pretty JSON, parent directories created).
    pub async fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create config directory: {parent:?}"))?;
            }
        }
        let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(&self.config_path, json)
            .await
            .with_context(|| format!("Failed to write config file: {:?}", self.config_path))?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(host) = std::env::var("HOST") {
        if !host.is_empty() {
            config.server.host = host;
        }
    }
    if let Ok(port) = std::env::var("PORT") {
        if let Ok(port) = port.parse() {
            config.server.port = port;
        }
    }
}

/// Resolve a possibly-relative results dir against a base directory.
pub fn resolve_results_dir(base: &Path, storage: &StorageConfig) -> PathBuf {
    if storage.results_dir.is_absolute() {
        storage.results_dir.clone()
    } else {
        base.join(&storage.results_dir)
    }
}

//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub bot: BotConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub dedup: DedupConfig,
    pub notion: NotionConfig,
    pub encryption: EncryptionConfig,
    pub sync: SyncConfig,
    pub poller: PollerConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

/// How updates reach the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    Webhook,
    Polling,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: String,
    /// Bot username without the leading `@`
    pub username: String,
    pub mode: BotMode,
    pub webhook_secret: Option<String>,
    pub web_app_url: Option<String>,
    /// Override for the Bot API base URL
    pub api_url: Option<String>,
}

/// Webhook HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub webhook_path: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupBackend {
    Redis,
    Memory,
}

/// Update deduplication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    pub backend: DedupBackend,
    pub ttl_seconds: u64,
}

/// Notion API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotionConfig {
    pub api_base_url: String,
    pub api_version: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub requests_per_second: u32,
}

/// Credential encryption configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EncryptionConfig {
    pub key: String,
}

/// Background sync worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

/// Reconciliation poller configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub lookback_seconds: i64,
    pub page_size: u32,
}

/// Reminder and digest scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub reminders_enabled: bool,
    pub digest_enabled: bool,
    /// Hour of day (UTC) for the daily digest
    pub digest_hour: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily rolling log file
    pub file_path: String,
    pub json: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(config::File::with_name("config").required(false))
    }

    /// Load settings from an explicit TOML file, still honoring environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        Self::load(config::File::from(path.as_ref()).required(true))
    }

    fn load<S>(file: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("TODOBRIDGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::TodoBridgeError> {
        super::validation::validate_settings(self)
    }
}

impl NotionConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            dedup: DedupConfig::default(),
            notion: NotionConfig::default(),
            encryption: EncryptionConfig::default(),
            sync: SyncConfig::default(),
            poller: PollerConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            username: String::new(),
            mode: BotMode::Webhook,
            webhook_secret: None,
            web_app_url: None,
            api_url: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            webhook_path: "/telegram/webhook".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/todobridge".to_string(),
            max_connections: 10,
            min_connections: 1,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            prefix: "todobridge:".to_string(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            backend: DedupBackend::Redis,
            ttl_seconds: 24 * 60 * 60,
        }
    }
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.notion.com/v1".to_string(),
            api_version: "2022-06-28".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            initial_backoff_ms: 500,
            requests_per_second: 3,
        }
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self { key: String::new() }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
            lookback_seconds: 120,
            page_size: 100,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reminders_enabled: true,
            digest_enabled: true,
            digest_hour: 9,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: "logs".to_string(),
            json: false,
        }
    }
}

//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{TodoBridgeError, Result};
use super::Settings;

const MIN_ENCRYPTION_KEY_LEN: usize = 16;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_database_config(&settings.database)?;
    validate_encryption_config(&settings.encryption)?;
    validate_notion_config(&settings.notion)?;
    validate_sync_config(&settings.sync)?;
    validate_poller_config(&settings.poller)?;
    validate_scheduler_config(&settings.scheduler)?;
    validate_logging_config(&settings.logging)?;

    if settings.dedup.backend == super::DedupBackend::Redis && settings.redis.url.is_empty() {
        return Err(TodoBridgeError::Config(
            "Redis URL is required for the redis dedup backend".to_string()
        ));
    }

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(TodoBridgeError::Config(
            "Bot token is required".to_string()
        ));
    }

    if config.username.starts_with('@') {
        return Err(TodoBridgeError::Config(
            "Bot username must be configured without the leading '@'".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(TodoBridgeError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(TodoBridgeError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(TodoBridgeError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate the credential encryption key
fn validate_encryption_config(config: &super::EncryptionConfig) -> Result<()> {
    if config.key.len() < MIN_ENCRYPTION_KEY_LEN {
        return Err(TodoBridgeError::Config(format!(
            "Encryption key must be at least {} characters",
            MIN_ENCRYPTION_KEY_LEN
        )));
    }

    Ok(())
}

/// Validate Notion client configuration
fn validate_notion_config(config: &super::NotionConfig) -> Result<()> {
    if config.api_base_url.is_empty() {
        return Err(TodoBridgeError::Config(
            "Notion API base URL is required".to_string()
        ));
    }

    if config.requests_per_second == 0 {
        return Err(TodoBridgeError::Config(
            "Notion requests per second must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate sync worker pool configuration
fn validate_sync_config(config: &super::SyncConfig) -> Result<()> {
    if config.workers == 0 {
        return Err(TodoBridgeError::Config(
            "At least one sync worker is required".to_string()
        ));
    }

    if config.queue_capacity == 0 {
        return Err(TodoBridgeError::Config(
            "Sync queue capacity must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate poller configuration
fn validate_poller_config(config: &super::PollerConfig) -> Result<()> {
    if config.interval_seconds == 0 {
        return Err(TodoBridgeError::Config(
            "Poll interval must be greater than 0".to_string()
        ));
    }

    if config.lookback_seconds < 0 {
        return Err(TodoBridgeError::Config(
            "Poll lookback window cannot be negative".to_string()
        ));
    }

    // a page skipped in one cycle must still be inside the next one
    if (config.lookback_seconds as u64) < config.interval_seconds {
        return Err(TodoBridgeError::Config(
            "Poll lookback window must cover the poll interval".to_string()
        ));
    }

    Ok(())
}

/// Validate scheduler configuration
fn validate_scheduler_config(config: &super::SchedulerConfig) -> Result<()> {
    if config.digest_hour > 23 {
        return Err(TodoBridgeError::Config(
            "Digest hour must be between 0 and 23".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    let base_level = config.level.split(',').next().unwrap_or_default();
    if !valid_levels.contains(&base_level) {
        return Err(TodoBridgeError::Config(
            format!("Invalid log level: {}", config.level)
        ));
    }

    Ok(())
}

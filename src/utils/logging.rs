//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the sync engine.

use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::models::SyncStatus;
use crate::utils::errors::{Result, TodoBridgeError};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held
/// for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "todobridge.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(stdout_layer)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| TodoBridgeError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a task lifecycle event
pub fn log_task_event(task_id: Uuid, event: &str, actor: Option<&str>, details: Option<&str>) {
    info!(
        task_id = %task_id,
        event = event,
        actor = actor,
        details = details,
        "Task event"
    );
}

/// Log the outcome of an outbound sync attempt
pub fn log_sync_outcome(task_id: Uuid, status: SyncStatus, page_id: Option<&str>, error: Option<&str>) {
    match status {
        SyncStatus::Synced => info!(
            task_id = %task_id,
            page_id = page_id,
            "Task synced to Notion"
        ),
        SyncStatus::Failed => warn!(
            task_id = %task_id,
            page_id = page_id,
            error = error,
            "Task sync to Notion failed"
        ),
        SyncStatus::Pending => debug!(task_id = %task_id, "Task sync pending"),
    }
}

/// Log group events
pub fn log_group_event(group_id: i64, event: &str, user_id: Option<i64>, details: Option<&str>) {
    info!(
        group_id = group_id,
        event = event,
        user_id = user_id,
        details = details,
        "Group event occurred"
    );
}

/// Log a received Telegram update
pub fn log_update_received(update_id: i64, kind: &str, chat_id: Option<i64>) {
    debug!(
        update_id = update_id,
        kind = kind,
        chat_id = chat_id,
        "Telegram update received"
    );
}

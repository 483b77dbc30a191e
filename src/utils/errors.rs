//! Error handling for TodoBridge
//!
//! This module defines the main error type used throughout the application
//! and the classification helpers the retry and logging layers rely on.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for TodoBridge
#[derive(Error, Debug)]
pub enum TodoBridgeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Notion API error ({status}): {message}")]
    Notion { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: Uuid },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Group not found: {group_id}")]
    GroupNotFound { group_id: i64 },

    #[error("No Notion credential stored for user {user_id}")]
    CredentialNotFound { user_id: Uuid },

    #[error("Encryption error: {0}")]
    Crypto(String),

    #[error("Sync queue is full")]
    QueueFull,

    #[error("Sync queue is closed")]
    QueueClosed,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0} is already running")]
    AlreadyRunning(&'static str),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for TodoBridge operations
pub type Result<T> = std::result::Result<T, TodoBridgeError>;

impl TodoBridgeError {
    /// Check if the error is transient and worth retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            TodoBridgeError::Notion { status, .. } => *status == 429 || *status >= 500,
            TodoBridgeError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().map_or(false, |s| s.as_u16() == 429 || s.is_server_error())
            }
            TodoBridgeError::Telegram(_) => true,
            TodoBridgeError::Redis(_) => true,
            TodoBridgeError::Io(_) => true,
            TodoBridgeError::QueueFull => true,
            TodoBridgeError::Database(_)
            | TodoBridgeError::Migration(_)
            | TodoBridgeError::Config(_)
            | TodoBridgeError::TaskNotFound { .. }
            | TodoBridgeError::UserNotFound(_)
            | TodoBridgeError::GroupNotFound { .. }
            | TodoBridgeError::CredentialNotFound { .. }
            | TodoBridgeError::Crypto(_)
            | TodoBridgeError::QueueClosed
            | TodoBridgeError::Cancelled
            | TodoBridgeError::AlreadyRunning(_)
            | TodoBridgeError::Serialization(_)
            | TodoBridgeError::UrlParse(_)
            | TodoBridgeError::Unauthorized(_)
            | TodoBridgeError::InvalidInput(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TodoBridgeError::Database(_) => ErrorSeverity::Critical,
            TodoBridgeError::Migration(_) => ErrorSeverity::Critical,
            TodoBridgeError::Config(_) => ErrorSeverity::Critical,
            TodoBridgeError::Unauthorized(_) => ErrorSeverity::Warning,
            TodoBridgeError::QueueFull => ErrorSeverity::Warning,
            TodoBridgeError::Cancelled => ErrorSeverity::Info,
            TodoBridgeError::InvalidInput(_) => ErrorSeverity::Info,
            TodoBridgeError::TaskNotFound { .. }
            | TodoBridgeError::UserNotFound(_)
            | TodoBridgeError::GroupNotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Stable machine-readable code for API payloads
    pub fn code(&self) -> &'static str {
        match self {
            TodoBridgeError::TaskNotFound { .. } => "task_not_found",
            TodoBridgeError::UserNotFound(_) => "user_not_found",
            TodoBridgeError::GroupNotFound { .. } => "group_not_found",
            TodoBridgeError::CredentialNotFound { .. } => "notion_not_connected",
            TodoBridgeError::Unauthorized(_) => "unauthorized",
            TodoBridgeError::InvalidInput(_) => "invalid_input",
            TodoBridgeError::QueueFull | TodoBridgeError::QueueClosed => "sync_unavailable",
            TodoBridgeError::Notion { .. } => "notion_error",
            _ => "internal_error",
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

//! TodoBridge
//!
//! A Telegram to-do bot that turns chat messages into tasks and keeps them
//! in sync with Notion databases. This library provides the webhook
//! ingestion, the task store, the two-way Notion sync and the background
//! reminder and reconciliation loops.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{Result, TodoBridgeError};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use handlers::WebhookProcessor;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}

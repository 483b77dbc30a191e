//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub tg_id: i64,
    pub tg_username: Option<String>,
    pub name: String,
    pub photo_url: Option<String>,
    pub timezone: String,
    pub default_database_id: Option<String>,
    pub notion_connected: bool,
    pub calendar_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// `@username` when known, otherwise the display name
    pub fn handle(&self) -> String {
        match self.tg_username.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => format!("@{}", username),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub tg_id: i64,
    pub tg_username: Option<String>,
    pub name: String,
    pub photo_url: Option<String>,
}

/// Encrypted Notion credential of a user; the plaintext is never stored
#[derive(Debug, Clone, FromRow)]
pub struct UserNotionToken {
    pub user_id: Uuid,
    pub access_token_enc: String,
    pub workspace_id: String,
    pub workspace_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

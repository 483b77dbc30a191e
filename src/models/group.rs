//! Group model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "group_status")]
pub enum GroupStatus {
    Unbound,
    Connected,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "group_role")]
pub enum GroupRole {
    Admin,
    Member,
}

/// A Telegram group; `id` is the chat id
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub status: GroupStatus,
    pub database_id: Option<String>,
    pub database_name: String,
    /// Encrypted, empty when the group has no credential
    #[serde(skip_serializing)]
    pub notion_access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// A group the poller should reconcile
    pub fn has_active_binding(&self) -> bool {
        self.database_id.as_deref().map_or(false, |d| !d.is_empty()) && !self.notion_access_token.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserGroup {
    pub user_id: Uuid,
    pub group_id: i64,
    pub role: GroupRole,
    pub created_at: DateTime<Utc>,
}

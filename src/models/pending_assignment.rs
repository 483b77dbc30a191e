//! Assignment of a task to a username that has not talked to the bot yet

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingAssignment {
    pub id: Uuid,
    pub task_id: Uuid,
    /// Stored without the leading `@`
    pub tg_username: String,
    pub created_at: DateTime<Utc>,
}

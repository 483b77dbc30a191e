//! Raw Telegram update log

use async_trait::async_trait;
use sqlx::PgPool;

use super::UpdateStore;
use crate::models::TelegramUpdate;
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct UpdateRepository {
    pool: PgPool,
}

impl UpdateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UpdateStore for UpdateRepository {
    async fn save(&self, update_id: i64, raw: &serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO telegram_updates (update_id, raw_data)
            VALUES ($1, $2)
            ON CONFLICT (update_id) DO NOTHING
            "#,
        )
        .bind(update_id)
        .bind(raw)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_messages(&self, chat_id: i64, limit: i64) -> Result<Vec<TelegramUpdate>> {
        let updates = sqlx::query_as::<_, TelegramUpdate>(
            r#"
            SELECT update_id, raw_data, created_at
            FROM telegram_updates
            WHERE raw_data->'message'->'chat'->>'id' = $1
            ORDER BY created_at DESC, update_id DESC
            LIMIT $2
            "#,
        )
        .bind(chat_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(updates)
    }
}

//! Group repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::GroupStore;
use crate::models::group::{Group, GroupRole, GroupStatus};
use crate::utils::errors::Result;

const GROUP_COLUMNS: &str =
    "id, title, status, database_id, database_name, notion_access_token, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    async fn find(&self, id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!("SELECT {} FROM groups WHERE id = $1", GROUP_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    async fn upsert(&self, id: i64, title: &str, status: GroupStatus) -> Result<Group> {
        let group = sqlx::query_as::<_, Group>(&format!(
            r#"
            INSERT INTO groups (id, title, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title, status = EXCLUDED.status, updated_at = NOW()
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(id)
        .bind(title)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    async fn set_status(&self, id: i64, status: GroupStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE groups SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_member(&self, user_id: Uuid, group_id: i64, role: GroupRole) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, group_id) DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(role)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active_bindings(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(&format!(
            "SELECT {} FROM groups WHERE database_id IS NOT NULL AND notion_access_token <> '' ORDER BY id",
            GROUP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }
}

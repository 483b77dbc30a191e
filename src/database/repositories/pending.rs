//! Pending assignment repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::PendingAssignmentStore;
use crate::models::PendingAssignment;
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct PendingAssignmentRepository {
    pool: PgPool,
}

impl PendingAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingAssignmentStore for PendingAssignmentRepository {
    async fn create(&self, task_id: Uuid, tg_username: &str) -> Result<PendingAssignment> {
        let pending = sqlx::query_as::<_, PendingAssignment>(
            r#"
            INSERT INTO pending_assignments (task_id, tg_username)
            VALUES ($1, $2)
            RETURNING id, task_id, tg_username, created_at
            "#,
        )
        .bind(task_id)
        .bind(tg_username.trim_start_matches('@'))
        .fetch_one(&self.pool)
        .await?;

        Ok(pending)
    }

    async fn list_by_username(&self, tg_username: &str) -> Result<Vec<PendingAssignment>> {
        let pending = sqlx::query_as::<_, PendingAssignment>(
            r#"
            SELECT id, task_id, tg_username, created_at
            FROM pending_assignments
            WHERE LOWER(tg_username) = LOWER($1)
            ORDER BY created_at
            "#,
        )
        .bind(tg_username.trim_start_matches('@'))
        .fetch_all(&self.pool)
        .await?;

        Ok(pending)
    }

    async fn delete_by_username(&self, tg_username: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending_assignments WHERE LOWER(tg_username) = LOWER($1)")
            .bind(tg_username.trim_start_matches('@'))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

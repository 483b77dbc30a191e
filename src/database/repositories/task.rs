//! Task repository implementation

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::TaskStore;
use crate::models::{
    NewTask, SyncStatus, Task, TaskChanges, TaskComment, TaskContextSnapshot, TaskStatus, User,
};
use crate::utils::errors::{Result, TodoBridgeError};

const TASK_COLUMNS: &str = "id, title, description, status, sync_status, notion_page_id, notion_url, \
     group_id, database_id, topic, due_at, reminder_1h_sent, reminder_due_sent, archived, creator_id, \
     chat_jump_url, created_at, updated_at, deleted_at";

#[derive(FromRow)]
struct AssigneeRow {
    task_id: Uuid,
    #[sqlx(flatten)]
    user: User,
}

#[derive(Clone, Debug)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach assignees to a batch of tasks with one query
    async fn load_assignees(&self, tasks: &mut [Task]) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();

        let rows = sqlx::query_as::<_, AssigneeRow>(
            r#"
            SELECT ta.task_id, u.id, u.tg_id, u.tg_username, u.name, u.photo_url, u.timezone,
                   u.default_database_id, u.notion_connected, u.calendar_token, u.created_at, u.updated_at
            FROM task_assignees ta
            JOIN users u ON u.id = ta.user_id
            WHERE ta.task_id = ANY($1)
            ORDER BY ta.assigned_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_task: HashMap<Uuid, Vec<User>> = HashMap::new();
        for row in rows {
            by_task.entry(row.task_id).or_default().push(row.user);
        }
        for task in tasks.iter_mut() {
            task.assignees = by_task.remove(&task.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn load_snapshots(&self, task: &mut Task) -> Result<()> {
        task.snapshots = sqlx::query_as::<_, TaskContextSnapshot>(
            r#"
            SELECT id, task_id, role, author, text, tg_message_id, created_at
            FROM task_context_snapshots
            WHERE task_id = $1
            ORDER BY created_at, tg_message_id
            "#,
        )
        .bind(task.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for TaskRepository {
    async fn create(&self, new_task: NewTask) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let mut task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, sync_status, notion_page_id, notion_url,
                               group_id, database_id, topic, creator_id, chat_jump_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(new_task.status)
        .bind(new_task.sync_status)
        .bind(&new_task.notion_page_id)
        .bind(&new_task.notion_url)
        .bind(new_task.group_id)
        .bind(&new_task.database_id)
        .bind(&new_task.topic)
        .bind(new_task.creator_id)
        .bind(&new_task.chat_jump_url)
        .fetch_one(&mut *tx)
        .await?;

        for user_id in &new_task.assignee_ids {
            sqlx::query(
                r#"
                INSERT INTO task_assignees (task_id, user_id, assigned_by)
                VALUES ($1, $2, $3)
                ON CONFLICT (task_id, user_id) DO NOTHING
                "#,
            )
            .bind(task.id)
            .bind(user_id)
            .bind(new_task.creator_id)
            .execute(&mut *tx)
            .await?;
        }

        for snapshot in &new_task.snapshots {
            sqlx::query(
                r#"
                INSERT INTO task_context_snapshots (task_id, role, author, text, tg_message_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(task.id)
            .bind(snapshot.role)
            .bind(&snapshot.author)
            .bind(&snapshot.text)
            .bind(snapshot.tg_message_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.load_assignees(std::slice::from_mut(&mut task)).await?;
        self.load_snapshots(&mut task).await?;
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND deleted_at IS NULL",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match task {
            Some(mut task) => {
                self.load_assignees(std::slice::from_mut(&mut task)).await?;
                self.load_snapshots(&mut task).await?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn find_by_notion_page_id(&self, page_id: &str) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE notion_page_id = $1 AND deleted_at IS NULL",
            TASK_COLUMNS
        ))
        .bind(page_id)
        .fetch_optional(&self.pool)
        .await?;

        match task {
            Some(mut task) => {
                self.load_assignees(std::slice::from_mut(&mut task)).await?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn update_sync_state(
        &self,
        id: Uuid,
        sync_status: SyncStatus,
        page_id: Option<&str>,
        url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET sync_status = $2,
                notion_page_id = COALESCE($3, notion_page_id),
                notion_url = COALESCE($4, notion_url),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(sync_status)
        .bind(page_id)
        .bind(url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_fields(&self, id: Uuid, changes: &TaskChanges) -> Result<Task> {
        let due_changed = changes.due_at.is_some();
        let due_value = changes.due_at.flatten();

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                due_at = CASE WHEN $5 THEN $6 ELSE due_at END,
                reminder_1h_sent = CASE WHEN $5 THEN FALSE ELSE reminder_1h_sent END,
                reminder_due_sent = CASE WHEN $5 THEN FALSE ELSE reminder_due_sent END,
                sync_status = 'Pending',
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.status)
        .bind(due_changed)
        .bind(due_value)
        .fetch_optional(&self.pool)
        .await?;

        let mut task = task.ok_or(TodoBridgeError::TaskNotFound { task_id: id })?;
        self.load_assignees(std::slice::from_mut(&mut task)).await?;
        Ok(task)
    }

    async fn apply_remote(&self, id: Uuid, title: &str, status: TaskStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, status = $3, sync_status = 'Synced', updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_assignee(&self, task_id: Uuid, user_id: Uuid, assigned_by: Option<Uuid>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO task_assignees (task_id, user_id, assigned_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (task_id, user_id) DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(assigned_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_pending_by_group(&self, group_id: i64) -> Result<Vec<Task>> {
        let mut tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {} FROM tasks
            WHERE group_id = $1 AND sync_status = 'Pending' AND deleted_at IS NULL
            ORDER BY created_at
            "#,
            TASK_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        self.load_assignees(&mut tasks).await?;
        Ok(tasks)
    }

    async fn list_for_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let mut tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {} FROM tasks
            WHERE status <> 'Done'
              AND due_at IS NOT NULL
              AND deleted_at IS NULL
              AND (reminder_1h_sent = FALSE OR reminder_due_sent = FALSE)
              AND due_at <= $1 + INTERVAL '1 hour'
            ORDER BY due_at
            "#,
            TASK_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        self.load_assignees(&mut tasks).await?;
        Ok(tasks)
    }

    async fn update_reminder_flags(&self, id: Uuid, reminder_1h_sent: bool, reminder_due_sent: bool) -> Result<()> {
        sqlx::query("UPDATE tasks SET reminder_1h_sent = $2, reminder_due_sent = $3 WHERE id = $1")
            .bind(id)
            .bind(reminder_1h_sent)
            .bind(reminder_due_sent)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_open_for_user(&self, user_id: Uuid, limit: i64) -> Result<(Vec<Task>, i64)> {
        const OPEN_FOR_USER: &str = r#"
            FROM tasks t
            WHERE t.deleted_at IS NULL
              AND t.status <> 'Done'
              AND (t.creator_id = $1
                   OR EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $1))
        "#;

        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) {}", OPEN_FOR_USER))
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let columns = TASK_COLUMNS
            .split(", ")
            .map(|c| format!("t.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} {} ORDER BY t.created_at DESC LIMIT $2",
            columns, OPEN_FOR_USER
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok((tasks, total.0))
    }

    async fn create_comment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<TaskComment> {
        let comment = sqlx::query_as::<_, TaskComment>(
            r#"
            INSERT INTO task_comments (task_id, parent_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, parent_id, user_id, content, created_at
            "#,
        )
        .bind(task_id)
        .bind(parent_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }
}

//! Database repositories module
//!
//! Each store is a trait so the services can be driven by in-memory fakes;
//! the Postgres implementations live in the submodules.

pub mod task;
pub mod user;
pub mod group;
pub mod update;
pub mod pending;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    CreateUserRequest, Group, GroupRole, GroupStatus, NewTask, PendingAssignment, SyncStatus, Task,
    TaskChanges, TaskComment, TaskStatus, TelegramUpdate, User, UserNotionToken,
};
use crate::utils::errors::Result;

// Re-export repositories
pub use task::TaskRepository;
pub use user::UserRepository;
pub use group::GroupRepository;
pub use update::UpdateRepository;
pub use pending::PendingAssignmentRepository;

/// A page that exists only in Notion and is about to be mirrored locally
#[derive(Debug, Clone)]
pub struct RemoteTask {
    pub page_id: String,
    pub database_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub url: Option<String>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert the task with its assignees and snapshots in one transaction
    async fn create(&self, task: NewTask) -> Result<Task>;

    /// Load a live task together with its assignees and snapshots
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>>;

    /// Soft-deleted tasks are not returned
    async fn find_by_notion_page_id(&self, page_id: &str) -> Result<Option<Task>>;

    /// Record the outcome of a sync; page id and url are only written when given
    async fn update_sync_state(
        &self,
        id: Uuid,
        sync_status: SyncStatus,
        page_id: Option<&str>,
        url: Option<&str>,
    ) -> Result<()>;

    /// Apply user edits; resets the sync state and, when the due date
    /// changes, both reminder flags
    async fn update_fields(&self, id: Uuid, changes: &TaskChanges) -> Result<Task>;

    /// Overwrite title and status from Notion and mark the task synced
    async fn apply_remote(&self, id: Uuid, title: &str, status: TaskStatus) -> Result<()>;

    async fn create_from_remote(&self, remote: RemoteTask) -> Result<Task> {
        let mut task = NewTask::new(remote.title);
        task.status = remote.status;
        task.sync_status = SyncStatus::Synced;
        task.notion_page_id = Some(remote.page_id);
        task.notion_url = remote.url;
        task.database_id = Some(remote.database_id);
        self.create(task).await
    }

    /// Returns false when no live task had that id
    async fn soft_delete(&self, id: Uuid) -> Result<bool>;

    async fn add_assignee(&self, task_id: Uuid, user_id: Uuid, assigned_by: Option<Uuid>) -> Result<()>;

    async fn list_pending_by_group(&self, group_id: i64) -> Result<Vec<Task>>;

    /// Open tasks with a due date and at least one reminder still unsent
    async fn list_for_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;

    async fn update_reminder_flags(&self, id: Uuid, reminder_1h_sent: bool, reminder_due_sent: bool) -> Result<()>;

    /// Not-done tasks the user created or is assigned to, newest first,
    /// together with the total count
    async fn list_open_for_user(&self, user_id: Uuid, limit: i64) -> Result<(Vec<Task>, i64)>;

    async fn create_comment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<TaskComment>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_tg_id(&self, tg_id: i64) -> Result<Option<User>>;
    /// Case-insensitive, without the leading `@`
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn create(&self, request: CreateUserRequest) -> Result<User>;
    async fn update_profile(&self, id: Uuid, name: &str, tg_username: Option<&str>) -> Result<User>;
    async fn find_notion_token(&self, user_id: Uuid) -> Result<Option<UserNotionToken>>;
    async fn list_all(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<Group>>;
    /// Insert or overwrite title and status
    async fn upsert(&self, id: i64, title: &str, status: GroupStatus) -> Result<Group>;
    /// Returns false when the group does not exist
    async fn set_status(&self, id: i64, status: GroupStatus) -> Result<bool>;
    async fn add_member(&self, user_id: Uuid, group_id: i64, role: GroupRole) -> Result<()>;
    /// Groups with a database and a stored credential
    async fn list_active_bindings(&self) -> Result<Vec<Group>>;
}

#[async_trait]
pub trait UpdateStore: Send + Sync {
    /// Append a raw update; an existing id is left untouched
    async fn save(&self, update_id: i64, raw: &serde_json::Value) -> Result<()>;
    /// Newest first
    async fn recent_messages(&self, chat_id: i64, limit: i64) -> Result<Vec<TelegramUpdate>>;
}

#[async_trait]
pub trait PendingAssignmentStore: Send + Sync {
    async fn create(&self, task_id: Uuid, tg_username: &str) -> Result<PendingAssignment>;
    async fn list_by_username(&self, tg_username: &str) -> Result<Vec<PendingAssignment>>;
    async fn delete_by_username(&self, tg_username: &str) -> Result<u64>;
}

//! Task model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::User;

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    #[sqlx(rename = "To Do")]
    #[serde(rename = "To Do")]
    ToDo,
    #[sqlx(rename = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,
    #[sqlx(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// Name of the status option in the Notion database
    pub fn as_notion_name(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// Map a Notion status name; unknown names fall back to `ToDo`
    pub fn from_notion_name(name: &str) -> Self {
        match name {
            "In Progress" => TaskStatus::InProgress,
            "Done" => TaskStatus::Done,
            _ => TaskStatus::ToDo,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_notion_name())
    }
}

/// Outbound sync state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_sync_status")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

/// Who wrote a captured context message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "context_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    Me,
    Other,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub sync_status: SyncStatus,
    pub notion_page_id: Option<String>,
    pub notion_url: Option<String>,
    pub group_id: Option<i64>,
    pub database_id: Option<String>,
    /// Forum thread the task was created in
    pub topic: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub reminder_1h_sent: bool,
    pub reminder_due_sent: bool,
    pub archived: bool,
    pub creator_id: Option<Uuid>,
    pub chat_jump_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(default)]
    pub assignees: Vec<User>,
    #[sqlx(skip)]
    #[serde(default)]
    pub snapshots: Vec<TaskContextSnapshot>,
}

impl Task {
    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assignees.iter().any(|u| u.id == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskAssignee {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
}

/// A chat message captured when the task was created; never modified afterwards
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskContextSnapshot {
    pub id: Uuid,
    pub task_id: Uuid,
    pub role: ContextRole,
    pub author: String,
    pub text: String,
    pub tg_message_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskComment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Snapshot data before it is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    pub role: ContextRole,
    pub author: String,
    pub text: String,
    pub tg_message_id: i64,
}

/// Everything needed to persist a task in one transaction
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub sync_status: SyncStatus,
    pub notion_page_id: Option<String>,
    pub notion_url: Option<String>,
    pub group_id: Option<i64>,
    pub database_id: Option<String>,
    pub topic: Option<String>,
    pub creator_id: Option<Uuid>,
    pub chat_jump_url: String,
    pub assignee_ids: Vec<Uuid>,
    pub snapshots: Vec<NewSnapshot>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::ToDo,
            sync_status: SyncStatus::Pending,
            notion_page_id: None,
            notion_url: None,
            group_id: None,
            database_id: None,
            topic: None,
            creator_id: None,
            chat_jump_url: String::new(),
            assignee_ids: Vec::new(),
            snapshots: Vec::new(),
        }
    }
}

/// Partial update of user-editable task fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    /// `Some(None)` clears the due date
    pub due_at: Option<Option<DateTime<Utc>>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none() && self.due_at.is_none()
    }
}

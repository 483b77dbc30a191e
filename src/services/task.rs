//! Task operations called by the web app backend
//!
//! These are the edits that happen outside chat. Each one persists the
//! change, marks the task for another sync and tells the people involved.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::database::{TaskStore, UserStore};
use crate::models::{CreateUserRequest, NewTask, SyncStatus, Task, TaskChanges, TaskComment};
use crate::services::notification::{Actor, NotificationEvent, NotificationService};
use crate::utils::errors::{Result, TodoBridgeError};
use crate::utils::logging::log_task_event;

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
    notifier: NotificationService,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskStore>, users: Arc<dyn UserStore>, notifier: NotificationService) -> Self {
        Self { tasks, users, notifier }
    }

    async fn load(&self, id: Uuid) -> Result<Task> {
        self.tasks
            .find_by_id(id)
            .await?
            .ok_or(TodoBridgeError::TaskNotFound { task_id: id })
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Task> {
        self.load(id).await
    }

    /// Apply edits. Any edit resets the sync status; a due date change
    /// re-arms both reminders; a status change notifies everyone but the actor.
    pub async fn update_task(&self, id: Uuid, actor: Uuid, changes: TaskChanges) -> Result<Task> {
        let before = self.load(id).await?;
        if changes.is_empty() {
            return Ok(before);
        }

        let mut updated = self.tasks.update_fields(id, &changes).await?;
        if updated.assignees.is_empty() {
            updated.assignees = before.assignees.clone();
        }
        log_task_event(id, "updated", Some(&actor.to_string()), None);

        if updated.status != before.status {
            self.notifier
                .notify(NotificationEvent::StatusChanged, &updated, Actor::User(actor), None)
                .await;
        }
        Ok(updated)
    }

    /// Create a task from the web app; it starts unbound and unsynced
    pub async fn create_web_task(&self, creator: Uuid, title: &str, description: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TodoBridgeError::InvalidInput("task title cannot be empty".to_string()));
        }

        let mut draft = NewTask::new(title);
        draft.description = description.to_string();
        draft.creator_id = Some(creator);

        let task = self.tasks.create(draft).await?;
        log_task_event(task.id, "created", Some(&creator.to_string()), Some("web app"));

        self.notifier
            .notify(NotificationEvent::TaskCreated, &task, Actor::User(creator), None)
            .await;
        Ok(task)
    }

    pub async fn add_comment(
        &self,
        task_id: Uuid,
        actor: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<TaskComment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TodoBridgeError::InvalidInput("comment cannot be empty".to_string()));
        }

        let task = self.load(task_id).await?;
        let comment = self.tasks.create_comment(task_id, actor, content, parent_id).await?;

        self.notifier
            .notify(NotificationEvent::CommentAdded, &task, Actor::User(actor), Some(&comment))
            .await;
        Ok(comment)
    }

    /// Add an assignee and tell the creator who the task moved from and to
    pub async fn assign_task(&self, task_id: Uuid, user_id: Uuid, assigned_by: Option<Uuid>) -> Result<()> {
        let task = self.load(task_id).await?;
        let old_assignee = task
            .assignees
            .first()
            .map(|u| u.name.clone())
            .unwrap_or_else(|| "nobody".to_string());

        self.tasks.add_assignee(task_id, user_id, assigned_by).await?;

        let new_assignee = match self.users.find_by_id(user_id).await? {
            Some(user) => user.name,
            None => "unknown user".to_string(),
        };

        self.notifier
            .notify_assignee_change(&task, &old_assignee, &new_assignee)
            .await;
        self.tasks.update_sync_state(task_id, SyncStatus::Pending, None, None).await?;

        info!(
            task_id = %task_id,
            user_id = %user_id,
            old_assignee = %old_assignee,
            new_assignee = %new_assignee,
            "Task assigned"
        );
        Ok(())
    }

    /// Make a Telegram user the assignee of a task, registering them first
    /// when the bot has never seen them.
    pub async fn assign_task_to_telegram_user(&self, task_id: Uuid, profile: CreateUserRequest) -> Result<Task> {
        self.load(task_id).await?;

        let user = match self.users.find_by_tg_id(profile.tg_id).await? {
            Some(user) => user,
            None => {
                let user = self.users.create(profile).await?;
                info!(user_id = %user.id, tg_id = user.tg_id, "New user registered from a task claim");
                user
            }
        };

        self.assign_task(task_id, user.id, None).await?;
        self.load(task_id).await
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<()> {
        if !self.tasks.soft_delete(id).await? {
            return Err(TodoBridgeError::TaskNotFound { task_id: id });
        }
        log_task_event(id, "deleted", None, None);
        Ok(())
    }
}

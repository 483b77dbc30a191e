//! Task synchronization with Notion
//!
//! Outbound: push a local task to its Notion page, creating the page on the
//! first sync. Inbound: upsert local tasks from pages the poller found.
//! Every outcome is written back as the task's sync status.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::{RemoteTask, TaskStore};
use crate::models::{SyncStatus, Task, TaskStatus};
use crate::services::notification::{Actor, NotificationEvent, NotificationService};
use crate::services::notion::{Block, CreatePageParams, NotionAccess, UpdatePageParams};
use crate::services::sync_queue::{SyncJob, SyncJobHandler};
use crate::utils::errors::{Result, TodoBridgeError};
use crate::utils::logging::{log_sync_outcome, log_task_event};

/// A page as seen by the reconciliation poller
#[derive(Debug, Clone, PartialEq)]
pub struct InboundPage {
    pub page_id: String,
    pub database_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub url: Option<String>,
    pub archived: bool,
    /// Notion user ids; not mapped to local users
    pub assignees: Vec<String>,
}

/// What an inbound upsert did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Created(Uuid),
    Updated(Uuid),
    Unchanged(Uuid),
    Deleted(Uuid),
    /// Archived page with no live local task
    Ignored,
    /// Unknown page in a database with a page creation still being
    /// recorded; the next poll cycle picks it up
    Deferred,
}

/// Page creations whose page id is not stored yet, counted per database
#[derive(Default)]
struct InFlightCreates {
    databases: Mutex<HashMap<String, usize>>,
}

impl InFlightCreates {
    fn begin(self: &Arc<Self>, database_id: &str) -> InFlightGuard {
        let mut databases = self.databases.lock().unwrap_or_else(|e| e.into_inner());
        *databases.entry(database_id.to_string()).or_insert(0) += 1;
        InFlightGuard {
            creates: self.clone(),
            database_id: database_id.to_string(),
        }
    }

    fn contains(&self, database_id: &str) -> bool {
        self.databases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(database_id)
    }
}

struct InFlightGuard {
    creates: Arc<InFlightCreates>,
    database_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut databases = self.creates.databases.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(count) = databases.get_mut(&self.database_id) {
            *count -= 1;
            if *count == 0 {
                databases.remove(&self.database_id);
            }
        }
    }
}

/// Page body for a new task: description, chat context and a link back
/// to the conversation
pub fn build_page_blocks(task: &Task) -> Vec<Block> {
    let mut blocks = Vec::new();

    if !task.description.is_empty() {
        blocks.push(Block::paragraph(task.description.clone()));
    }

    if !task.snapshots.is_empty() {
        blocks.push(Block::heading_3("Context Snapshot"));
        for snapshot in &task.snapshots {
            let author = if snapshot.author.is_empty() { "User" } else { snapshot.author.as_str() };
            blocks.push(Block::quote(format!("{}: {}", author, snapshot.text)));
        }
    }

    if !task.chat_jump_url.is_empty() {
        blocks.push(Block::link_callout("Jump to Telegram Chat", task.chat_jump_url.clone(), "💬"));
    }

    blocks
}

#[derive(Clone)]
pub struct SyncService {
    tasks: Arc<dyn TaskStore>,
    access: NotionAccess,
    notifier: NotificationService,
    creates: Arc<InFlightCreates>,
}

impl SyncService {
    pub fn new(tasks: Arc<dyn TaskStore>, access: NotionAccess, notifier: NotificationService) -> Self {
        Self {
            tasks,
            access,
            notifier,
            creates: Arc::new(InFlightCreates::default()),
        }
    }

    /// Mark a task `Failed` and hand back the Notion error. A store error
    /// here is logged so it does not hide the original failure.
    async fn record_failure(&self, task_id: Uuid, page_id: Option<&str>, err: TodoBridgeError) -> TodoBridgeError {
        if let Err(store_err) = self.tasks.update_sync_state(task_id, SyncStatus::Failed, None, None).await {
            error!(task_id = %task_id, error = %store_err, "Failed to record sync failure");
        }
        log_sync_outcome(task_id, SyncStatus::Failed, page_id, Some(&err.to_string()));
        err
    }

    /// Push a task to Notion with the acting user's credential.
    ///
    /// Credential problems fail before anything is written. Once Notion has
    /// been called, the outcome is persisted as `Synced` or `Failed`; a
    /// failed create never touches the stored page id.
    pub async fn sync_to_notion(&self, task: &Task, acting_user_id: Uuid, database_id: &str) -> Result<()> {
        let client = self.access.client_for_user(acting_user_id).await?;

        if let Some(page_id) = task.notion_page_id.as_deref() {
            let params = UpdatePageParams {
                title: Some(task.title.clone()),
                status: Some(task.status.as_notion_name().to_string()),
            };

            return match client.update_page(page_id, &params).await {
                Ok(_) => {
                    self.tasks.update_sync_state(task.id, SyncStatus::Synced, None, None).await?;
                    log_sync_outcome(task.id, SyncStatus::Synced, Some(page_id), None);
                    Ok(())
                }
                Err(e) => Err(self.record_failure(task.id, Some(page_id), e).await),
            };
        }

        let params = CreatePageParams {
            database_id: database_id.to_string(),
            title: task.title.clone(),
            status: TaskStatus::ToDo.as_notion_name().to_string(),
            children: build_page_blocks(task),
        };

        // held until the page id is stored so the poller does not import
        // the new page as a second task
        let _in_flight = self.creates.begin(database_id);
        match client.create_page(&params).await {
            Ok(page) => {
                self.tasks
                    .update_sync_state(task.id, SyncStatus::Synced, Some(&page.id), page.url.as_deref())
                    .await?;
                log_sync_outcome(task.id, SyncStatus::Synced, Some(&page.id), None);
                Ok(())
            }
            Err(e) => Err(self.record_failure(task.id, None, e).await),
        }
    }

    /// Sync every pending task of a group, one after another. Individual
    /// failures are logged and do not stop the run; returns the number of
    /// tasks that synced.
    pub async fn sync_pending_tasks_for_user(&self, user_id: Uuid, group_id: i64, database_id: &str) -> Result<usize> {
        let pending = self.tasks.list_pending_by_group(group_id).await?;
        info!(group_id = group_id, count = pending.len(), "Syncing pending tasks");

        let mut synced = 0;
        for task in &pending {
            match self.sync_to_notion(task, user_id, database_id).await {
                Ok(()) => synced += 1,
                Err(e) => warn!(task_id = %task.id, error = %e, "Failed to sync pending task"),
            }
        }
        Ok(synced)
    }

    /// Mirror one Notion page into the local store
    pub async fn sync_task_from_notion(&self, page: InboundPage) -> Result<InboundOutcome> {
        let existing = self.tasks.find_by_notion_page_id(&page.page_id).await?;

        if !page.assignees.is_empty() {
            debug!(page_id = %page.page_id, count = page.assignees.len(), "Ignoring Notion assignees");
        }

        if page.archived {
            return match existing {
                Some(task) => {
                    self.tasks.soft_delete(task.id).await?;
                    log_task_event(task.id, "deleted", Some("notion"), Some("page archived"));
                    Ok(InboundOutcome::Deleted(task.id))
                }
                None => Ok(InboundOutcome::Ignored),
            };
        }

        match existing {
            Some(mut task) => {
                let status_changed = task.status != page.status;
                if task.title == page.title && !status_changed {
                    return Ok(InboundOutcome::Unchanged(task.id));
                }

                self.tasks.apply_remote(task.id, &page.title, page.status).await?;
                task.title = page.title;
                task.status = page.status;
                task.sync_status = SyncStatus::Synced;
                log_task_event(task.id, "updated", Some("notion"), None);

                if status_changed {
                    self.notifier
                        .notify(NotificationEvent::StatusChanged, &task, Actor::System, None)
                        .await;
                }
                Ok(InboundOutcome::Updated(task.id))
            }
            None if self.creates.contains(&page.database_id) => {
                debug!(page_id = %page.page_id, database_id = %page.database_id, "Deferring page while a create is in flight");
                Ok(InboundOutcome::Deferred)
            }
            None => {
                let task = self
                    .tasks
                    .create_from_remote(RemoteTask {
                        page_id: page.page_id,
                        database_id: page.database_id,
                        title: page.title,
                        status: page.status,
                        url: page.url,
                    })
                    .await?;
                log_task_event(task.id, "created", Some("notion"), None);

                self.notifier
                    .notify(NotificationEvent::TaskCreated, &task, Actor::System, None)
                    .await;
                Ok(InboundOutcome::Created(task.id))
            }
        }
    }
}

#[async_trait]
impl SyncJobHandler for SyncService {
    async fn handle(&self, job: SyncJob) -> Result<()> {
        let task = self
            .tasks
            .find_by_id(job.task_id)
            .await?
            .ok_or(TodoBridgeError::TaskNotFound { task_id: job.task_id })?;

        self.sync_to_notion(&task, job.acting_user_id, &job.database_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContextRole, TaskContextSnapshot};
    use chrono::Utc;
    use serde_json::json;

    fn task() -> Task {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "title": "Fix login",
            "description": "",
            "status": "To Do",
            "sync_status": "Pending",
            "notion_page_id": null,
            "notion_url": null,
            "group_id": null,
            "database_id": null,
            "topic": null,
            "due_at": null,
            "reminder_1h_sent": false,
            "reminder_due_sent": false,
            "archived": false,
            "creator_id": null,
            "chat_jump_url": "",
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
            "deleted_at": null
        }))
        .unwrap()
    }

    fn snapshot(author: &str, text: &str) -> TaskContextSnapshot {
        TaskContextSnapshot {
            id: Uuid::new_v4(),
            task_id: Uuid::nil(),
            role: ContextRole::Other,
            author: author.into(),
            text: text.into(),
            tg_message_id: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_in_flight_creates_are_counted_per_database() {
        let creates = Arc::new(InFlightCreates::default());
        let first = creates.begin("db-1");
        let second = creates.begin("db-1");
        assert!(creates.contains("db-1"));
        assert!(!creates.contains("db-2"));

        drop(first);
        assert!(creates.contains("db-1"));
        drop(second);
        assert!(!creates.contains("db-1"));
    }

    #[test]
    fn test_blocks_for_bare_task_are_empty() {
        assert!(build_page_blocks(&task()).is_empty());
    }

    #[test]
    fn test_blocks_render_context_and_jump_link() {
        let mut t = task();
        t.description = "steps to reproduce".into();
        t.snapshots = vec![snapshot("Ann", "login is broken"), snapshot("", "+1")];
        t.chat_jump_url = "https://t.me/c/123/45".into();

        let blocks = build_page_blocks(&t);
        assert_eq!(
            blocks,
            vec![
                Block::paragraph("steps to reproduce"),
                Block::heading_3("Context Snapshot"),
                Block::quote("Ann: login is broken"),
                Block::quote("User: +1"),
                Block::link_callout("Jump to Telegram Chat", "https://t.me/c/123/45", "💬"),
            ]
        );
    }
}

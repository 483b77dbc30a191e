//! Task creation from chat messages
//!
//! Turns a `/todo` command (or an implicit trigger) into a stored task:
//! mentions become assignees, recent chat messages become the task's
//! context, and the task is persisted before any Notion sync is queued.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::{GroupStore, PendingAssignmentStore, TaskStore, UpdateStore, UserStore};
use crate::models::{
    ContextRole, ForwardSource, GroupStatus, NewSnapshot, NewTask, Task, TelegramUpdate, Update, UpdatePayload, User,
};
use crate::services::notification::{Actor, NotificationEvent, NotificationService};
use crate::services::sync_queue::{SyncJob, SyncQueue};
use crate::utils::errors::{Result, TodoBridgeError};
use crate::utils::helpers::{chat_jump_url, extract_mentions, strip_mentions};
use crate::utils::logging::log_task_event;

/// Stored messages captured as task context
const CONTEXT_MESSAGES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskInput {
    pub chat_id: i64,
    /// Telegram chat type: `private`, `group`, `supergroup` or `channel`
    pub chat_type: String,
    pub chat_title: Option<String>,
    pub author_tg_id: i64,
    pub text: String,
    pub reply_to_message_id: Option<i64>,
    pub thread_id: Option<i32>,
}

impl CreateTaskInput {
    fn is_group_chat(&self) -> bool {
        matches!(self.chat_type.as_str(), "group" | "supergroup")
    }
}

/// Title and `@mentions` of a task command.
///
/// `"/todo fix bug @alice"` gives `("fix bug", ["@alice"])`.
pub fn parse_task_text(text: &str) -> (String, Vec<String>) {
    let mentions = extract_mentions(text);
    let without_mentions = strip_mentions(text);
    let title = without_mentions
        .strip_prefix("/todo")
        .unwrap_or(&without_mentions)
        .trim()
        .to_string();
    (title, mentions)
}

/// Oldest-first snapshots from newest-first stored updates. Updates that
/// are not text messages are skipped.
pub fn snapshots_from_updates(updates: &[TelegramUpdate], author_tg_id: i64) -> Vec<NewSnapshot> {
    updates
        .iter()
        .rev()
        .filter_map(|stored| {
            let update = Update::decode(&stored.raw_data).ok()?;
            let UpdatePayload::Message(message) = update.payload else {
                return None;
            };
            let text = message.text.filter(|t| !t.is_empty())?;
            let (role, author) = match &message.from {
                Some(from) if from.id == author_tg_id => (ContextRole::Me, from.first_name.clone()),
                Some(from) => (ContextRole::Other, from.first_name.clone()),
                None => (ContextRole::System, String::new()),
            };
            Some(NewSnapshot { role, author, text, tg_message_id: message.message_id })
        })
        .collect()
}

pub struct TaskCreator {
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
    groups: Arc<dyn GroupStore>,
    updates: Arc<dyn UpdateStore>,
    pending: Arc<dyn PendingAssignmentStore>,
    queue: Arc<SyncQueue>,
    notifier: NotificationService,
}

impl TaskCreator {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        users: Arc<dyn UserStore>,
        groups: Arc<dyn GroupStore>,
        updates: Arc<dyn UpdateStore>,
        pending: Arc<dyn PendingAssignmentStore>,
        queue: Arc<SyncQueue>,
        notifier: NotificationService,
    ) -> Self {
        Self { tasks, users, groups, updates, pending, queue, notifier }
    }

    /// Create a task from a chat command. Returns the task and the mentions
    /// that matched no known user.
    pub async fn create_task(&self, input: CreateTaskInput) -> Result<(Task, Vec<String>)> {
        let author = self.find_author(input.author_tg_id).await?;
        let (title, mentions) = parse_task_text(&input.text);

        let mut assignee_ids: Vec<Uuid> = Vec::new();
        let mut unresolved: Vec<String> = Vec::new();
        for mention in &mentions {
            match self.users.find_by_username(mention.trim_start_matches('@')).await {
                Ok(Some(user)) => {
                    if !assignee_ids.contains(&user.id) {
                        assignee_ids.push(user.id);
                    }
                }
                Ok(None) => unresolved.push(mention.clone()),
                Err(e) => {
                    warn!(username = %mention, error = %e, "Failed to look up assignee");
                    unresolved.push(mention.clone());
                }
            }
        }
        if assignee_ids.is_empty() && unresolved.is_empty() {
            assignee_ids.push(author.id);
        }

        let snapshots = match self.updates.recent_messages(input.chat_id, CONTEXT_MESSAGES).await {
            Ok(updates) => snapshots_from_updates(&updates, input.author_tg_id),
            Err(e) => {
                warn!(chat_id = input.chat_id, error = %e, "Failed to capture chat context");
                Vec::new()
            }
        };

        let (group_id, database_id) = if input.is_group_chat() {
            self.resolve_group(&input).await
        } else {
            (None, author.default_database_id.clone().filter(|d| !d.is_empty()))
        };

        let jump_target = input
            .reply_to_message_id
            .filter(|id| *id != 0)
            .or_else(|| snapshots.last().map(|s| s.tg_message_id));

        let mut draft = NewTask::new(title);
        draft.creator_id = Some(author.id);
        draft.group_id = group_id;
        draft.database_id = database_id.clone();
        draft.topic = input.thread_id.filter(|t| *t != 0).map(|t| t.to_string());
        draft.chat_jump_url = jump_target.map(|msg| chat_jump_url(input.chat_id, msg)).unwrap_or_default();
        draft.assignee_ids = assignee_ids;
        draft.snapshots = snapshots;

        let task = self.tasks.create(draft).await?;
        log_task_event(task.id, "created", Some(&author.handle()), Some("chat command"));

        for mention in &unresolved {
            let username = mention.trim_start_matches('@');
            if let Err(e) = self.pending.create(task.id, username).await {
                error!(task_id = %task.id, username = %username, error = %e, "Failed to store pending assignment");
            }
        }

        self.enqueue_sync(&task, &author, database_id.as_deref());
        self.notifier
            .notify(NotificationEvent::TaskAssigned, &task, Actor::User(author.id), None)
            .await;

        Ok((task, unresolved))
    }

    /// Save a forwarded message as a personal task in the author's default database
    pub async fn create_personal_task(
        &self,
        author_tg_id: i64,
        chat_id: i64,
        text: &str,
        source: &ForwardSource,
    ) -> Result<Task> {
        let author = self.find_author(author_tg_id).await?;
        let database_id = author.default_database_id.clone().filter(|d| !d.is_empty());

        let mut draft = NewTask::new(text);
        draft.creator_id = Some(author.id);
        draft.database_id = database_id.clone();
        draft.description = format!("Forwarded source: {}", source);

        let task = self.tasks.create(draft).await?;
        debug!(chat_id = chat_id, task_id = %task.id, "Personal task created from forward");
        log_task_event(task.id, "created", Some(&author.handle()), Some("forwarded message"));

        self.enqueue_sync(&task, &author, database_id.as_deref());
        Ok(task)
    }

    async fn find_author(&self, tg_id: i64) -> Result<User> {
        self.users
            .find_by_tg_id(tg_id)
            .await?
            .ok_or_else(|| TodoBridgeError::UserNotFound(format!("tg:{}", tg_id)))
    }

    /// Group id and bound database for a group chat. An unknown group is
    /// registered as unbound; a renamed one gets its title refreshed.
    async fn resolve_group(&self, input: &CreateTaskInput) -> (Option<i64>, Option<String>) {
        let title = input.chat_title.clone().unwrap_or_default();

        match self.groups.find(input.chat_id).await {
            Ok(Some(group)) => {
                if !title.is_empty() && group.title != title {
                    match self.groups.upsert(group.id, &title, group.status).await {
                        Ok(_) => info!(group_id = group.id, title = %title, "Updated group title"),
                        Err(e) => warn!(group_id = group.id, error = %e, "Failed to update group title"),
                    }
                }
                (Some(group.id), group.database_id.filter(|d| !d.is_empty()))
            }
            Ok(None) => match self.groups.upsert(input.chat_id, &title, GroupStatus::Unbound).await {
                Ok(group) => {
                    info!(group_id = group.id, title = %title, "Registered unbound group for task");
                    (Some(group.id), None)
                }
                Err(e) => {
                    warn!(group_id = input.chat_id, error = %e, "Failed to register group");
                    (None, None)
                }
            },
            Err(e) => {
                warn!(group_id = input.chat_id, error = %e, "Failed to load group");
                (None, None)
            }
        }
    }

    fn enqueue_sync(&self, task: &Task, author: &User, database_id: Option<&str>) {
        let Some(database_id) = database_id.filter(|_| author.notion_connected) else {
            debug!(
                task_id = %task.id,
                notion_connected = author.notion_connected,
                has_database = database_id.is_some(),
                "Skipping Notion sync"
            );
            return;
        };

        let job = SyncJob {
            task_id: task.id,
            acting_user_id: author.id,
            database_id: database_id.to_string(),
        };
        if let Err(e) = self.queue.enqueue(job) {
            warn!(task_id = %task.id, error = %e, "Could not queue Notion sync, task stays pending");
        }
    }
}

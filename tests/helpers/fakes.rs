//! In-memory fakes for the store, chat and Notion seams
//!
//! `MemoryDb` implements every store trait over one shared state so tests
//! can inspect exactly what the services wrote.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Notify;
use uuid::Uuid;

use TodoBridge::database::{
    DatabaseService, GroupStore, PendingAssignmentStore, TaskStore, UpdateStore, UserStore,
};
use TodoBridge::models::{
    CreateUserRequest, Group, GroupRole, GroupStatus, NewTask, PendingAssignment, SyncStatus, Task, TaskChanges,
    TaskComment, TaskContextSnapshot, TaskStatus, TelegramUpdate, User, UserNotionToken,
};
use TodoBridge::services::notion::{
    CreatePageParams, Database, NotionClient, NotionClientFactory, Page, QueryDatabaseRequest, QueryDatabaseResponse,
    SearchResponse, UpdatePageParams,
};
use TodoBridge::services::telegram::{Button, ChatClient, InlineArticle, MemberRole, MessageRef, OutgoingMessage};
use TodoBridge::utils::errors::{Result, TodoBridgeError};

#[derive(Default)]
struct DbState {
    users: Vec<User>,
    tokens: HashMap<Uuid, UserNotionToken>,
    tasks: Vec<Task>,
    assignees: Vec<(Uuid, Uuid)>,
    comments: Vec<TaskComment>,
    groups: HashMap<i64, Group>,
    members: Vec<(Uuid, i64, GroupRole)>,
    updates: Vec<TelegramUpdate>,
    pending: Vec<PendingAssignment>,
    /// Sync state writes fail while set
    sync_state_offline: bool,
}

impl DbState {
    fn hydrate(&self, task: &Task) -> Task {
        let mut task = task.clone();
        task.assignees = self
            .assignees
            .iter()
            .filter(|(task_id, _)| *task_id == task.id)
            .filter_map(|(_, user_id)| self.users.iter().find(|u| u.id == *user_id).cloned())
            .collect();
        task
    }

    fn live_task_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id && t.deleted_at.is_none())
    }
}

#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<DbState>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_service(&self) -> DatabaseService {
        let db = Arc::new(self.clone());
        DatabaseService {
            tasks: db.clone(),
            users: db.clone(),
            groups: db.clone(),
            updates: db.clone(),
            pending: db,
        }
    }

    pub fn insert_user(&self, tg_id: i64, username: Option<&str>, name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            tg_id,
            tg_username: username.map(str::to_string),
            name: name.to_string(),
            photo_url: None,
            timezone: "UTC".to_string(),
            default_database_id: None,
            notion_connected: false,
            calendar_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.state.lock().unwrap().users.push(user.clone());
        user
    }

    /// Store an encrypted credential and mark the user connected
    pub fn connect_notion(&self, user_id: Uuid, encrypted_token: &str, default_database: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.tokens.insert(
            user_id,
            UserNotionToken {
                user_id,
                access_token_enc: encrypted_token.to_string(),
                workspace_id: "ws".to_string(),
                workspace_name: "Workspace".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.notion_connected = true;
            user.default_database_id = default_database.map(str::to_string);
        }
    }

    pub fn insert_group(&self, id: i64, title: &str, database_id: Option<&str>, encrypted_token: &str) -> Group {
        let group = Group {
            id,
            title: title.to_string(),
            status: if database_id.is_some() { GroupStatus::Connected } else { GroupStatus::Unbound },
            database_id: database_id.map(str::to_string),
            database_name: String::new(),
            notion_access_token: encrypted_token.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.state.lock().unwrap().groups.insert(id, group.clone());
        group
    }

    /// Every task including soft-deleted ones, with assignees
    pub fn all_tasks(&self) -> Vec<Task> {
        let state = self.state.lock().unwrap();
        state.tasks.iter().map(|t| state.hydrate(t)).collect()
    }

    pub fn task(&self, id: Uuid) -> Task {
        let state = self.state.lock().unwrap();
        let task = state.tasks.iter().find(|t| t.id == id).expect("task exists");
        state.hydrate(task)
    }

    pub fn set_due(&self, id: Uuid, due_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
            task.due_at = Some(due_at);
        }
    }

    pub fn user_by_tg(&self, tg_id: i64) -> Option<User> {
        self.state.lock().unwrap().users.iter().find(|u| u.tg_id == tg_id).cloned()
    }

    pub fn group(&self, id: i64) -> Option<Group> {
        self.state.lock().unwrap().groups.get(&id).cloned()
    }

    pub fn members(&self) -> Vec<(Uuid, i64, GroupRole)> {
        self.state.lock().unwrap().members.clone()
    }

    pub fn set_sync_state_offline(&self) {
        self.state.lock().unwrap().sync_state_offline = true;
    }

    pub fn pending(&self) -> Vec<PendingAssignment> {
        self.state.lock().unwrap().pending.clone()
    }

    pub fn update_count(&self) -> usize {
        self.state.lock().unwrap().updates.len()
    }

    /// Seed a stored update as if it had arrived earlier
    pub fn seed_update(&self, update_id: i64, raw: Value) {
        self.state.lock().unwrap().updates.push(TelegramUpdate {
            update_id,
            raw_data: raw,
            created_at: Utc::now(),
        });
    }
}

#[async_trait]
impl TaskStore for MemoryDb {
    async fn create(&self, new_task: NewTask) -> Result<Task> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let task = Task {
            id,
            title: new_task.title,
            description: new_task.description,
            status: new_task.status,
            sync_status: new_task.sync_status,
            notion_page_id: new_task.notion_page_id,
            notion_url: new_task.notion_url,
            group_id: new_task.group_id,
            database_id: new_task.database_id,
            topic: new_task.topic,
            due_at: None,
            reminder_1h_sent: false,
            reminder_due_sent: false,
            archived: false,
            creator_id: new_task.creator_id,
            chat_jump_url: new_task.chat_jump_url,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            assignees: Vec::new(),
            snapshots: new_task
                .snapshots
                .into_iter()
                .map(|s| TaskContextSnapshot {
                    id: Uuid::new_v4(),
                    task_id: id,
                    role: s.role,
                    author: s.author,
                    text: s.text,
                    tg_message_id: s.tg_message_id,
                    created_at: now,
                })
                .collect(),
        };

        let mut state = self.state.lock().unwrap();
        for user_id in new_task.assignee_ids {
            if !state.assignees.contains(&(id, user_id)) {
                state.assignees.push((id, user_id));
            }
        }
        state.tasks.push(task.clone());
        Ok(state.hydrate(&task))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == id && t.deleted_at.is_none())
            .map(|t| state.hydrate(t)))
    }

    async fn find_by_notion_page_id(&self, page_id: &str) -> Result<Option<Task>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .iter()
            .find(|t| t.notion_page_id.as_deref() == Some(page_id) && t.deleted_at.is_none())
            .map(|t| state.hydrate(t)))
    }

    async fn update_sync_state(
        &self,
        id: Uuid,
        sync_status: SyncStatus,
        page_id: Option<&str>,
        url: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.sync_state_offline {
            return Err(TodoBridgeError::Database(sqlx::Error::PoolTimedOut));
        }
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
            task.sync_status = sync_status;
            if let Some(page_id) = page_id {
                task.notion_page_id = Some(page_id.to_string());
            }
            if let Some(url) = url {
                task.notion_url = Some(url.to_string());
            }
        }
        Ok(())
    }

    async fn update_fields(&self, id: Uuid, changes: &TaskChanges) -> Result<Task> {
        let mut state = self.state.lock().unwrap();
        let task = state.live_task_mut(id).ok_or(TodoBridgeError::TaskNotFound { task_id: id })?;
        if let Some(title) = &changes.title {
            task.title = title.clone();
        }
        if let Some(description) = &changes.description {
            task.description = description.clone();
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(due_at) = changes.due_at {
            task.due_at = due_at;
            task.reminder_1h_sent = false;
            task.reminder_due_sent = false;
        }
        task.sync_status = SyncStatus::Pending;
        let task = task.clone();
        Ok(state.hydrate(&task))
    }

    async fn apply_remote(&self, id: Uuid, title: &str, status: TaskStatus) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
            task.title = title.to_string();
            task.status = status;
            task.sync_status = SyncStatus::Synced;
        }
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state.live_task_mut(id) {
            Some(task) => {
                task.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_assignee(&self, task_id: Uuid, user_id: Uuid, _assigned_by: Option<Uuid>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.assignees.contains(&(task_id, user_id)) {
            state.assignees.push((task_id, user_id));
        }
        Ok(())
    }

    async fn list_pending_by_group(&self, group_id: i64) -> Result<Vec<Task>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.group_id == Some(group_id) && t.sync_status == SyncStatus::Pending && t.deleted_at.is_none())
            .map(|t| state.hydrate(t))
            .collect())
    }

    async fn list_for_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Done && t.deleted_at.is_none())
            .filter(|t| !t.reminder_1h_sent || !t.reminder_due_sent)
            .filter(|t| t.due_at.map_or(false, |due| due <= now + chrono::Duration::hours(1)))
            .map(|t| state.hydrate(t))
            .collect())
    }

    async fn update_reminder_flags(&self, id: Uuid, reminder_1h_sent: bool, reminder_due_sent: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
            task.reminder_1h_sent = reminder_1h_sent;
            task.reminder_due_sent = reminder_due_sent;
        }
        Ok(())
    }

    async fn list_open_for_user(&self, user_id: Uuid, limit: i64) -> Result<(Vec<Task>, i64)> {
        let state = self.state.lock().unwrap();
        let mut open: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| t.deleted_at.is_none() && t.status != TaskStatus::Done)
            .filter(|t| t.creator_id == Some(user_id) || state.assignees.contains(&(t.id, user_id)))
            .map(|t| state.hydrate(t))
            .collect();
        open.reverse();
        let total = open.len() as i64;
        open.truncate(limit.max(0) as usize);
        Ok((open, total))
    }

    async fn create_comment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<TaskComment> {
        let comment = TaskComment {
            id: Uuid::new_v4(),
            task_id,
            parent_id,
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.lock().unwrap().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_tg_id(&self, tg_id: i64) -> Result<Option<User>> {
        Ok(self.user_by_tg(tg_id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.tg_username.as_deref().map_or(false, |n| n.eq_ignore_ascii_case(username)))
            .cloned())
    }

    async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let user = self.insert_user(request.tg_id, request.tg_username.as_deref(), &request.name);
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, name: &str, tg_username: Option<&str>) -> Result<User> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| TodoBridgeError::UserNotFound(id.to_string()))?;
        user.name = name.to_string();
        user.tg_username = tg_username.map(str::to_string);
        Ok(user.clone())
    }

    async fn find_notion_token(&self, user_id: Uuid) -> Result<Option<UserNotionToken>> {
        Ok(self.state.lock().unwrap().tokens.get(&user_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        Ok(self.state.lock().unwrap().users.clone())
    }
}

#[async_trait]
impl GroupStore for MemoryDb {
    async fn find(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.group(id))
    }

    async fn upsert(&self, id: i64, title: &str, status: GroupStatus) -> Result<Group> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let group = state.groups.entry(id).or_insert_with(|| Group {
            id,
            title: String::new(),
            status,
            database_id: None,
            database_name: String::new(),
            notion_access_token: String::new(),
            created_at: now,
            updated_at: now,
        });
        group.title = title.to_string();
        group.status = status;
        group.updated_at = now;
        Ok(group.clone())
    }

    async fn set_status(&self, id: i64, status: GroupStatus) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state.groups.get_mut(&id) {
            Some(group) => {
                group.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_member(&self, user_id: Uuid, group_id: i64, role: GroupRole) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.members.retain(|(u, g, _)| !(*u == user_id && *g == group_id));
        state.members.push((user_id, group_id, role));
        Ok(())
    }

    async fn list_active_bindings(&self) -> Result<Vec<Group>> {
        let state = self.state.lock().unwrap();
        let mut groups: Vec<Group> = state
            .groups
            .values()
            .filter(|g| g.database_id.is_some() && !g.notion_access_token.is_empty())
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }
}

#[async_trait]
impl UpdateStore for MemoryDb {
    async fn save(&self, update_id: i64, raw: &Value) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.updates.iter().any(|u| u.update_id == update_id) {
            state.updates.push(TelegramUpdate {
                update_id,
                raw_data: raw.clone(),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn recent_messages(&self, chat_id: i64, limit: i64) -> Result<Vec<TelegramUpdate>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .updates
            .iter()
            .rev()
            .filter(|u| u.raw_data["message"]["chat"]["id"].as_i64() == Some(chat_id))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PendingAssignmentStore for MemoryDb {
    async fn create(&self, task_id: Uuid, tg_username: &str) -> Result<PendingAssignment> {
        let pending = PendingAssignment {
            id: Uuid::new_v4(),
            task_id,
            tg_username: tg_username.to_string(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().pending.push(pending.clone());
        Ok(pending)
    }

    async fn list_by_username(&self, tg_username: &str) -> Result<Vec<PendingAssignment>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .pending
            .iter()
            .filter(|p| p.tg_username.eq_ignore_ascii_case(tg_username))
            .cloned()
            .collect())
    }

    async fn delete_by_username(&self, tg_username: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.pending.len();
        state.pending.retain(|p| !p.tg_username.eq_ignore_ascii_case(tg_username));
        Ok((before - state.pending.len()) as u64)
    }
}

/// Chat client that records every outgoing message
pub struct RecordingChatClient {
    sent: Mutex<Vec<OutgoingMessage>>,
    member_role: Mutex<MemberRole>,
    updates: Mutex<Vec<Vec<Value>>>,
    inline_answers: Mutex<Vec<(String, Vec<InlineArticle>)>>,
    callback_answers: Mutex<Vec<(String, Option<String>)>>,
    edits: Mutex<Vec<MessageEdit>>,
}

/// A recorded `edit_message_text` call
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEdit {
    pub target: MessageRef,
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Default for RecordingChatClient {
    fn default() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            member_role: Mutex::new(MemberRole::Admin),
            updates: Mutex::new(Vec::new()),
            inline_answers: Mutex::new(Vec::new()),
            callback_answers: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingChatClient {
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutgoingMessage> {
        self.sent().into_iter().filter(|m| m.chat_id == chat_id).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn set_member_role(&self, role: MemberRole) {
        *self.member_role.lock().unwrap() = role;
    }

    /// Batches returned by successive `get_updates` calls
    pub fn queue_updates(&self, batch: Vec<Value>) {
        self.updates.lock().unwrap().push(batch);
    }

    pub fn inline_answers(&self) -> Vec<(String, Vec<InlineArticle>)> {
        self.inline_answers.lock().unwrap().clone()
    }

    pub fn callback_answers(&self) -> Vec<(String, Option<String>)> {
        self.callback_answers.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<MessageEdit> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn send_message(&self, message: OutgoingMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn get_updates(&self, _offset: i64, _timeout_secs: u32) -> Result<Vec<Value>> {
        let next = {
            let mut updates = self.updates.lock().unwrap();
            if updates.is_empty() {
                None
            } else {
                Some(updates.remove(0))
            }
        };
        match next {
            Some(batch) => Ok(batch),
            None => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn get_chat_member(&self, _chat_id: i64, _user_id: i64) -> Result<MemberRole> {
        Ok(*self.member_role.lock().unwrap())
    }

    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineArticle>) -> Result<()> {
        self.inline_answers.lock().unwrap().push((query_id.to_string(), results));
        Ok(())
    }

    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>) -> Result<()> {
        self.callback_answers
            .lock()
            .unwrap()
            .push((query_id.to_string(), text.map(str::to_string)));
        Ok(())
    }

    async fn edit_message_text(&self, target: MessageRef, text: String, keyboard: Vec<Vec<Button>>) -> Result<()> {
        self.edits.lock().unwrap().push(MessageEdit { target, text, keyboard });
        Ok(())
    }
}

#[derive(Default)]
pub struct NotionState {
    pub created: Vec<CreatePageParams>,
    pub updated: Vec<(String, UpdatePageParams)>,
    pub tokens: Vec<String>,
    /// Error returned by page writes, as (status, message)
    pub fail_writes: Option<(u16, String)>,
    /// Pages returned by every database query
    pub pages: Vec<Value>,
    pub database: Option<Value>,
    pub database_patches: Vec<Value>,
    pub search_results: Vec<Value>,
    /// While set, `create_page` signals the first notify and waits on the second
    pub create_gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

/// Notion client and factory over one shared, inspectable state
#[derive(Clone, Default)]
pub struct FakeNotion {
    pub state: Arc<Mutex<NotionState>>,
}

impl FakeNotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, status: u16, message: &str) {
        self.state.lock().unwrap().fail_writes = Some((status, message.to_string()));
    }

    pub fn set_pages(&self, pages: Vec<Value>) {
        self.state.lock().unwrap().pages = pages;
    }

    pub fn set_database(&self, database: Value) {
        self.state.lock().unwrap().database = Some(database);
    }

    /// Make page creation wait; returns (started, release)
    pub fn hold_creates(&self) -> (Arc<Notify>, Arc<Notify>) {
        let gate = (Arc::new(Notify::new()), Arc::new(Notify::new()));
        self.state.lock().unwrap().create_gate = Some(gate.clone());
        gate
    }

    pub fn set_search_results(&self, results: Vec<Value>) {
        self.state.lock().unwrap().search_results = results;
    }

    pub fn database_patches(&self) -> Vec<Value> {
        self.state.lock().unwrap().database_patches.clone()
    }

    pub fn created(&self) -> Vec<CreatePageParams> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn updated(&self) -> Vec<(String, UpdatePageParams)> {
        self.state.lock().unwrap().updated.clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().tokens.clone()
    }

    fn write_error(&self) -> Option<TodoBridgeError> {
        self.state
            .lock()
            .unwrap()
            .fail_writes
            .clone()
            .map(|(status, message)| TodoBridgeError::Notion { status, message })
    }
}

impl NotionClientFactory for FakeNotion {
    fn for_token(&self, access_token: &str) -> Arc<dyn NotionClient> {
        self.state.lock().unwrap().tokens.push(access_token.to_string());
        Arc::new(self.clone())
    }
}

#[async_trait]
impl NotionClient for FakeNotion {
    async fn create_page(&self, params: &CreatePageParams) -> Result<Page> {
        let gate = self.state.lock().unwrap().create_gate.clone();
        if let Some((started, release)) = gate {
            started.notify_one();
            release.notified().await;
        }
        if let Some(e) = self.write_error() {
            return Err(e);
        }
        let mut state = self.state.lock().unwrap();
        state.created.push(params.clone());
        let id = format!("page-{}", state.created.len());
        Ok(serde_json::from_value(serde_json::json!({
            "id": id,
            "url": format!("https://notion.so/{}", id)
        }))?)
    }

    async fn update_page(&self, page_id: &str, params: &UpdatePageParams) -> Result<Page> {
        if let Some(e) = self.write_error() {
            return Err(e);
        }
        self.state
            .lock()
            .unwrap()
            .updated
            .push((page_id.to_string(), params.clone()));
        Ok(serde_json::from_value(serde_json::json!({ "id": page_id }))?)
    }

    async fn query_database(&self, _database_id: &str, _query: &QueryDatabaseRequest) -> Result<QueryDatabaseResponse> {
        let pages = self.state.lock().unwrap().pages.clone();
        Ok(serde_json::from_value(serde_json::json!({ "results": pages, "has_more": false }))?)
    }

    async fn get_database(&self, database_id: &str) -> Result<Database> {
        let database = self.state.lock().unwrap().database.clone();
        match database {
            Some(raw) => Ok(serde_json::from_value(raw)?),
            None => Err(TodoBridgeError::Notion {
                status: 404,
                message: format!("Could not find database with ID: {}", database_id),
            }),
        }
    }

    async fn update_database(&self, database_id: &str, properties: Value) -> Result<Database> {
        let mut state = self.state.lock().unwrap();
        state.database_patches.push(properties);
        Ok(serde_json::from_value(serde_json::json!({ "id": database_id }))?)
    }

    async fn search(&self, _query: &str) -> Result<SearchResponse> {
        let results = self.state.lock().unwrap().search_results.clone();
        Ok(serde_json::from_value(serde_json::json!({ "results": results }))?)
    }
}

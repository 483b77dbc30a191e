//! Notification dispatcher
//!
//! Announces task changes to the people involved in a task: its creator and
//! its assignees, never the person who made the change. Delivery is best
//! effort; a failed send is logged and the remaining recipients are still
//! tried.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::UserStore;
use crate::models::{Task, TaskComment, TaskStatus, User};
use crate::services::telegram::{Button, ChatClient, OutgoingMessage, ReplyMarkup};
use crate::utils::helpers::{escape_html, task_deep_link, truncate_text};

/// Longest comment excerpt quoted in a notification
const COMMENT_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationEvent {
    TaskCreated,
    TaskAssigned,
    StatusChanged,
    CommentAdded,
    AssigneeChanged,
    Reminder1h,
    ReminderDue,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::TaskCreated => "task_created",
            NotificationEvent::TaskAssigned => "task_assigned",
            NotificationEvent::StatusChanged => "status_changed",
            NotificationEvent::CommentAdded => "comment_added",
            NotificationEvent::AssigneeChanged => "assignee_changed",
            NotificationEvent::Reminder1h => "reminder_1h",
            NotificationEvent::ReminderDue => "reminder_due",
        }
    }
}

/// Who caused the change being announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(Uuid),
    /// Changes that arrive from Notion
    System,
}

impl Actor {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::System => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientRole {
    Creator,
    Assignee,
}

/// Everything a message template may render
#[derive(Debug, Clone, Copy)]
pub struct TemplateData<'a> {
    pub event: NotificationEvent,
    pub task: &'a Task,
    pub actor_name: Option<&'a str>,
    pub comment: Option<&'a str>,
    pub role: Option<RecipientRole>,
    /// Free-form change description, e.g. "from Ann to Bob"
    pub context: Option<&'a str>,
}

impl<'a> TemplateData<'a> {
    pub fn new(event: NotificationEvent, task: &'a Task) -> Self {
        Self { event, task, actor_name: None, comment: None, role: None, context: None }
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::ToDo => "To Do",
        TaskStatus::InProgress => "In Progress",
        TaskStatus::Done => "Done ✅",
    }
}

/// Render the HTML body of a notification
pub fn format_message(data: &TemplateData<'_>) -> String {
    let title = escape_html(&data.task.title);
    let actor = data.actor_name.filter(|n| !n.is_empty()).map(escape_html);
    let mut out = String::new();

    match data.event {
        NotificationEvent::TaskCreated => {
            out.push_str("🆕 <b>New task</b>\n\n");
            out.push_str(&format!("<b>Task:</b> {}\n", title));
            if let Some(actor) = &actor {
                out.push_str(&format!("<b>Created by:</b> {}\n", actor));
            }
        }
        NotificationEvent::TaskAssigned => {
            out.push_str("👉 <b>You have been assigned a task</b>\n\n");
            out.push_str(&format!("<b>Task:</b> {}\n", title));
            if let Some(actor) = &actor {
                out.push_str(&format!("<b>Assigned by:</b> {}\n", actor));
            }
        }
        NotificationEvent::AssigneeChanged => {
            out.push_str("👤 <b>Assignee changed</b>\n\n");
            out.push_str(&format!("<b>Task:</b> {}\n", title));
            if let Some(context) = data.context.filter(|c| !c.is_empty()) {
                out.push_str(&format!("<b>Change:</b> {}\n", escape_html(context)));
            }
        }
        NotificationEvent::StatusChanged => {
            out.push_str("🔄 <b>Task status updated</b>\n\n");
            out.push_str(&format!("<b>Task:</b> {}\n", title));
            out.push_str(&format!("<b>New status:</b> {}\n", status_label(data.task.status)));
            if let Some(actor) = &actor {
                out.push_str(&format!("<b>Changed by:</b> {}\n", actor));
            }
        }
        NotificationEvent::CommentAdded => {
            out.push_str("💬 <b>New comment</b>\n\n");
            out.push_str(&format!("<b>Task:</b> {}\n", title));
            if let Some(actor) = &actor {
                out.push_str(&format!("<b>From:</b> {}\n", actor));
            }
            if let Some(comment) = data.comment {
                let preview = truncate_text(comment, COMMENT_PREVIEW_CHARS);
                out.push_str(&format!("\n<i>{}</i>\n", escape_html(&preview)));
            }
        }
        NotificationEvent::Reminder1h => {
            out.push_str("⏰ <b>Task due in one hour</b>\n\n");
            out.push_str(&format!("<b>Task:</b> {}\n", title));
            if data.role == Some(RecipientRole::Creator) {
                out.push_str("\n💡 Remember to review this task once it is delivered.");
            } else {
                out.push_str("\n💡 Remember to finish and hand it in on time.");
            }
        }
        NotificationEvent::ReminderDue => {
            out.push_str("🚨 <b>Task is due now</b>\n\n");
            out.push_str(&format!("<b>Task:</b> {}\n", title));
            if data.role == Some(RecipientRole::Creator) {
                out.push_str("\n💡 The deadline has passed, check the progress or accept the result.");
            } else {
                out.push_str("\n💡 The deadline has passed, please finish it and update the status.");
            }
        }
    }

    out
}

/// "Open task" button, absent when the bot username is not configured
pub fn task_markup(bot_username: &str, task_id: Uuid) -> Option<ReplyMarkup> {
    if bot_username.trim_start_matches('@').is_empty() {
        return None;
    }
    Some(ReplyMarkup::Inline(vec![vec![Button::url(
        "📂 Open task",
        task_deep_link(bot_username, &task_id.to_string()),
    )]]))
}

/// Creator and assignees minus the actor, in that order and without repeats
pub fn recipients(task: &Task, actor: Actor) -> Vec<Uuid> {
    let actor_id = actor.user_id();
    let mut ids: Vec<Uuid> = Vec::new();

    let candidates = task.creator_id.into_iter().chain(task.assignees.iter().map(|u| u.id));
    for id in candidates {
        if Some(id) != actor_id && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[derive(Clone)]
pub struct NotificationService {
    chat: Arc<dyn ChatClient>,
    users: Arc<dyn UserStore>,
    bot_username: String,
}

impl NotificationService {
    pub fn new(chat: Arc<dyn ChatClient>, users: Arc<dyn UserStore>, bot_username: impl Into<String>) -> Self {
        Self { chat, users, bot_username: bot_username.into() }
    }

    /// Announce an event to everyone involved except the actor. Returns
    /// the number of messages delivered.
    pub async fn notify(
        &self,
        event: NotificationEvent,
        task: &Task,
        actor: Actor,
        comment: Option<&TaskComment>,
    ) -> usize {
        let recipient_ids = recipients(task, actor);

        let actor_name = match actor.user_id() {
            Some(id) => self.resolve_user(task, id).await.map(|u| u.name),
            None => None,
        };

        let mut data = TemplateData::new(event, task);
        data.actor_name = actor_name.as_deref();
        data.comment = comment.map(|c| c.content.as_str());
        let text = format_message(&data);

        let mut delivered = 0;
        for id in &recipient_ids {
            let Some(user) = self.resolve_user(task, *id).await else {
                warn!(task_id = %task.id, user_id = %id, "Notification recipient not found");
                continue;
            };
            if self.deliver(&user, task.id, &text).await {
                delivered += 1;
            }
        }

        info!(
            event = event.as_str(),
            task_id = %task.id,
            recipients = recipient_ids.len(),
            delivered = delivered,
            "Notification dispatched"
        );

        if let (NotificationEvent::CommentAdded, Some(comment)) = (event, comment) {
            self.echo_comment_to_group(task, actor_name.as_deref(), comment).await;
        }

        delivered
    }

    /// Remind the creator and the assignees; each gets wording for their role
    pub async fn notify_reminder(&self, event: NotificationEvent, task: &Task) -> usize {
        let mut delivered = 0;

        if let Some(creator_id) = task.creator_id {
            if let Some(creator) = self.resolve_user(task, creator_id).await {
                let mut data = TemplateData::new(event, task);
                data.role = Some(RecipientRole::Creator);
                if self.deliver(&creator, task.id, &format_message(&data)).await {
                    delivered += 1;
                }
            }
        }

        let mut data = TemplateData::new(event, task);
        data.role = Some(RecipientRole::Assignee);
        let text = format_message(&data);
        for assignee in task.assignees.iter().filter(|a| Some(a.id) != task.creator_id) {
            if self.deliver(assignee, task.id, &text).await {
                delivered += 1;
            }
        }

        info!(event = event.as_str(), task_id = %task.id, delivered = delivered, "Reminders dispatched");
        delivered
    }

    /// Tell the creator who the task moved from and to
    pub async fn notify_assignee_change(&self, task: &Task, old_assignee: &str, new_assignee: &str) -> bool {
        let Some(creator_id) = task.creator_id else {
            return false;
        };
        let Some(creator) = self.resolve_user(task, creator_id).await else {
            return false;
        };

        let context = if old_assignee.is_empty() {
            format!("assigned to {}", new_assignee)
        } else {
            format!("from {} to {}", old_assignee, new_assignee)
        };
        let mut data = TemplateData::new(NotificationEvent::AssigneeChanged, task);
        data.context = Some(&context);

        self.deliver(&creator, task.id, &format_message(&data)).await
    }

    async fn resolve_user(&self, task: &Task, id: Uuid) -> Option<User> {
        if let Some(user) = task.assignees.iter().find(|u| u.id == id) {
            return Some(user.clone());
        }
        match self.users.find_by_id(id).await {
            Ok(user) => user,
            Err(e) => {
                error!(user_id = %id, error = %e, "Failed to load notification recipient");
                None
            }
        }
    }

    async fn deliver(&self, user: &User, task_id: Uuid, text: &str) -> bool {
        if user.tg_id == 0 {
            debug!(user_id = %user.id, "Recipient has no Telegram chat");
            return false;
        }

        let message = OutgoingMessage::new(user.tg_id, text).with_markup(task_markup(&self.bot_username, task_id));
        match self.chat.send_message(message).await {
            Ok(()) => true,
            Err(e) => {
                error!(chat_id = user.tg_id, task_id = %task_id, error = %e, "Failed to send notification");
                false
            }
        }
    }

    /// Post the comment into the task's group thread, falling back to the
    /// general topic when the thread is gone
    async fn echo_comment_to_group(&self, task: &Task, actor_name: Option<&str>, comment: &TaskComment) {
        let Some(group_id) = task.group_id else {
            return;
        };
        let thread_id = task.topic.as_deref().and_then(|t| t.parse::<i32>().ok());

        let title = escape_html(&task.title);
        let heading = if self.bot_username.is_empty() {
            title
        } else {
            format!(
                "<a href=\"{}\">{}</a>",
                task_deep_link(&self.bot_username, &task.id.to_string()),
                title
            )
        };
        let text = format!(
            "💬 New comment on {}\n\n{}: {}",
            heading,
            escape_html(actor_name.unwrap_or("User")),
            escape_html(&comment.content)
        );

        let message = OutgoingMessage::new(group_id, text.clone()).in_thread(thread_id);
        if let Err(e) = self.chat.send_message(message).await {
            warn!(group_id = group_id, thread_id = thread_id, error = %e, "Failed to post comment to group");
            if thread_id.is_some() {
                if let Err(e) = self.chat.send_message(OutgoingMessage::new(group_id, text)).await {
                    error!(group_id = group_id, error = %e, "Failed to post comment to general topic");
                }
            }
        }
    }
}

//! Inline query handler
//!
//! `@bot share <task id>` (or `assign <task id>`) offers a share card with a
//! claim button; any other text offers to post it as a `/todo` command.

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::handlers::HandlerContext;
use crate::models::{InlineQuery, Task};
use crate::services::telegram::{Button, InlineArticle};
use crate::utils::errors::TodoBridgeError;
use crate::utils::helpers::{escape_html, task_deep_link, truncate_text};

/// Callback data prefix of the claim button
pub const ACCEPT_TASK_PREFIX: &str = "accept_task:";

const TITLE_PREVIEW_CHARS: usize = 50;

/// Task id of a `share <id>` or `assign <id>` query
pub fn shared_task_id(query: &str) -> Option<&str> {
    let mut parts = query.split_whitespace();
    let verb = parts.next()?;
    if !verb.eq_ignore_ascii_case("share") && !verb.eq_ignore_ascii_case("assign") {
        return None;
    }
    parts.next()
}

fn assignee_label(task: &Task) -> String {
    task.assignees
        .first()
        .map(|u| u.name.clone())
        .unwrap_or_else(|| "unclaimed".to_string())
}

/// HTML card and keyboard for sharing a task into another chat
pub fn share_card(task: &Task, bot_username: &str) -> (String, Vec<Vec<Button>>) {
    let due = task
        .due_at
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "none".to_string());
    let text = format!(
        "📋 <b>Shared task</b>\n\n\
         <b>{}</b>\n\
         ──────────────\n\
         👤 Assignee: {}\n\
         📅 Due: {}\n\
         ──────────────\n\
         👇 Tap below to take this task",
        escape_html(&task.title),
        escape_html(&assignee_label(task)),
        due
    );

    let mut keyboard = vec![vec![Button::callback(
        "🙋 Claim",
        format!("{}{}", ACCEPT_TASK_PREFIX, task.id),
    )]];
    if !bot_username.is_empty() {
        keyboard.push(vec![Button::url(
            "🔍 View details",
            task_deep_link(bot_username, &task.id.to_string()),
        )]);
    }
    (text, keyboard)
}

fn not_found_article(raw_id: &str) -> InlineArticle {
    InlineArticle {
        id: "error".to_string(),
        title: "Error: Task Not Found".to_string(),
        description: Some(format!("Could not find task with ID: {}", raw_id)),
        message_text: format!("Task {} not found", escape_html(raw_id)),
        keyboard: Vec::new(),
    }
}

async fn share_article(ctx: &HandlerContext, raw_id: &str) -> InlineArticle {
    let Ok(task_id) = Uuid::parse_str(raw_id) else {
        return not_found_article(raw_id);
    };

    match ctx.services.tasks.get_task(task_id).await {
        Ok(task) => {
            let (text, keyboard) = share_card(&task, &ctx.bot_username);
            InlineArticle {
                id: task.id.to_string(),
                title: format!("Share task: {}", task.title),
                description: Some(format!("Current assignee: {}", assignee_label(&task))),
                message_text: text,
                keyboard,
            }
        }
        Err(TodoBridgeError::TaskNotFound { .. }) => not_found_article(raw_id),
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "Failed to load shared task");
            not_found_article(raw_id)
        }
    }
}

fn create_article(query: &str) -> InlineArticle {
    InlineArticle {
        id: "create_task".to_string(),
        title: format!("Create task: {}", truncate_text(query, TITLE_PREVIEW_CHARS)),
        description: Some("Tap to send the task command".to_string()),
        message_text: format!("/todo {}", escape_html(query)),
        keyboard: Vec::new(),
    }
}

pub async fn handle_inline_query(ctx: &HandlerContext, query: &InlineQuery) {
    let text = query.query.trim();
    if text.is_empty() {
        debug!(user_id = query.from.id, "Ignoring empty inline query");
        return;
    }

    let article = match shared_task_id(text) {
        Some(raw_id) => share_article(ctx, raw_id).await,
        None => create_article(text),
    };

    if let Err(e) = ctx.services.chat.answer_inline_query(&query.id, vec![article]).await {
        error!(query_id = %query.id, error = %e, "Failed to answer inline query");
    }
}

//! Inline button callbacks

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::handlers::inline::ACCEPT_TASK_PREFIX;
use crate::handlers::HandlerContext;
use crate::models::{CallbackQuery, CreateUserRequest};
use crate::services::telegram::{Button, MessageRef};
use crate::utils::errors::{Result, TodoBridgeError};
use crate::utils::helpers::{escape_html, task_deep_link};

pub async fn handle_callback_query(ctx: &HandlerContext, query: &CallbackQuery) {
    let data = query.data.as_deref().unwrap_or_default();

    let answer = match data.strip_prefix(ACCEPT_TASK_PREFIX) {
        Some(raw_id) => match accept_task(ctx, query, raw_id).await {
            Ok(()) => Some("✅ You are now the assignee!"),
            Err(e) => {
                warn!(user_id = query.from.id, task_id = %raw_id, error = %e, "Failed to claim task");
                Some("❌ Failed to assign task")
            }
        },
        None => {
            debug!(data = %data, "Ignoring unknown callback data");
            None
        }
    };

    // Answer every callback so the client stops its loading indicator
    if let Err(e) = ctx.services.chat.answer_callback_query(&query.id, answer).await {
        error!(query_id = %query.id, error = %e, "Failed to answer callback query");
    }
}

/// The tapping user takes the task; the card is rewritten to say so
async fn accept_task(ctx: &HandlerContext, query: &CallbackQuery, raw_id: &str) -> Result<()> {
    let task_id = Uuid::parse_str(raw_id)
        .map_err(|_| TodoBridgeError::InvalidInput("malformed task id in callback data".to_string()))?;

    let task = ctx
        .services
        .tasks
        .assign_task_to_telegram_user(task_id, CreateUserRequest::from(&query.from))
        .await?;
    info!(task_id = %task.id, tg_id = query.from.id, "Task claimed from a shared card");

    let target = if let Some(inline_id) = query.inline_message_id.clone() {
        MessageRef::Inline(inline_id)
    } else if let Some(message) = &query.message {
        MessageRef::Chat {
            chat_id: message.chat.id,
            message_id: message.message_id,
        }
    } else {
        return Ok(());
    };

    let text = format!(
        "📋 <b>Task: {}</b>\n\n✅ Assigned to {}",
        escape_html(&task.title),
        escape_html(&query.from.display_name())
    );
    let mut keyboard = Vec::new();
    if !ctx.bot_username.is_empty() {
        keyboard.push(vec![Button::url(
            "🔍 View task details",
            task_deep_link(&ctx.bot_username, &task.id.to_string()),
        )]);
    }
    if let Some(url) = ctx.links.start_app_url("") {
        keyboard.push(vec![Button::url("📋 View all todos", url)]);
    }

    // The claim already stuck; a stale card is not worth failing the answer
    if let Err(e) = ctx.services.chat.edit_message_text(target, text, keyboard).await {
        error!(task_id = %task.id, error = %e, "Failed to update shared task card");
    }
    Ok(())
}

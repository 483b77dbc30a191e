//! Message handlers module
//!
//! Handles incoming messages: forwarded messages become personal tasks,
//! commands go to the command dispatcher and plain text may trigger task
//! creation.

use tracing::{debug, error, info};

use crate::handlers::commands::{self, todo, Command};
use crate::handlers::HandlerContext;
use crate::models::{CreateUserRequest, IncomingMessage};
use crate::utils::helpers::{escape_html, extract_command};

/// Whether a non-command message creates a task: any text in a private
/// chat, text mentioning the bot in a group
pub fn should_create_task(msg: &IncomingMessage, bot_username: &str) -> bool {
    let text = msg.text();
    if text.trim().is_empty() {
        return false;
    }
    if msg.chat.is_private() {
        return true;
    }
    if !msg.chat.is_group() || bot_username.is_empty() {
        return false;
    }
    text.to_lowercase()
        .contains(&format!("@{}", bot_username.to_lowercase()))
}

/// Handle incoming messages
pub async fn handle_message(ctx: &HandlerContext, msg: &IncomingMessage) {
    let Some(from) = msg.from.as_ref() else {
        debug!(chat_id = msg.chat.id, "Ignoring message without sender");
        return;
    };

    if let Err(e) = ctx.services.users.ensure_user(CreateUserRequest::from(from)).await {
        error!(user_id = from.id, error = %e, "Failed to ensure user");
    }

    if msg.is_forward() {
        handle_forwarded_message(ctx, msg).await;
        return;
    }

    if let Some(parsed) = extract_command(msg.text()) {
        if let Some(target) = parsed.target.as_deref() {
            if !ctx.bot_username.is_empty() && !target.eq_ignore_ascii_case(&ctx.bot_username) {
                debug!(command = %parsed.name, target = %target, "Ignoring command for another bot");
                return;
            }
        }
        match Command::from_name(&parsed.name) {
            Some(cmd) => commands::handle_command(ctx, msg, cmd, &parsed).await,
            None => debug!(command = %parsed.name, "Ignoring unknown command"),
        }
        return;
    }

    if should_create_task(msg, &ctx.bot_username) {
        todo::handle_task_command(ctx, msg).await;
    }
}

/// Save a forwarded text message to the sender's inbox
pub async fn handle_forwarded_message(ctx: &HandlerContext, msg: &IncomingMessage) {
    let Some(from) = msg.from.as_ref() else {
        return;
    };

    let text = msg.text().trim();
    if text.is_empty() {
        ctx.reply(msg, "⚠️ Only forwarded text messages can be saved for now.", None)
            .await;
        return;
    }

    let source = msg.forward_source();
    let task = match ctx
        .services
        .task_creator
        .create_personal_task(from.id, msg.chat.id, text, &source)
        .await
    {
        Ok(task) => task,
        Err(e) => {
            error!(user_id = from.id, error = %e, "Failed to create personal task");
            ctx.reply(msg, "❌ Sorry, the task could not be saved. Please try again later.", None)
                .await;
            return;
        }
    };
    info!(task_id = %task.id, user_id = from.id, source = %source, "Forwarded message saved");

    let mut reply = format!("✅ Saved to inbox: {}", escape_html(&task.title));
    let markup = if task.database_id.is_none() {
        reply.push_str("\n(Saved locally only. Connect Notion to turn on sync.)");
        ctx.links.web_app_markup("⚙️ Connect", "settings")
    } else {
        reply.push_str("\n(Syncing to Notion)");
        None
    };
    ctx.reply(msg, reply, markup).await;
}

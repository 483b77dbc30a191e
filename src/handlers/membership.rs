//! Bot membership handlers
//!
//! Handles the bot being added to or removed from groups

use tracing::{debug, error, info};

use crate::handlers::HandlerContext;
use crate::models::{ChatMemberUpdate, CreateUserRequest, GroupStatus};
use crate::services::telegram::OutgoingMessage;

/// Welcome text for a group; mentions the settings button only when there is one
pub fn welcome_text(bot_username: &str, has_button: bool) -> String {
    let footer = if has_button {
        "💡 Use the button below to set up extras such as Notion sync"
    } else {
        "💡 Send /help to see more features"
    };
    format!(
        "👋 Welcome to TodoBridge!\n\n\
         📝 <b>How to create tasks</b>\n\
         • Mention @{bot} with some text\n\
         • Reply to a message and mention @{bot}\n\
         • Mention members to assign the task to them\n\n\
         {footer}",
        bot = bot_username,
        footer = footer
    )
}

/// Handle a change of the bot's own membership
pub async fn handle_membership_change(ctx: &HandlerContext, update: &ChatMemberUpdate) {
    let chat = &update.chat;
    match update.new_chat_member.status.as_str() {
        "member" | "administrator" => handle_bot_added_to_group(ctx, update).await,
        "left" | "kicked" => {
            info!(chat_id = chat.id, "Bot removed from group");
            if let Err(e) = ctx.services.groups.update_status(chat.id, GroupStatus::Inactive).await {
                error!(chat_id = chat.id, error = %e, "Failed to mark group inactive");
            }
        }
        other => debug!(chat_id = chat.id, status = %other, "Ignoring membership status"),
    }
}

/// Register the group, record who added the bot and post the welcome message
pub async fn handle_bot_added_to_group(ctx: &HandlerContext, update: &ChatMemberUpdate) {
    let chat = &update.chat;
    let title = chat.title.clone().unwrap_or_default();

    if let Err(e) = ctx
        .services
        .groups
        .ensure_group(chat.id, &title, Some(CreateUserRequest::from(&update.from)))
        .await
    {
        error!(chat_id = chat.id, error = %e, "Failed to ensure group");
        return;
    }

    let markup = ctx
        .links
        .web_app_markup("⚙️ Advanced settings", &format!("bind_{}", chat.id));
    let text = welcome_text(&ctx.bot_username, markup.is_some());
    ctx.send(OutgoingMessage::new(chat.id, text).with_markup(markup)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_text_footer() {
        let with_button = welcome_text("todo_bot", true);
        assert!(with_button.contains("Mention @todo_bot"));
        assert!(with_button.contains("button below"));
        assert!(welcome_text("todo_bot", false).contains("/help"));
    }
}

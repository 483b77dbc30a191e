//! Group binding command handler

use tracing::{error, info, warn};

use crate::handlers::HandlerContext;
use crate::models::{CreateUserRequest, IncomingMessage};
use crate::services::telegram::MemberRole;
use crate::utils::helpers::escape_html;

/// Handle /bind: register the group and hand admins a Mini App button to
/// pick the Notion database
pub async fn handle_bind(ctx: &HandlerContext, msg: &IncomingMessage) {
    if !msg.chat.is_group() {
        ctx.reply(msg, "⚠️ /bind only works in group chats.", None).await;
        return;
    }
    let Some(from) = msg.from.as_ref() else {
        return;
    };

    match ctx.services.chat.get_chat_member(msg.chat.id, from.id).await {
        Ok(MemberRole::Admin) => {}
        Ok(role) => {
            info!(chat_id = msg.chat.id, user_id = from.id, role = ?role, "Rejected /bind from non-admin");
            ctx.reply(msg, "⚠️ Only group admins can bind a Notion database.", None).await;
            return;
        }
        Err(e) => {
            warn!(chat_id = msg.chat.id, user_id = from.id, error = %e, "Failed to check admin status for /bind");
            ctx.reply(msg, "❌ Could not verify your permissions, please try again later.", None).await;
            return;
        }
    }

    let title = msg.chat.title.clone().unwrap_or_default();
    if let Err(e) = ctx
        .services
        .groups
        .ensure_group(msg.chat.id, &title, Some(CreateUserRequest::from(from)))
        .await
    {
        error!(chat_id = msg.chat.id, error = %e, "Failed to ensure group on /bind");
    }

    let start_param = format!("bind_{}", msg.chat.id);
    let mut text = format!(
        "Bind a Notion database to «{}» to create tasks right from this chat.",
        escape_html(&title)
    );
    if let Some(link) = ctx.links.shareable_link(&start_param) {
        text.push_str(&format!("\n\n🔗 Open directly: {}", link));
    }
    ctx.post(msg, text, ctx.links.web_app_markup("Bind Notion database", &start_param))
        .await;
}

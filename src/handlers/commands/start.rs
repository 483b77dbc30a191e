//! Start and settings command handlers

use crate::handlers::commands::help::quick_command_keyboard;
use crate::handlers::HandlerContext;
use crate::models::IncomingMessage;

const WELCOME: &str = "👋 Welcome to TodoBridge!\n\n\
    • Send /todo or reply to a message to save it as a task\n\
    • Open the Mini App any time to manage your tasks, groups and settings\n\
    • Connect Notion in the settings whenever you want tasks synced\n\
    • Send /help to see every command";

const QUICK_ACTIONS: &str = "⚡️ Quick actions:\n\
    • Tap /todo to create a task\n\
    • Tap /settings to pick your default database\n\
    • Tap /help to list all commands";

/// Handle /start, optionally carrying a Mini App start parameter
pub async fn handle_start(ctx: &HandlerContext, msg: &IncomingMessage, start_param: Option<&str>) {
    let param = start_param.unwrap_or_default();

    let mut text = WELCOME.to_string();
    if let Some(link) = ctx.links.shareable_link(param) {
        text.push_str(&format!("\n\n🔗 Open directly: {}", link));
    }
    ctx.post(msg, text, ctx.links.web_app_markup("Open Mini App", param)).await;
    ctx.post(msg, QUICK_ACTIONS, Some(quick_command_keyboard())).await;
}

/// Handle /settings; only answered in private chats
pub async fn handle_settings(ctx: &HandlerContext, msg: &IncomingMessage) {
    if !msg.chat.is_private() {
        ctx.post(
            msg,
            "⚠️ Please send /settings in a private chat with the bot to keep your settings private.",
            None,
        )
        .await;
        return;
    }

    const START_PARAM: &str = "settings";
    let mut text = "🔧 Open the Mini App to set up your personal settings, default database and timezone.".to_string();
    if let Some(link) = ctx.links.shareable_link(START_PARAM) {
        text.push_str(&format!("\n\n🔗 Open directly: {}", link));
    }
    ctx.post(msg, text, ctx.links.web_app_markup("Open settings", START_PARAM)).await;
}

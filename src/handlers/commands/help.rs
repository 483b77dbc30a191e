//! Help command handler and the quick command keyboard

use crate::handlers::HandlerContext;
use crate::models::IncomingMessage;
use crate::services::telegram::{Button, ReplyMarkup};

const HELP_TEXT: &str = "🆘 Commands:\n\
    /start - Get started and open the Mini App\n\
    /menu - Show the quick command keyboard\n\
    /close - Hide the quick command keyboard\n\
    /help - Show this help message\n\
    /settings - Personal settings (Notion, default database)\n\
    /bind - (group admins) Bind this group to a Notion database\n\
    /todo - Create a task, or reply to a message and mention the bot\n\n\
    More in the Mini App help center.";

/// Reply keyboard with the most used commands
pub fn quick_command_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(vec![
        vec!["/todo".to_string(), "/settings".to_string()],
        vec!["/help".to_string(), "/close".to_string()],
    ])
}

fn help_markup(ctx: &HandlerContext) -> ReplyMarkup {
    let mut rows = Vec::new();
    if let Some(url) = ctx.links.button_url("") {
        rows.push(vec![Button::web_app("Open Mini App", url)]);
    }
    rows.push(vec![
        Button::switch_inline("Type /todo", "/todo "),
        Button::switch_inline("Type /menu", "/menu"),
    ]);
    ReplyMarkup::Inline(rows)
}

/// Handle /help command
pub async fn handle_help(ctx: &HandlerContext, msg: &IncomingMessage) {
    ctx.post(msg, HELP_TEXT, Some(help_markup(ctx))).await;
}

pub async fn handle_menu(ctx: &HandlerContext, msg: &IncomingMessage) {
    ctx.post(
        msg,
        "📋 Here is the quick menu, tap a button to send the command. Send /close to hide it.",
        Some(quick_command_keyboard()),
    )
    .await;
}

pub async fn handle_hide_keyboard(ctx: &HandlerContext, msg: &IncomingMessage) {
    ctx.post(
        msg,
        "✅ Quick menu hidden. Send /menu to show it again.",
        Some(ReplyMarkup::RemoveKeyboard),
    )
    .await;
}

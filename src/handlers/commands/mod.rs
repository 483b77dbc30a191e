//! Command handlers module
//!
//! This module contains handlers for all bot commands like /start, /todo, etc.

pub mod bind;
pub mod help;
pub mod start;
pub mod todo;

use teloxide::utils::command::BotCommands;
use tracing::debug;

use crate::handlers::HandlerContext;
use crate::models::IncomingMessage;
use crate::utils::helpers::ParsedCommand;

/// All available bot commands
#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "TodoBridge commands:")]
pub enum Command {
    #[command(description = "Start the bot and open the Mini App")]
    Start,
    #[command(description = "Show help information")]
    Help,
    #[command(description = "Personal settings (private chat)")]
    Settings,
    #[command(description = "Bind this group to a Notion database")]
    Bind,
    #[command(description = "Create a task, mention people to assign it")]
    Todo,
    #[command(description = "Show the quick command keyboard")]
    Menu,
    #[command(description = "Hide the quick command keyboard")]
    Close,
    #[command(description = "off")]
    Hide,
}

impl Command {
    /// Look up a command by its lowercased name including the slash
    pub fn from_name(name: &str) -> Option<Self> {
        let command = match name {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/settings" => Command::Settings,
            "/bind" => Command::Bind,
            "/todo" => Command::Todo,
            "/menu" => Command::Menu,
            "/close" => Command::Close,
            "/hide" => Command::Hide,
            _ => return None,
        };
        Some(command)
    }
}

/// Main command dispatcher
pub async fn handle_command(
    ctx: &HandlerContext,
    msg: &IncomingMessage,
    cmd: Command,
    parsed: &ParsedCommand,
) {
    debug!(chat_id = msg.chat.id, command = ?cmd, "Handling command");

    match cmd {
        Command::Start => start::handle_start(ctx, msg, parsed.args.first().map(String::as_str)).await,
        Command::Help => help::handle_help(ctx, msg).await,
        Command::Settings => start::handle_settings(ctx, msg).await,
        Command::Bind => bind::handle_bind(ctx, msg).await,
        Command::Todo => todo::handle_task_command(ctx, msg).await,
        Command::Menu => help::handle_menu(ctx, msg).await,
        Command::Close | Command::Hide => help::handle_hide_keyboard(ctx, msg).await,
    }
}

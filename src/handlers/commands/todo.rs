//! Task command handler
//!
//! Used for `/todo` and for the implicit triggers (any text in a private
//! chat, a bot mention in a group).

use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::inline::{share_card, shared_task_id};
use crate::handlers::{HandlerContext, WebAppLinks};
use crate::models::{IncomingMessage, Task};
use crate::services::task_creator::CreateTaskInput;
use crate::services::telegram::ReplyMarkup;
use crate::utils::helpers::{escape_html, extract_command, strip_bot_mention, strip_mentions, task_deep_link};

/// Text the task is created from.
///
/// Drops the command word and the bot's own mention. When only mentions
/// remain and the message is a reply, the replied text (or caption) is
/// appended so `reply + @bot @alice` turns the quoted message into a task.
pub fn task_text(msg: &IncomingMessage, bot_username: &str) -> String {
    let mut text = strip_bot_mention(msg.text(), bot_username);
    if let Some(parsed) = extract_command(&text).filter(|c| c.name == "/todo") {
        text = parsed.args.join(" ");
    }

    if strip_mentions(&text).is_empty() {
        if let Some(content) = msg.reply_to_message.as_ref().and_then(|r| r.content()) {
            if !strip_mentions(content).is_empty() {
                text = format!("{} {}", text, content).trim().to_string();
            }
        }
    }
    text
}

/// Confirmation text and markup for a created task
pub fn confirmation(
    task: &Task,
    unresolved: &[String],
    is_group: bool,
    bot_username: &str,
    links: &WebAppLinks,
) -> (String, Option<ReplyMarkup>) {
    let title = escape_html(&task.title);
    let assignee_count = task.assignees.len();

    if is_group {
        // Web app buttons are not allowed in groups, so link instead
        let url = task_deep_link(bot_username, &task.id.to_string());
        let mut mentions: Vec<String> = task
            .assignees
            .iter()
            .filter_map(|u| u.tg_username.as_deref().filter(|n| !n.is_empty()))
            .map(|n| format!("@{}", n))
            .collect();
        mentions.extend(unresolved.iter().cloned());

        let text = if !mentions.is_empty() {
            format!(
                "✅ Task created: {}\n\n{} please <a href=\"{}\">open the task</a>",
                title,
                mentions.join(" "),
                url
            )
        } else if assignee_count > 0 {
            format!(
                "✅ Task created: {}\n\n👥 Assigned to {} people\n<a href=\"{}\">Open task</a>",
                title, assignee_count, url
            )
        } else {
            format!("✅ Task created: {}\n\n<a href=\"{}\">Open task</a>", title, url)
        };
        return (text, None);
    }

    let mut text = if assignee_count > 1 {
        format!("✅ Task created: {}\n👥 Assigned to {} people", title, assignee_count)
    } else {
        format!("✅ Task created: {}", title)
    };

    let markup = if task.database_id.is_none() {
        links.web_app_markup("⚙️ Settings", "settings")
    } else {
        text.push_str("\n🔄 Syncing to Notion");
        links.web_app_markup("📋 View details", &format!("task_{}", task.id))
    };
    (text, markup)
}

/// Create a task from the message and confirm it in the chat
pub async fn handle_task_command(ctx: &HandlerContext, msg: &IncomingMessage) {
    let Some(from) = msg.from.as_ref() else {
        return;
    };

    let text = task_text(msg, &ctx.bot_username);
    if text.is_empty() {
        ctx.reply(msg, "⚠️ Task content cannot be empty.", None).await;
        return;
    }

    // `share <id>` sent as plain text answers with the card instead of a new task
    if let Some(task_id) = shared_task_id(&text).and_then(|id| Uuid::parse_str(id).ok()) {
        if let Ok(task) = ctx.services.tasks.get_task(task_id).await {
            let (card, keyboard) = share_card(&task, &ctx.bot_username);
            ctx.reply(msg, card, Some(ReplyMarkup::Inline(keyboard))).await;
            return;
        }
    }

    let input = CreateTaskInput {
        chat_id: msg.chat.id,
        chat_type: msg.chat.kind.clone(),
        chat_title: msg.chat.title.clone(),
        author_tg_id: from.id,
        text,
        reply_to_message_id: msg.reply_to_message.as_ref().map(|r| r.message_id),
        thread_id: msg.message_thread_id,
    };

    match ctx.services.task_creator.create_task(input).await {
        Ok((task, unresolved)) => {
            info!(
                task_id = %task.id,
                chat_id = msg.chat.id,
                pending = unresolved.len(),
                "Task created from chat"
            );
            let (reply, markup) = confirmation(&task, &unresolved, msg.chat.is_group(), &ctx.bot_username, &ctx.links);
            ctx.reply(msg, reply, markup).await;
        }
        Err(e) => {
            error!(chat_id = msg.chat.id, error = %e, "Failed to create task");
            ctx.reply(msg, "❌ Sorry, the task could not be created. Please try again later.", None)
                .await;
        }
    }
}

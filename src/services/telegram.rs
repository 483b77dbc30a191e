//! Outbound Telegram client
//!
//! The engine talks to Telegram through the [`ChatClient`] trait. Messages
//! are always sent in HTML parse mode; markup is described with the
//! transport-neutral [`ReplyMarkup`] and converted to teloxide types here.

use async_trait::async_trait;
use teloxide::payloads::{
    AnswerCallbackQuerySetters, AnswerInlineQuerySetters, EditMessageTextInlineSetters, EditMessageTextSetters,
    GetUpdatesSetters, SendMessageSetters,
};
use teloxide::requests::Requester;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InlineQueryResult, InlineQueryResultArticle,
    InputMessageContent, InputMessageContentText, KeyboardButton, KeyboardMarkup, KeyboardRemove, MessageId,
    ParseMode, ReplyParameters, ThreadId, UserId, WebAppInfo,
};
use teloxide::Bot;
use tracing::{debug, warn};
use url::Url;

use crate::config::BotConfig;
use crate::utils::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Url(String),
    WebApp(String),
    /// Pre-fills the input field of the current chat
    SwitchInlineCurrentChat(String),
    /// Sends the data back as a callback query
    Callback(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self { text: text.into(), action: ButtonAction::Url(url.into()) }
    }

    pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self { text: text.into(), action: ButtonAction::WebApp(url.into()) }
    }

    pub fn switch_inline(text: impl Into<String>, query: impl Into<String>) -> Self {
        Self { text: text.into(), action: ButtonAction::SwitchInlineCurrentChat(query.into()) }
    }

    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self { text: text.into(), action: ButtonAction::Callback(data.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    Inline(Vec<Vec<Button>>),
    /// Reply keyboard of plain text buttons
    Keyboard(Vec<Vec<String>>),
    RemoveKeyboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub markup: Option<ReplyMarkup>,
    pub reply_to: Option<i64>,
    pub thread_id: Option<i32>,
}

impl OutgoingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            markup: None,
            reply_to: None,
            thread_id: None,
        }
    }

    pub fn with_markup(mut self, markup: Option<ReplyMarkup>) -> Self {
        self.markup = markup;
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id).filter(|id| *id != 0);
        self
    }

    pub fn in_thread(mut self, thread_id: Option<i32>) -> Self {
        self.thread_id = thread_id.filter(|id| *id != 0);
        self
    }

    /// Thread to send into. Telegram infers the thread of a reply, and an
    /// explicit one can be rejected as "message thread not found".
    pub fn effective_thread(&self) -> Option<i32> {
        if self.reply_to.is_some() {
            None
        } else {
            self.thread_id
        }
    }
}

/// An article offered as an inline query result. Choosing it posts
/// `message_text` (HTML) with the optional inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineArticle {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub message_text: String,
    pub keyboard: Vec<Vec<Button>>,
}

/// A message the bot can edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRef {
    Chat { chat_id: i64, message_id: i64 },
    /// Message sent through an inline result
    Inline(String),
}

/// Membership of a user in a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Admin,
    Member,
    Absent,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(&self, message: OutgoingMessage) -> Result<()>;

    /// Raw update envelopes for long polling
    async fn get_updates(&self, offset: i64, timeout_secs: u32) -> Result<Vec<serde_json::Value>>;

    async fn get_chat_member(&self, chat_id: i64, user_id: i64) -> Result<MemberRole>;

    /// Results are personal and never cached
    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineArticle>) -> Result<()>;

    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>) -> Result<()>;

    /// Replace the text and inline keyboard of a message
    async fn edit_message_text(&self, target: MessageRef, text: String, keyboard: Vec<Vec<Button>>) -> Result<()>;
}

/// [`ChatClient`] over the Bot API
#[derive(Clone)]
pub struct TelegramChatClient {
    bot: Bot,
}

impl TelegramChatClient {
    pub fn new(config: &BotConfig) -> Result<Self> {
        let mut bot = Bot::new(&config.token);
        if let Some(api_url) = config.api_url.as_deref().filter(|u| !u.is_empty()) {
            bot = bot.set_api_url(Url::parse(api_url)?);
        }
        Ok(Self { bot })
    }

    pub fn from_bot(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn inline_button(button: &Button) -> Option<InlineKeyboardButton> {
    match &button.action {
        ButtonAction::Url(raw) => match Url::parse(raw) {
            Ok(url) => Some(InlineKeyboardButton::url(button.text.clone(), url)),
            Err(e) => {
                warn!(url = %raw, error = %e, "Dropping button with invalid URL");
                None
            }
        },
        ButtonAction::WebApp(raw) => match Url::parse(raw) {
            Ok(url) => Some(InlineKeyboardButton::web_app(button.text.clone(), WebAppInfo { url })),
            Err(e) => {
                warn!(url = %raw, error = %e, "Dropping web app button with invalid URL");
                None
            }
        },
        ButtonAction::SwitchInlineCurrentChat(query) => Some(
            InlineKeyboardButton::switch_inline_query_current_chat(button.text.clone(), query.clone()),
        ),
        ButtonAction::Callback(data) => Some(InlineKeyboardButton::callback(button.text.clone(), data.clone())),
    }
}

/// Keyboard without the invalid buttons; `None` when nothing is left
fn inline_keyboard(rows: &[Vec<Button>]) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = rows
        .iter()
        .map(|row| row.iter().filter_map(inline_button).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();
    if rows.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(rows))
    }
}

fn to_inline_result(article: InlineArticle) -> InlineQueryResult {
    let content = InputMessageContent::Text(InputMessageContentText::new(article.message_text).parse_mode(ParseMode::Html));
    let mut result = InlineQueryResultArticle::new(article.id, article.title, content);
    if let Some(description) = article.description {
        result = result.description(description);
    }
    if let Some(keyboard) = inline_keyboard(&article.keyboard) {
        result = result.reply_markup(keyboard);
    }
    InlineQueryResult::Article(result)
}

fn to_teloxide_markup(markup: &ReplyMarkup) -> teloxide::types::ReplyMarkup {
    match markup {
        ReplyMarkup::Inline(rows) => inline_keyboard(rows).unwrap_or_default().into(),
        ReplyMarkup::Keyboard(rows) => {
            let rows = rows
                .iter()
                .map(|row| row.iter().map(|text| KeyboardButton::new(text.clone())).collect::<Vec<_>>());
            KeyboardMarkup::new(rows).resize_keyboard().into()
        }
        ReplyMarkup::RemoveKeyboard => KeyboardRemove::new().into(),
    }
}

#[async_trait]
impl ChatClient for TelegramChatClient {
    async fn send_message(&self, message: OutgoingMessage) -> Result<()> {
        let thread_id = message.effective_thread();
        debug!(
            chat_id = message.chat_id,
            has_markup = message.markup.is_some(),
            reply_to = message.reply_to,
            thread_id = thread_id,
            "Sending Telegram message"
        );

        let mut request = self
            .bot
            .send_message(ChatId(message.chat_id), message.text)
            .parse_mode(ParseMode::Html);

        if let Some(markup) = &message.markup {
            request = request.reply_markup(to_teloxide_markup(markup));
        }
        if let Some(reply_to) = message.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(reply_to as i32)));
        }
        if let Some(thread_id) = thread_id {
            request = request.message_thread_id(ThreadId(MessageId(thread_id)));
        }

        request.await?;
        Ok(())
    }

    async fn get_updates(&self, offset: i64, timeout_secs: u32) -> Result<Vec<serde_json::Value>> {
        let updates = self
            .bot
            .get_updates()
            .offset(offset as i32)
            .timeout(timeout_secs)
            .await?;

        let mut raw = Vec::with_capacity(updates.len());
        for update in updates {
            match serde_json::to_value(&update) {
                Ok(value) => raw.push(value),
                Err(e) => warn!(update_id = update.id.0, error = %e, "Skipping update that cannot be re-encoded"),
            }
        }
        Ok(raw)
    }

    async fn get_chat_member(&self, chat_id: i64, user_id: i64) -> Result<MemberRole> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .await?;

        let role = if member.is_privileged() {
            MemberRole::Admin
        } else if member.is_present() {
            MemberRole::Member
        } else {
            MemberRole::Absent
        };
        Ok(role)
    }

    async fn answer_inline_query(&self, query_id: &str, results: Vec<InlineArticle>) -> Result<()> {
        debug!(query_id = query_id, results = results.len(), "Answering inline query");
        self.bot
            .answer_inline_query(query_id, results.into_iter().map(to_inline_result))
            .cache_time(0)
            .is_personal(true)
            .await?;
        Ok(())
    }

    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>) -> Result<()> {
        let mut request = self.bot.answer_callback_query(query_id);
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }

    async fn edit_message_text(&self, target: MessageRef, text: String, keyboard: Vec<Vec<Button>>) -> Result<()> {
        let keyboard = inline_keyboard(&keyboard);
        match target {
            MessageRef::Chat { chat_id, message_id } => {
                let mut request = self
                    .bot
                    .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
                    .parse_mode(ParseMode::Html);
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await?;
            }
            MessageRef::Inline(inline_message_id) => {
                let mut request = self
                    .bot
                    .edit_message_text_inline(inline_message_id, text)
                    .parse_mode(ParseMode::Html);
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_drops_thread() {
        let msg = OutgoingMessage::new(1, "hi").in_thread(Some(7));
        assert_eq!(msg.effective_thread(), Some(7));

        let reply = msg.reply_to(42);
        assert_eq!(reply.effective_thread(), None);
        assert_eq!(reply.reply_to, Some(42));
    }

    #[test]
    fn test_zero_ids_are_ignored() {
        let msg = OutgoingMessage::new(1, "hi").reply_to(0).in_thread(Some(0));
        assert_eq!(msg.reply_to, None);
        assert_eq!(msg.thread_id, None);
    }

    #[test]
    fn test_invalid_url_button_is_dropped() {
        assert!(inline_button(&Button::url("bad", "not a url")).is_none());
        assert!(inline_button(&Button::url("ok", "https://t.me/bot")).is_some());
        assert!(inline_button(&Button::switch_inline("todo", "/todo ")).is_some());
        assert!(inline_button(&Button::callback("Claim", "accept_task:1")).is_some());
    }

    #[test]
    fn test_keyboard_of_invalid_buttons_is_none() {
        assert!(inline_keyboard(&[]).is_none());
        assert!(inline_keyboard(&[vec![Button::url("bad", "not a url")]]).is_none());

        let keyboard = inline_keyboard(&[
            vec![Button::callback("Claim", "accept_task:1")],
            vec![Button::url("bad", "not a url")],
        ])
        .unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
    }
}

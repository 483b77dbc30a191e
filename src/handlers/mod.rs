//! Bot handlers module
//!
//! This module turns Telegram updates into service calls:
//! - Command handlers for bot commands
//! - Message handlers for forwards and implicit task triggers
//! - Membership handlers for the bot joining or leaving groups
//! - Inline query and button callback handlers for sharing and claiming tasks
//! - The webhook processor with its HTTP server and the polling loop

pub mod callbacks;
pub mod commands;
pub mod inline;
pub mod membership;
pub mod messages;
pub mod polling;
pub mod server;
pub mod webhook;

pub use commands::Command;
pub use polling::run_polling;
pub use server::{router, ServerState, WebhookServer};
pub use webhook::{ProcessOutcome, WebhookProcessor};

use tracing::{debug, error, warn};
use url::Url;

use crate::config::BotConfig;
use crate::models::IncomingMessage;
use crate::services::telegram::{Button, OutgoingMessage, ReplyMarkup};
use crate::services::ServiceFactory;

/// Query parameter a Mini App reads its start parameter from
const START_PARAM_QUERY: &str = "tg_web_app_start_param";

/// Builds Mini App links for buttons and plain-text fallbacks
#[derive(Debug, Clone, Default)]
pub struct WebAppLinks {
    bot_username: String,
    web_app_url: Option<String>,
}

impl WebAppLinks {
    pub fn new(bot_username: &str, web_app_url: Option<&str>) -> Self {
        Self {
            bot_username: bot_username.trim_start_matches('@').to_string(),
            web_app_url: web_app_url.map(str::trim).filter(|u| !u.is_empty()).map(str::to_string),
        }
    }

    /// Web app URL carrying the start parameter; `None` without a valid web app URL
    pub fn button_url(&self, start_param: &str) -> Option<String> {
        let raw = self.web_app_url.as_deref()?;
        let mut url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %raw, error = %e, "Invalid web app URL");
                return None;
            }
        };

        let param = start_param.trim();
        if !param.is_empty() {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != START_PARAM_QUERY)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair(START_PARAM_QUERY, param);
        }
        Some(url.to_string())
    }

    /// `t.me` link that opens the Mini App, falling back to the web app URL
    pub fn start_app_url(&self, start_param: &str) -> Option<String> {
        let param = start_param.trim();
        let encoded: String = url::form_urlencoded::byte_serialize(param.as_bytes()).collect();

        if !self.bot_username.is_empty() {
            let mut link = format!("https://t.me/{}/app", self.bot_username);
            if !param.is_empty() {
                link.push_str(&format!("?startapp={}", encoded));
            }
            return Some(link);
        }

        let base = self.web_app_url.as_deref()?.trim_end_matches('/');
        if param.is_empty() {
            return Some(base.to_string());
        }
        let sep = if base.contains('?') { '&' } else { '?' };
        Some(format!("{}{}{}={}", base, sep, START_PARAM_QUERY, encoded))
    }

    pub fn shareable_link(&self, start_param: &str) -> Option<String> {
        self.start_app_url(start_param)
            .or_else(|| self.button_url(start_param))
    }

    /// Single web app button, or `None` when no web app is configured
    pub fn web_app_markup(&self, text: &str, start_param: &str) -> Option<ReplyMarkup> {
        let url = self.button_url(start_param)?;
        Some(ReplyMarkup::Inline(vec![vec![Button::web_app(text, url)]]))
    }
}

/// Everything a handler needs
#[derive(Clone)]
pub struct HandlerContext {
    pub services: ServiceFactory,
    pub bot_username: String,
    pub links: WebAppLinks,
}

impl HandlerContext {
    pub fn new(services: ServiceFactory, bot: &BotConfig) -> Self {
        Self {
            services,
            bot_username: bot.username.trim_start_matches('@').to_string(),
            links: WebAppLinks::new(&bot.username, bot.web_app_url.as_deref()),
        }
    }

    /// Send a message; failures are logged and swallowed
    pub async fn send(&self, message: OutgoingMessage) {
        let chat_id = message.chat_id;
        debug!(chat_id = chat_id, "Sending handler reply");
        if let Err(e) = self.services.chat.send_message(message).await {
            error!(chat_id = chat_id, error = %e, "Failed to send Telegram message");
        }
    }

    /// Reply to `msg` in its thread
    pub async fn reply(&self, msg: &IncomingMessage, text: impl Into<String>, markup: Option<ReplyMarkup>) {
        let message = OutgoingMessage::new(msg.chat.id, text)
            .with_markup(markup)
            .reply_to(msg.message_id)
            .in_thread(msg.message_thread_id);
        self.send(message).await;
    }

    /// Post into the thread of `msg` without quoting it
    pub async fn post(&self, msg: &IncomingMessage, text: impl Into<String>, markup: Option<ReplyMarkup>) {
        let message = OutgoingMessage::new(msg.chat.id, text)
            .with_markup(markup)
            .in_thread(msg.message_thread_id);
        self.send(message).await;
    }
}

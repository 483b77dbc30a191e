//! Telegram update envelopes
//!
//! Raw updates are stored verbatim in `telegram_updates`. For processing they
//! are decoded once into [`Update`], whose payload is a closed set of the
//! variants the bot reacts to. Everything else becomes
//! [`UpdatePayload::Unsupported`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored raw update row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub raw_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl TgUser {
    pub fn display_name(&self) -> String {
        crate::utils::helpers::display_name(&self.first_name, self.last_name.as_deref(), self.username.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TgChat {
    pub id: i64,
    /// `private`, `group`, `supergroup` or `channel`
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl TgChat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }

    pub fn is_group(&self) -> bool {
        self.kind == "group" || self.kind == "supergroup"
    }
}

/// The message a reply points at; only the parts used for task titles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepliedMessage {
    pub message_id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl RepliedMessage {
    /// Text, falling back to the media caption
    pub fn content(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.caption.as_deref().filter(|c| !c.is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TgUser>,
    pub chat: TgChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub message_thread_id: Option<i32>,
    #[serde(default)]
    pub reply_to_message: Option<RepliedMessage>,
    #[serde(default)]
    pub forward_date: Option<i64>,
    #[serde(default)]
    pub forward_from: Option<TgUser>,
    #[serde(default)]
    pub forward_from_chat: Option<TgChat>,
}

impl IncomingMessage {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn is_forward(&self) -> bool {
        self.forward_date.map_or(false, |d| d > 0) || self.forward_from.is_some() || self.forward_from_chat.is_some()
    }

    /// Human-readable origin of a forwarded message
    pub fn forward_source(&self) -> ForwardSource {
        if let Some(user) = &self.forward_from {
            let mut name = user.display_name();
            if let Some(username) = user.username.as_deref().filter(|u| !u.is_empty()) {
                name.push_str(&format!(" (@{})", username));
            }
            ForwardSource::User(name)
        } else if let Some(chat) = &self.forward_from_chat {
            ForwardSource::Chat(chat.title.clone().unwrap_or_default())
        } else {
            ForwardSource::Hidden
        }
    }
}

impl From<&TgUser> for crate::models::CreateUserRequest {
    fn from(user: &TgUser) -> Self {
        Self {
            tg_id: user.id,
            tg_username: user.username.clone().filter(|u| !u.is_empty()),
            name: user.display_name(),
            photo_url: None,
        }
    }
}

/// Where a forwarded message came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardSource {
    User(String),
    Chat(String),
    /// The original sender hides their account
    Hidden,
}

impl std::fmt::Display for ForwardSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForwardSource::User(name) | ForwardSource::Chat(name) => f.write_str(name),
            ForwardSource::Hidden => f.write_str("Anonymous Forward"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMember {
    /// `member`, `administrator`, `creator`, `left`, `kicked` or `restricted`
    pub status: String,
    pub user: TgUser,
}

/// A `my_chat_member` update: the bot's own membership changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMemberUpdate {
    pub chat: TgChat,
    pub from: TgUser,
    pub new_chat_member: ChatMember,
}

/// Text typed after the bot's username in any chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: TgUser,
    #[serde(default)]
    pub query: String,
}

/// The message an inline button was attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackMessage {
    pub message_id: i64,
    pub chat: TgChat,
}

/// A tap on an inline button carrying callback data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    #[serde(default)]
    pub message: Option<CallbackMessage>,
    /// Set instead of `message` when the button sits on an inline result
    #[serde(default)]
    pub inline_message_id: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePayload {
    Message(IncomingMessage),
    MembershipChange(ChatMemberUpdate),
    InlineQuery(InlineQuery),
    CallbackQuery(CallbackQuery),
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub update_id: i64,
    pub payload: UpdatePayload,
}

#[derive(Deserialize)]
struct RawEnvelope {
    update_id: i64,
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    my_chat_member: Option<serde_json::Value>,
    #[serde(default)]
    inline_query: Option<serde_json::Value>,
    #[serde(default)]
    callback_query: Option<serde_json::Value>,
}

impl Update {
    /// Decode an update envelope.
    ///
    /// Fails only when `update_id` is missing or malformed. A known variant
    /// whose body does not decode is treated as unsupported.
    pub fn decode(raw: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let envelope = RawEnvelope::deserialize(raw)?;

        let payload = if let Some(member) = envelope.my_chat_member {
            serde_json::from_value(member)
                .map(UpdatePayload::MembershipChange)
                .unwrap_or(UpdatePayload::Unsupported)
        } else if let Some(query) = envelope.inline_query {
            serde_json::from_value(query)
                .map(UpdatePayload::InlineQuery)
                .unwrap_or(UpdatePayload::Unsupported)
        } else if let Some(callback) = envelope.callback_query {
            serde_json::from_value(callback)
                .map(UpdatePayload::CallbackQuery)
                .unwrap_or(UpdatePayload::Unsupported)
        } else if let Some(message) = envelope.message {
            serde_json::from_value(message)
                .map(UpdatePayload::Message)
                .unwrap_or(UpdatePayload::Unsupported)
        } else {
            UpdatePayload::Unsupported
        };

        Ok(Self {
            update_id: envelope.update_id,
            payload,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            UpdatePayload::Message(_) => "message",
            UpdatePayload::MembershipChange(_) => "my_chat_member",
            UpdatePayload::InlineQuery(_) => "inline_query",
            UpdatePayload::CallbackQuery(_) => "callback_query",
            UpdatePayload::Unsupported => "unsupported",
        }
    }

    pub fn chat_id(&self) -> Option<i64> {
        match &self.payload {
            UpdatePayload::Message(m) => Some(m.chat.id),
            UpdatePayload::MembershipChange(c) => Some(c.chat.id),
            UpdatePayload::CallbackQuery(c) => c.message.as_ref().map(|m| m.chat.id),
            UpdatePayload::InlineQuery(_) | UpdatePayload::Unsupported => None,
        }
    }
}

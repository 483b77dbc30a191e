//! Helper functions and utilities
//!
//! Text handling shared by the webhook, the task creator and the
//! notification templates.

use std::sync::OnceLock;

use regex::Regex;

/// Matches `@handle` mentions
pub fn mention_regex() -> &'static Regex {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    MENTION.get_or_init(|| Regex::new(r"@\w+").expect("mention pattern is valid"))
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape text for Telegram HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Extract all `@handle` mentions in order of appearance
pub fn extract_mentions(text: &str) -> Vec<String> {
    mention_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Remove every `@handle` mention from the text and trim it
pub fn strip_mentions(text: &str) -> String {
    mention_regex().replace_all(text, "").trim().to_string()
}

/// Remove mentions of the bot itself (case-insensitive, whole word)
pub fn strip_bot_mention(text: &str, bot_username: &str) -> String {
    let bot = bot_username.trim_start_matches('@');
    if bot.is_empty() {
        return text.trim().to_string();
    }
    match Regex::new(&format!(r"(?i)@{}\b", regex::escape(bot))) {
        Ok(re) => re.replace_all(text, "").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}

/// Build a `t.me/c/` link to a message in a group chat.
///
/// Supergroup ids carry a `-100` prefix and basic groups a `-` prefix,
/// neither of which appears in the public link.
pub fn chat_jump_url(chat_id: i64, message_id: i64) -> String {
    let raw = chat_id.to_string();
    let id = if let Some(rest) = raw.strip_prefix("-100") {
        rest
    } else if let Some(rest) = raw.strip_prefix('-') {
        rest
    } else {
        raw.as_str()
    };
    format!("https://t.me/c/{}/{}", id, message_id)
}

/// Deep link that opens a task in the bot's Mini App
pub fn task_deep_link(bot_username: &str, task_id: &str) -> String {
    format!(
        "https://t.me/{}?startapp=task_{}",
        bot_username.trim_start_matches('@'),
        task_id
    )
}

/// A slash command split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased command including the slash, e.g. `/todo`
    pub name: String,
    /// Lowercased bot username after `@`, if addressed
    pub target: Option<String>,
    pub args: Vec<String>,
}

/// Split `/cmd@bot arg1 arg2` into its parts; `None` when the text is not a command
pub fn extract_command(text: &str) -> Option<ParsedCommand> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let mut parts = trimmed.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let (name, target) = match head.split_once('@') {
        Some((name, target)) => (name.to_string(), Some(target.to_string())),
        None => (head, None),
    };
    Some(ParsedCommand {
        name,
        target,
        args: parts.map(str::to_string).collect(),
    })
}

/// Join first and last name, falling back to the username and then to "User"
pub fn display_name(first_name: &str, last_name: Option<&str>, username: Option<&str>) -> String {
    let mut name = first_name.trim().to_string();
    if let Some(last) = last_name.filter(|l| !l.trim().is_empty()) {
        if !name.is_empty() {
            name.push(' ');
        }
        name.push_str(last.trim());
    }
    if name.is_empty() {
        name = username.unwrap_or_default().to_string();
    }
    if name.is_empty() {
        name = "User".to_string();
    }
    name
}

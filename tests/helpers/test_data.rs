//! Raw Telegram update builders

use serde_json::{json, Value};

pub const BOT_USERNAME: &str = "todo_bot";
pub const GROUP_ID: i64 = -1001234567890;

pub fn tg_user(id: i64, username: &str, first_name: &str) -> Value {
    json!({ "id": id, "is_bot": false, "first_name": first_name, "username": username })
}

pub fn private_message(update_id: i64, message_id: i64, from: Value, text: &str) -> Value {
    let chat_id = from["id"].clone();
    json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "from": from,
            "chat": { "id": chat_id, "type": "private" },
            "date": 1_700_000_000,
            "text": text
        }
    })
}

pub fn group_message(update_id: i64, message_id: i64, chat_id: i64, from: Value, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "from": from,
            "chat": { "id": chat_id, "type": "supergroup", "title": "Team" },
            "date": 1_700_000_000,
            "text": text
        }
    })
}

/// Make `update` a reply to an earlier message
pub fn as_reply(mut update: Value, message_id: i64, text: &str) -> Value {
    update["message"]["reply_to_message"] = json!({ "message_id": message_id, "text": text });
    update
}

pub fn in_thread(mut update: Value, thread_id: i32) -> Value {
    update["message"]["message_thread_id"] = json!(thread_id);
    update
}

/// A private message forwarded from `origin`
pub fn forwarded(update_id: i64, message_id: i64, from: Value, origin: Value, text: &str) -> Value {
    let mut update = private_message(update_id, message_id, from, text);
    update["message"]["forward_date"] = json!(1_699_999_000);
    update["message"]["forward_from"] = origin;
    update
}

/// The bot's own membership in a group changed to `status`
pub fn bot_membership(update_id: i64, chat_id: i64, from: Value, status: &str) -> Value {
    json!({
        "update_id": update_id,
        "my_chat_member": {
            "chat": { "id": chat_id, "type": "supergroup", "title": "Team" },
            "from": from,
            "date": 1_700_000_000,
            "old_chat_member": { "status": "left", "user": { "id": 1, "is_bot": true, "first_name": "Todo" } },
            "new_chat_member": { "status": status, "user": { "id": 1, "is_bot": true, "first_name": "Todo" } }
        }
    })
}

pub fn inline_query(update_id: i64, query_id: &str, from: Value, query: &str) -> Value {
    json!({
        "update_id": update_id,
        "inline_query": { "id": query_id, "from": from, "query": query, "offset": "" }
    })
}

/// A button tap on a message the bot posted in `chat_id`
pub fn callback_query(update_id: i64, query_id: &str, from: Value, chat_id: i64, message_id: i64, data: &str) -> Value {
    json!({
        "update_id": update_id,
        "callback_query": {
            "id": query_id,
            "from": from,
            "chat_instance": "ci-1",
            "message": {
                "message_id": message_id,
                "chat": { "id": chat_id, "type": "supergroup", "title": "Team" },
                "date": 1_700_000_000,
                "text": "card"
            },
            "data": data
        }
    })
}

/// A Notion page as returned by a database query
pub fn notion_page(id: &str, title: &str, status: &str, archived: bool) -> Value {
    json!({
        "object": "page",
        "id": id,
        "url": format!("https://notion.so/{}", id),
        "archived": archived,
        "last_edited_time": "2026-01-01T00:00:00.000Z",
        "properties": {
            "Name": { "type": "title", "title": [{ "plain_text": title }] },
            "Status": { "type": "status", "status": { "name": status } }
        }
    })
}

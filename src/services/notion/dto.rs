use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryDatabaseResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, Property>,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub in_trash: bool,
}

impl Page {
    /// Plain text of a title or rich text property
    pub fn text_property(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(|prop| match prop {
            Property::Title { title } => Some(join_plain_text(title)),
            Property::RichText { rich_text } => Some(join_plain_text(rich_text)),
            _ => None,
        })
    }

    /// Option name of a status or select property
    pub fn status_property(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(|prop| match prop {
            Property::Status { status } => status.as_ref().map(|s| s.name.clone()),
            Property::Select { select } => select.as_ref().map(|s| s.name.clone()),
            _ => None,
        })
    }

    /// Notion user ids of a people property
    pub fn people_property(&self, key: &str) -> Vec<String> {
        match self.properties.get(key) {
            Some(Property::People { people }) => people.iter().map(|p| p.id.clone()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived || self.in_trash
    }
}

fn join_plain_text(parts: &[RichText]) -> String {
    parts.iter().map(|t| t.plain_text.as_str()).collect::<String>()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Property {
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    Select { select: Option<SelectOption> },
    Status { status: Option<SelectOption> },
    People { people: Vec<PartialUser> },
    Date { date: Option<DateValue> },
    Checkbox { checkbox: bool },
    Url { url: Option<String> },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartialUser {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValue {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
    #[serde(default)]
    pub properties: HashMap<String, DatabaseProperty>,
    #[serde(default)]
    pub icon: Option<Icon>,
}

impl Database {
    pub fn name(&self) -> String {
        join_plain_text(&self.title)
    }

    /// Type name of a property, e.g. `status`, `select`, `people`
    pub fn property_type(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|p| p.kind.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseProperty {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Search can return pages and databases; only databases are requested
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Icon {
    Emoji { emoji: String },
    External { external: FileUrl },
    File { file: FileUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileUrl {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorts: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl QueryDatabaseRequest {
    /// Pages edited at or after the given instant
    pub fn edited_since(since: chrono::DateTime<chrono::Utc>, page_size: u32) -> Self {
        Self {
            filter: Some(serde_json::json!({
                "timestamp": "last_edited_time",
                "last_edited_time": { "on_or_after": since.to_rfc3339() }
            })),
            page_size: Some(page_size),
            ..Default::default()
        }
    }
}

/// Page creation in a database
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePageParams {
    pub database_id: String,
    pub title: String,
    pub status: String,
    pub children: Vec<Block>,
}

/// Property changes of an existing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePageParams {
    pub title: Option<String>,
    pub status: Option<String>,
}

pub fn title_property(title: &str) -> serde_json::Value {
    serde_json::json!({ "title": [{ "type": "text", "text": { "content": title } }] })
}

pub fn status_property(name: &str) -> serde_json::Value {
    serde_json::json!({ "status": { "name": name } })
}

impl CreatePageParams {
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                "Name": title_property(&self.title),
                "Status": status_property(&self.status),
            },
            "children": self.children,
        })
    }
}

impl UpdatePageParams {
    pub fn to_body(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        if let Some(title) = &self.title {
            properties.insert("Name".to_string(), title_property(title));
        }
        if let Some(status) = &self.status {
            properties.insert("Status".to_string(), status_property(status));
        }
        serde_json::json!({ "properties": properties })
    }
}

/// Page content blocks written on creation
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph { paragraph: TextBlock },
    #[serde(rename = "heading_3")]
    Heading3 { heading_3: TextBlock },
    Quote { quote: TextBlock },
    Callout { callout: CalloutBlock },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextBlock {
    pub rich_text: Vec<RichTextInput>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalloutBlock {
    pub rich_text: Vec<RichTextInput>,
    pub icon: Icon,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextInput {
    Text { text: TextContent },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextContent {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Link {
    pub url: String,
}

impl RichTextInput {
    pub fn plain(content: impl Into<String>) -> Self {
        RichTextInput::Text { text: TextContent { content: content.into(), link: None } }
    }

    pub fn link(content: impl Into<String>, url: impl Into<String>) -> Self {
        RichTextInput::Text {
            text: TextContent { content: content.into(), link: Some(Link { url: url.into() }) },
        }
    }
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph { paragraph: TextBlock { rich_text: vec![RichTextInput::plain(text)] } }
    }

    pub fn heading_3(text: impl Into<String>) -> Self {
        Block::Heading3 { heading_3: TextBlock { rich_text: vec![RichTextInput::plain(text)] } }
    }

    pub fn quote(text: impl Into<String>) -> Self {
        Block::Quote { quote: TextBlock { rich_text: vec![RichTextInput::plain(text)] } }
    }

    pub fn link_callout(text: impl Into<String>, url: impl Into<String>, emoji: impl Into<String>) -> Self {
        Block::Callout {
            callout: CalloutBlock {
                rich_text: vec![RichTextInput::link(text, url)],
                icon: Icon::Emoji { emoji: emoji.into() },
            },
        }
    }
}

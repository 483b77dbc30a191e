//! Database discovery and schema setup in a user's Notion workspace
//!
//! Used by the binding flow: list the databases the integration can see,
//! check that one has the properties the sync engine writes, and add the
//! ones that are missing.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::dto::{Database, Icon};
use super::NotionAccess;
use crate::utils::errors::{Result, TodoBridgeError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSummary {
    pub id: String,
    pub name: String,
    /// Emoji or image URL
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub created_fields: Vec<String>,
}

struct RequiredField {
    name: &'static str,
    accepted: &'static [&'static str],
    expected: &'static str,
}

const REQUIRED_FIELDS: &[RequiredField] = &[
    RequiredField { name: "Status", accepted: &["status", "select"], expected: "Select/Status" },
    RequiredField { name: "Assignee", accepted: &["people"], expected: "Person" },
    RequiredField { name: "Date", accepted: &["date"], expected: "Date" },
];

fn icon_text(icon: &Icon) -> String {
    match icon {
        Icon::Emoji { emoji } => emoji.clone(),
        Icon::External { external } => external.url.clone(),
        Icon::File { file } => file.url.clone(),
    }
}

fn summarize(raw: &Value) -> Option<DatabaseSummary> {
    if raw.get("object").and_then(Value::as_str) != Some("database") {
        return None;
    }
    let database: Database = serde_json::from_value(raw.clone()).ok()?;
    Some(DatabaseSummary {
        name: database.name(),
        icon: database.icon.as_ref().map(icon_text),
        id: database.id,
    })
}

fn missing_fields(database: &Database) -> Vec<&'static RequiredField> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| {
            !database
                .property_type(field.name)
                .map_or(false, |kind| field.accepted.contains(&kind))
        })
        .collect()
}

fn property_schema(name: &str) -> Value {
    match name {
        "Status" => json!({
            "select": {
                "options": [
                    { "name": "To Do", "color": "red" },
                    { "name": "In Progress", "color": "blue" },
                    { "name": "Done", "color": "green" }
                ]
            }
        }),
        "Assignee" => json!({ "people": {} }),
        _ => json!({ "date": {} }),
    }
}

#[derive(Clone)]
pub struct NotionWorkspace {
    access: NotionAccess,
}

impl NotionWorkspace {
    pub fn new(access: NotionAccess) -> Self {
        Self { access }
    }

    /// Databases shared with the user's integration. A user without a
    /// stored credential simply has none.
    pub async fn list_databases(&self, user_id: Uuid, query: &str) -> Result<Vec<DatabaseSummary>> {
        let client = match self.access.client_for_user(user_id).await {
            Ok(client) => client,
            Err(TodoBridgeError::CredentialNotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let response = client.search(query).await?;
        let databases: Vec<DatabaseSummary> = response.results.iter().filter_map(summarize).collect();
        debug!(user_id = %user_id, count = databases.len(), "Listed Notion databases");
        Ok(databases)
    }

    pub async fn validate_database(&self, user_id: Uuid, database_id: &str) -> Result<ValidationResult> {
        let client = self.access.client_for_user(user_id).await?;
        let database = client.get_database(database_id).await?;

        let missing: Vec<String> = missing_fields(&database)
            .into_iter()
            .map(|field| format!("{} (Expected {})", field.name, field.expected))
            .collect();

        Ok(ValidationResult { valid: missing.is_empty(), missing_fields: missing })
    }

    /// Add every required property the database lacks. A property that
    /// exists under the right name with the wrong type is replaced.
    pub async fn initialize_database(&self, user_id: Uuid, database_id: &str) -> Result<InitResult> {
        let client = self.access.client_for_user(user_id).await?;
        let database = client.get_database(database_id).await?;

        let missing = missing_fields(&database);
        if missing.is_empty() {
            return Ok(InitResult { initialized: true, created_fields: Vec::new() });
        }

        let mut patch = serde_json::Map::new();
        for field in &missing {
            patch.insert(field.name.to_string(), property_schema(field.name));
        }
        client.update_database(database_id, Value::Object(patch)).await?;

        let created_fields: Vec<String> = missing.iter().map(|f| f.name.to_string()).collect();
        info!(
            user_id = %user_id,
            database_id = %database_id,
            created = ?created_fields,
            "Initialized Notion database schema"
        );
        Ok(InitResult { initialized: true, created_fields })
    }
}

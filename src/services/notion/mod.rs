//! Notion API client
//!
//! [`NotionClient`] is the capability the sync engine needs from Notion.
//! Credentials are per user or per group, so clients are minted from a
//! [`NotionClientFactory`] for one access token at a time. All HTTP clients
//! minted by one factory share a connection pool, a rate limiter and a
//! cancellation token.

pub mod dto;
pub mod retry;
pub mod workspace;

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::config::NotionConfig;
use crate::database::UserStore;
use crate::utils::crypto::TokenCipher;
use crate::utils::errors::{Result, TodoBridgeError};

pub use dto::{
    Block, CreatePageParams, Database, Page, QueryDatabaseRequest, QueryDatabaseResponse, SearchResponse,
    UpdatePageParams,
};
pub use retry::{with_retry, RetryPolicy};
pub use workspace::{DatabaseSummary, InitResult, NotionWorkspace, ValidationResult};

#[async_trait]
pub trait NotionClient: Send + Sync {
    async fn create_page(&self, params: &CreatePageParams) -> Result<Page>;
    async fn update_page(&self, page_id: &str, params: &UpdatePageParams) -> Result<Page>;
    async fn query_database(&self, database_id: &str, query: &QueryDatabaseRequest) -> Result<QueryDatabaseResponse>;
    async fn get_database(&self, database_id: &str) -> Result<Database>;
    /// `properties` is the Notion property schema patch
    async fn update_database(&self, database_id: &str, properties: serde_json::Value) -> Result<Database>;
    /// Databases shared with the integration whose title matches `query`
    async fn search(&self, query: &str) -> Result<SearchResponse>;
}

pub trait NotionClientFactory: Send + Sync {
    fn for_token(&self, access_token: &str) -> Arc<dyn NotionClient>;
}

/// Mints [`NotionHttpClient`]s
pub struct HttpNotionClientFactory {
    client: Client,
    config: NotionConfig,
    limiter: Arc<DefaultDirectRateLimiter>,
    cancel: CancellationToken,
}

impl HttpNotionClientFactory {
    pub fn new(config: &NotionConfig, cancel: CancellationToken) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        let per_second = NonZeroU32::new(config.requests_per_second)
            .ok_or_else(|| TodoBridgeError::Config("notion.requests_per_second must be positive".to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
            cancel,
        })
    }
}

impl NotionClientFactory for HttpNotionClientFactory {
    fn for_token(&self, access_token: &str) -> Arc<dyn NotionClient> {
        Arc::new(NotionHttpClient {
            client: self.client.clone(),
            base_url: self.config.api_base_url.trim_end_matches('/').to_string(),
            api_version: self.config.api_version.clone(),
            token: access_token.to_string(),
            limiter: self.limiter.clone(),
            retry: RetryPolicy::from_config(&self.config),
            cancel: self.cancel.clone(),
        })
    }
}

pub struct NotionHttpClient {
    client: Client,
    base_url: String,
    api_version: String,
    token: String,
    limiter: Arc<DefaultDirectRateLimiter>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

/// Extract `message` from a Notion error body, falling back to the raw text
fn notion_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

impl NotionHttpClient {
    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();

        with_retry(self.retry, &self.cancel, move || {
            let method = method.clone();
            async move {
                self.limiter.until_ready().await;
                debug!(method = %method, url = %url, "Notion request");

                let mut request = self
                    .client
                    .request(method, url)
                    .bearer_auth(&self.token)
                    .header("Notion-Version", &self.api_version);
                if let Some(body) = body {
                    request = request.json(body);
                }

                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    return Err(TodoBridgeError::Notion {
                        status: status.as_u16(),
                        message: notion_error_message(&text),
                    });
                }

                Ok(response.json::<T>().await?)
            }
        })
        .await
    }
}

#[async_trait]
impl NotionClient for NotionHttpClient {
    async fn create_page(&self, params: &CreatePageParams) -> Result<Page> {
        self.send(Method::POST, "/pages", Some(&params.to_body())).await
    }

    async fn update_page(&self, page_id: &str, params: &UpdatePageParams) -> Result<Page> {
        self.send(Method::PATCH, &format!("/pages/{}", page_id), Some(&params.to_body())).await
    }

    async fn query_database(&self, database_id: &str, query: &QueryDatabaseRequest) -> Result<QueryDatabaseResponse> {
        let body = serde_json::to_value(query)?;
        self.send(Method::POST, &format!("/databases/{}/query", database_id), Some(&body)).await
    }

    async fn get_database(&self, database_id: &str) -> Result<Database> {
        self.send(Method::GET, &format!("/databases/{}", database_id), None).await
    }

    async fn update_database(&self, database_id: &str, properties: serde_json::Value) -> Result<Database> {
        let body = serde_json::json!({ "properties": properties });
        self.send(Method::PATCH, &format!("/databases/{}", database_id), Some(&body)).await
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let body = serde_json::json!({
            "query": query,
            "filter": { "property": "object", "value": "database" }
        });
        self.send(Method::POST, "/search", Some(&body)).await
    }
}

/// Resolves stored, encrypted credentials into ready clients
#[derive(Clone)]
pub struct NotionAccess {
    users: Arc<dyn UserStore>,
    cipher: Arc<TokenCipher>,
    factory: Arc<dyn NotionClientFactory>,
}

impl NotionAccess {
    pub fn new(users: Arc<dyn UserStore>, cipher: Arc<TokenCipher>, factory: Arc<dyn NotionClientFactory>) -> Self {
        Self { users, cipher, factory }
    }

    /// Client acting with a user's own credential
    pub async fn client_for_user(&self, user_id: Uuid) -> Result<Arc<dyn NotionClient>> {
        let token = self
            .users
            .find_notion_token(user_id)
            .await?
            .ok_or(TodoBridgeError::CredentialNotFound { user_id })?;

        self.client_for_encrypted(&token.access_token_enc)
    }

    /// Client for a credential stored encrypted elsewhere, e.g. on a group
    pub fn client_for_encrypted(&self, encrypted: &str) -> Result<Arc<dyn NotionClient>> {
        let access_token = self.cipher.decrypt(encrypted)?;
        Ok(self.factory.for_token(&access_token))
    }
}

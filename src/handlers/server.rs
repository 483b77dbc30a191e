//! Webhook HTTP server built on axum.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::handlers::webhook::WebhookProcessor;
use crate::utils::errors::{Result, TodoBridgeError};

pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct ServerState {
    pub processor: Arc<WebhookProcessor>,
    /// Expected secret header value; `None` disables the check
    pub secret: Option<String>,
}

pub fn router(webhook_path: &str, state: ServerState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route(webhook_path, post(telegram_webhook))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn telegram_webhook(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    if let Some(expected) = state.secret.as_deref().filter(|s| !s.is_empty()) {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if provided != expected {
            warn!("Rejected webhook call with invalid secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let raw: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Rejected malformed webhook body");
            return StatusCode::BAD_REQUEST;
        }
    };
    debug!(bytes = body.len(), "Webhook update received");

    match state.processor.process(&raw).await {
        Ok(_) => StatusCode::OK,
        Err(TodoBridgeError::Serialization(e)) => {
            warn!(error = %e, "Rejected update without a valid envelope");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            error!(error = %e, "Failed to process webhook update");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// A bound webhook listener. Binding is separate from serving so a busy
/// or invalid address fails startup instead of a background task.
pub struct WebhookServer {
    listener: TcpListener,
    app: Router,
}

impl WebhookServer {
    pub async fn bind(config: &ServerConfig, state: ServerState) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_address).await?;
        info!(
            address = %config.bind_address,
            path = %config.webhook_path,
            "Webhook server listening"
        );
        Ok(Self {
            listener,
            app: router(&config.webhook_path, state),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        info!("Webhook server stopped");
        Ok(())
    }
}

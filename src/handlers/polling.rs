//! Long-polling loop for deployments without a public webhook

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::handlers::webhook::WebhookProcessor;

/// Seconds Telegram holds a `getUpdates` call open
const LONG_POLL_TIMEOUT: u32 = 10;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Offset that acknowledges `raw` and everything before it
fn next_offset(raw: &serde_json::Value, current: i64) -> i64 {
    raw.get("update_id")
        .and_then(serde_json::Value::as_i64)
        .map_or(current, |id| current.max(id + 1))
}

/// Fetch updates and feed them to the processor until `shutdown` is cancelled
pub async fn run_polling(processor: &WebhookProcessor, shutdown: CancellationToken) {
    let chat = processor.context().services.chat.clone();
    let mut offset: i64 = 0;
    info!("Polling for Telegram updates");

    loop {
        let batch = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            batch = chat.get_updates(offset, LONG_POLL_TIMEOUT) => batch,
        };

        let updates = match batch {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, backing off");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => continue,
                }
            }
        };

        for raw in &updates {
            offset = next_offset(raw, offset);
            if let Err(e) = processor.process(raw).await {
                error!(error = %e, "Failed to process polled update");
            }
        }
    }

    info!("Polling stopped");
}

//! Update processing shared by the webhook server and the polling loop

use tracing::{debug, error, info};

use crate::config::BotConfig;
use crate::handlers::{callbacks, inline, membership, messages, HandlerContext};
use crate::models::{Update, UpdatePayload};
use crate::services::ServiceFactory;
use crate::utils::errors::Result;
use crate::utils::logging::log_update_received;

/// What happened to an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Already seen; acknowledged without side effects
    Duplicate,
    Processed,
}

#[derive(Clone)]
pub struct WebhookProcessor {
    ctx: HandlerContext,
}

impl WebhookProcessor {
    pub fn new(services: ServiceFactory, bot: &BotConfig) -> Self {
        Self {
            ctx: HandlerContext::new(services, bot),
        }
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Process one raw update.
    ///
    /// Errors only when the envelope cannot be decoded or the deduplicator
    /// is unavailable; everything after the dedup check is best effort so
    /// Telegram does not redeliver an update that was partly handled.
    pub async fn process(&self, raw: &serde_json::Value) -> Result<ProcessOutcome> {
        let update = Update::decode(raw)?;

        if self.ctx.services.dedup.is_duplicate(update.update_id).await? {
            info!(update_id = update.update_id, "Ignoring duplicate update");
            return Ok(ProcessOutcome::Duplicate);
        }

        log_update_received(update.update_id, update.kind(), update.chat_id());

        if let Err(e) = self.ctx.services.database.updates.save(update.update_id, raw).await {
            error!(update_id = update.update_id, error = %e, "Failed to save raw update");
        }

        match &update.payload {
            UpdatePayload::MembershipChange(change) => {
                membership::handle_membership_change(&self.ctx, change).await;
            }
            UpdatePayload::Message(msg) => {
                messages::handle_message(&self.ctx, msg).await;
            }
            UpdatePayload::InlineQuery(query) => {
                inline::handle_inline_query(&self.ctx, query).await;
            }
            UpdatePayload::CallbackQuery(query) => {
                callbacks::handle_callback_query(&self.ctx, query).await;
            }
            UpdatePayload::Unsupported => {
                debug!(update_id = update.update_id, "Ignoring unsupported update");
            }
        }

        Ok(ProcessOutcome::Processed)
    }
}

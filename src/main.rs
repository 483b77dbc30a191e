//! TodoBridge Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use teloxide::requests::Requester;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use TodoBridge::{
    config::{BotMode, DedupBackend, Settings},
    database::{create_pool, run_migrations, DatabaseService},
    handlers::{run_polling, Command, ServerState, WebhookProcessor, WebhookServer},
    services::{
        Deduplicator, HttpNotionClientFactory, MemoryDeduplicator, RedisDeduplicator, ServiceFactory,
        TelegramChatClient,
    },
    utils::logging,
    TodoBridgeError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load settings")?;
    settings.validate()?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging)?;
    info!("Starting {}...", TodoBridge::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&settings.database).await?;
    run_migrations(&db_pool).await?;
    let database = DatabaseService::new(db_pool);

    // Initialize Telegram client
    let chat = TelegramChatClient::new(&settings.bot)?;
    if let Err(e) = chat.bot().set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    // Initialize update deduplication
    let ttl = Duration::from_secs(settings.dedup.ttl_seconds);
    let dedup: Arc<dyn Deduplicator> = match settings.dedup.backend {
        DedupBackend::Redis => {
            info!("Connecting to Redis...");
            Arc::new(RedisDeduplicator::connect(&settings.redis, ttl).await?)
        }
        DedupBackend::Memory => {
            warn!("Using in-memory update deduplication; not shared across instances");
            Arc::new(MemoryDeduplicator::new(ttl))
        }
    };

    // Initialize services
    info!("Initializing services...");
    let shutdown = CancellationToken::new();
    let notion = Arc::new(HttpNotionClientFactory::new(&settings.notion, shutdown.clone())?);
    let services = ServiceFactory::new(&settings, database, Arc::new(chat.clone()), dedup, notion, shutdown)?;
    let processor = Arc::new(WebhookProcessor::new(services.clone(), &settings.bot));
    let ingress = CancellationToken::new();

    // Bind before anything runs in the background so a bad address stops startup
    let server = match settings.bot.mode {
        BotMode::Webhook => {
            let state = ServerState {
                processor: processor.clone(),
                secret: settings.bot.webhook_secret.clone(),
            };
            Some(WebhookServer::bind(&settings.server, state).await?)
        }
        BotMode::Polling => None,
    };

    services.start_background(&settings)?;

    let mut ingress_task = match server {
        Some(server) => {
            let token = ingress.clone();
            tokio::spawn(async move { server.run(token).await })
        }
        None => {
            if let Err(e) = chat.bot().delete_webhook().await {
                warn!(error = %e, "Failed to remove webhook before polling");
            }
            let processor = processor.clone();
            let token = ingress.clone();
            tokio::spawn(async move {
                run_polling(&processor, token).await;
                Ok::<(), TodoBridgeError>(())
            })
        }
    };

    info!(mode = ?settings.bot.mode, "TodoBridge is ready!");

    let ended_early = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
            None
        }
        ended = &mut ingress_task => {
            error!("Update ingestion stopped unexpectedly");
            Some(ended)
        }
    };
    let ingress_result = match ended_early {
        Some(ended) => ended,
        None => {
            ingress.cancel();
            ingress_task.await
        }
    };
    services.shutdown().await;

    match ingress_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(anyhow::Error::new(e).context("webhook server failed")),
        Err(e) => return Err(anyhow::Error::new(e).context("update ingestion panicked")),
    }

    info!("TodoBridge has been shut down.");
    Ok(())
}

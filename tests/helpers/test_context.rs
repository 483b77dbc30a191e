//! A fully wired service graph over in-memory fakes

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use TodoBridge::config::Settings;
use TodoBridge::models::User;
use TodoBridge::services::{MemoryDeduplicator, ServiceFactory};
use TodoBridge::utils::crypto::TokenCipher;
use TodoBridge::WebhookProcessor;

use super::fakes::{FakeNotion, MemoryDb, RecordingChatClient};
use super::test_data::BOT_USERNAME;

pub const ENCRYPTION_KEY: &str = "integration-test-encryption-key";
pub const NOTION_TOKEN: &str = "secret_notion_token";

pub struct TestContext {
    pub db: MemoryDb,
    pub chat: Arc<RecordingChatClient>,
    pub notion: FakeNotion,
    pub cipher: TokenCipher,
    pub settings: Settings,
    pub services: ServiceFactory,
    pub processor: WebhookProcessor,
    pub shutdown: CancellationToken,
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.bot.token = "123456:TEST".to_string();
    settings.bot.username = BOT_USERNAME.to_string();
    settings.bot.web_app_url = Some("https://app.example.com/".to_string());
    settings.encryption.key = ENCRYPTION_KEY.to_string();
    settings.sync.workers = 2;
    settings.sync.queue_capacity = 16;
    settings.poller.enabled = false;
    settings.scheduler.reminders_enabled = false;
    settings.scheduler.digest_enabled = false;
    settings
}

impl TestContext {
    /// Must be called inside a tokio runtime
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let db = MemoryDb::new();
        let chat = Arc::new(RecordingChatClient::default());
        let notion = FakeNotion::new();
        let shutdown = CancellationToken::new();

        let services = ServiceFactory::new(
            &settings,
            db.database_service(),
            chat.clone(),
            Arc::new(MemoryDeduplicator::new(Duration::from_secs(60))),
            Arc::new(notion.clone()),
            shutdown.clone(),
        )
        .expect("services wire up");
        let processor = WebhookProcessor::new(services.clone(), &settings.bot);

        Self {
            db,
            chat,
            notion,
            cipher: TokenCipher::new(ENCRYPTION_KEY),
            settings,
            services,
            processor,
            shutdown,
        }
    }

    pub fn encrypted_token(&self) -> String {
        self.cipher.encrypt(NOTION_TOKEN).expect("token encrypts")
    }

    /// A user who has connected Notion, optionally with a default database
    pub fn connected_user(&self, tg_id: i64, username: &str, name: &str, default_database: Option<&str>) -> User {
        let user = self.db.insert_user(tg_id, Some(username), name);
        self.db.connect_notion(user.id, &self.encrypted_token(), default_database);
        self.db.user_by_tg(tg_id).expect("user stored")
    }

    /// Process updates in order, failing the test on any error
    pub async fn process_all(&self, updates: &[serde_json::Value]) {
        for raw in updates {
            self.processor.process(raw).await.expect("update processed");
        }
    }

    /// Wait until every queued sync job has run
    pub async fn drain_sync(&self) {
        self.services.sync_queue.shutdown().await;
    }

    pub fn only_task_id(&self) -> Uuid {
        let tasks = self.db.all_tasks();
        assert_eq!(tasks.len(), 1, "expected exactly one task");
        tasks[0].id
    }
}

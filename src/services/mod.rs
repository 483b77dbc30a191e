//! Services module
//!
//! This module contains the business logic: task creation, Notion sync in
//! both directions, notifications and the background loops.

pub mod dedup;
pub mod group;
pub mod notification;
pub mod notion;
pub mod poller;
pub mod scheduler;
pub mod sync;
pub mod sync_queue;
pub mod task;
pub mod task_creator;
pub mod telegram;
pub mod user;

// Re-export commonly used services
pub use dedup::{Deduplicator, MemoryDeduplicator, RedisDeduplicator};
pub use group::GroupService;
pub use notification::{Actor, NotificationEvent, NotificationService};
pub use notion::{HttpNotionClientFactory, NotionAccess, NotionClient, NotionClientFactory, NotionWorkspace};
pub use poller::{PollSummary, Poller};
pub use scheduler::Scheduler;
pub use sync::{InboundOutcome, InboundPage, SyncService};
pub use sync_queue::{QueueStats, SyncJob, SyncQueue};
pub use task::TaskService;
pub use task_creator::{CreateTaskInput, TaskCreator};
pub use telegram::{ChatClient, OutgoingMessage, TelegramChatClient};
pub use user::UserService;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::crypto::TokenCipher;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub database: DatabaseService,
    pub chat: Arc<dyn ChatClient>,
    pub dedup: Arc<dyn Deduplicator>,
    pub notifier: NotificationService,
    pub users: UserService,
    pub groups: GroupService,
    pub tasks: TaskService,
    pub sync: SyncService,
    pub sync_queue: Arc<SyncQueue>,
    pub task_creator: Arc<TaskCreator>,
    pub workspace: NotionWorkspace,
    pub poller: Arc<Poller>,
    pub scheduler: Arc<Scheduler>,
    shutdown: CancellationToken,
}

impl ServiceFactory {
    /// Wire every service. Must run inside a tokio runtime because the
    /// sync worker pool starts immediately.
    pub fn new(
        settings: &Settings,
        database: DatabaseService,
        chat: Arc<dyn ChatClient>,
        dedup: Arc<dyn Deduplicator>,
        notion: Arc<dyn NotionClientFactory>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let cipher = Arc::new(TokenCipher::new(&settings.encryption.key));
        let access = NotionAccess::new(database.users.clone(), cipher, notion);

        let notifier = NotificationService::new(chat.clone(), database.users.clone(), settings.bot.username.clone());
        let users = UserService::new(database.users.clone(), database.tasks.clone(), database.pending.clone());
        let groups = GroupService::new(database.groups.clone(), users.clone());
        let tasks = TaskService::new(database.tasks.clone(), database.users.clone(), notifier.clone());
        let sync = SyncService::new(database.tasks.clone(), access.clone(), notifier.clone());

        let sync_queue = Arc::new(SyncQueue::from_config(Arc::new(sync.clone()), &settings.sync));
        let task_creator = Arc::new(TaskCreator::new(
            database.tasks.clone(),
            database.users.clone(),
            database.groups.clone(),
            database.updates.clone(),
            database.pending.clone(),
            sync_queue.clone(),
            notifier.clone(),
        ));

        let workspace = NotionWorkspace::new(access.clone());
        let poller = Arc::new(Poller::new(
            database.groups.clone(),
            access,
            sync.clone(),
            settings.poller.clone(),
            shutdown.clone(),
        ));
        let scheduler = Arc::new(Scheduler::new(
            database.tasks.clone(),
            database.users.clone(),
            chat.clone(),
            notifier.clone(),
            settings.scheduler.clone(),
            shutdown.clone(),
        ));

        Ok(Self {
            database,
            chat,
            dedup,
            notifier,
            users,
            groups,
            tasks,
            sync,
            sync_queue,
            task_creator,
            workspace,
            poller,
            scheduler,
            shutdown,
        })
    }

    /// Start the background loops enabled in the settings
    pub fn start_background(&self, settings: &Settings) -> Result<()> {
        if settings.poller.enabled {
            self.poller.start()?;
        }
        if settings.scheduler.reminders_enabled || settings.scheduler.digest_enabled {
            self.scheduler.start()?;
        }
        Ok(())
    }

    /// Stop the loops and drain the sync queue
    pub async fn shutdown(&self) {
        self.poller.stop().await;
        self.scheduler.stop().await;
        self.sync_queue.shutdown().await;
        self.shutdown.cancel();
        info!("Services shut down");
    }
}

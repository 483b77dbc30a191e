//! Reconciliation poller
//!
//! Notion has no push channel for database changes, so bound databases are
//! polled: every cycle asks each one for the pages edited within a short
//! lookback window and feeds them through the inbound upsert.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PollerConfig;
use crate::database::GroupStore;
use crate::models::{Group, TaskStatus};
use crate::services::notion::{NotionAccess, Page, QueryDatabaseRequest};
use crate::services::sync::{InboundPage, SyncService};
use crate::utils::errors::{Result, TodoBridgeError};

/// Counters of one polling cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub groups: usize,
    pub pages: usize,
    pub failures: usize,
}

/// Inbound view of a page; `None` when the page has no title
pub fn inbound_from_page(page: &Page, database_id: &str) -> Option<InboundPage> {
    let title = page.text_property("Name").filter(|t| !t.trim().is_empty())?;
    let status = page
        .status_property("Status")
        .map(|name| TaskStatus::from_notion_name(&name))
        .unwrap_or(TaskStatus::ToDo);

    Some(InboundPage {
        page_id: page.id.clone(),
        database_id: database_id.to_string(),
        title,
        status,
        url: page.url.clone(),
        archived: page.is_archived(),
        assignees: page.people_property("Assignee"),
    })
}

struct PollerInner {
    groups: Arc<dyn GroupStore>,
    access: NotionAccess,
    sync: SyncService,
    config: PollerConfig,
}

impl PollerInner {
    async fn poll_once(&self) -> PollSummary {
        let mut summary = PollSummary::default();

        let groups = match self.groups.list_active_bindings().await {
            Ok(groups) => groups,
            Err(e) => {
                error!(error = %e, "Poller failed to list bound groups");
                summary.failures += 1;
                return summary;
            }
        };

        for group in groups.iter().filter(|g| g.has_active_binding()) {
            summary.groups += 1;
            if let Err(e) = self.poll_group(group, &mut summary).await {
                summary.failures += 1;
                error!(group_id = group.id, error = %e, "Poller failed to poll database");
            }
        }

        debug!(
            groups = summary.groups,
            pages = summary.pages,
            failures = summary.failures,
            "Polling cycle finished"
        );
        summary
    }

    async fn poll_group(&self, group: &Group, summary: &mut PollSummary) -> Result<()> {
        let database_id = group.database_id.as_deref().unwrap_or_default();
        let client = self.access.client_for_encrypted(&group.notion_access_token)?;

        let since = Utc::now() - chrono::Duration::seconds(self.config.lookback_seconds);
        let query = QueryDatabaseRequest::edited_since(since, self.config.page_size);
        let response = client.query_database(database_id, &query).await?;

        for page in &response.results {
            let Some(inbound) = inbound_from_page(page, database_id) else {
                debug!(page_id = %page.id, "Skipping page without title");
                continue;
            };
            summary.pages += 1;
            if let Err(e) = self.sync.sync_task_from_notion(inbound).await {
                summary.failures += 1;
                warn!(page_id = %page.id, error = %e, "Failed to reconcile page");
            }
        }
        Ok(())
    }
}

pub struct Poller {
    inner: Arc<PollerInner>,
    shutdown: CancellationToken,
    running: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Poller {
    pub fn new(
        groups: Arc<dyn GroupStore>,
        access: NotionAccess,
        sync: SyncService,
        config: PollerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner { groups, access, sync, config }),
            shutdown,
            running: Mutex::new(None),
        }
    }

    /// Start the polling loop; the first cycle runs immediately
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            return Err(TodoBridgeError::AlreadyRunning("poller"));
        }

        let token = self.shutdown.child_token();
        let inner = self.inner.clone();
        let interval = Duration::from_secs(inner.config.interval_seconds.max(1));
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        inner.poll_once().await;
                    }
                }
            }
            info!("Notion poller stopped");
        });

        info!(interval_secs = interval.as_secs(), "Notion poller started");
        *running = Some((token, handle));
        Ok(())
    }

    /// Stop the loop; an in-flight cycle finishes first
    pub async fn stop(&self) {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some((token, handle)) = running {
            token.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Poller task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Run a single cycle now
    pub async fn poll_once(&self) -> PollSummary {
        self.inner.poll_once().await
    }
}

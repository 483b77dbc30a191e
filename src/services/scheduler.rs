//! Due-date reminders and the daily digest

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::database::{TaskStore, UserStore};
use crate::models::{Task, TaskStatus};
use crate::services::notification::{NotificationEvent, NotificationService};
use crate::services::telegram::{ChatClient, OutgoingMessage};
use crate::utils::errors::{Result, TodoBridgeError};
use crate::utils::helpers::escape_html;

const DIGEST_LIMIT: usize = 10;
/// Tasks fetched per user for the digest
const DIGEST_FETCH: i64 = 100;

/// Which reminders a task is due for at `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReminderCheck {
    pub remind_1h: bool,
    pub remind_due: bool,
}

impl ReminderCheck {
    pub fn evaluate(task: &Task, now: DateTime<Utc>) -> Self {
        let Some(due_at) = task.due_at else {
            return Self::default();
        };
        if task.status == TaskStatus::Done || task.deleted_at.is_some() {
            return Self::default();
        }
        Self {
            remind_1h: !task.reminder_1h_sent && due_at < now + chrono::Duration::hours(1),
            remind_due: !task.reminder_due_sent && due_at < now,
        }
    }

    pub fn any(&self) -> bool {
        self.remind_1h || self.remind_due
    }

    /// The due reminder supersedes the one-hour warning
    pub fn event(&self) -> Option<NotificationEvent> {
        if self.remind_due {
            Some(NotificationEvent::ReminderDue)
        } else if self.remind_1h {
            Some(NotificationEvent::Reminder1h)
        } else {
            None
        }
    }
}

/// Digest text for a user's open tasks; `None` when there are none
pub fn format_digest(tasks: &[Task], total: usize) -> Option<String> {
    if tasks.is_empty() || total == 0 {
        return None;
    }

    let mut out = format!("📅 <b>Daily digest</b>\n\nYou have {} open task(s):\n", total);
    for (i, task) in tasks.iter().take(DIGEST_LIMIT).enumerate() {
        let icon = if task.status == TaskStatus::InProgress { "🔄" } else { "⬜" };
        out.push_str(&format!("\n{}. {} {}", i + 1, icon, escape_html(&task.title)));
    }
    if total > DIGEST_LIMIT {
        out.push_str(&format!("\n\n…and {} more", total - DIGEST_LIMIT));
    }
    out.push_str("\n\n💪 Send /todo to add a new task.");
    Some(out)
}

struct SchedulerInner {
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
    chat: Arc<dyn ChatClient>,
    notifier: NotificationService,
    config: SchedulerConfig,
}

impl SchedulerInner {
    async fn check_reminders(&self, now: DateTime<Utc>) -> usize {
        let tasks = match self.tasks.list_for_reminders(now).await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "Failed to list tasks for reminders");
                return 0;
            }
        };

        let mut reminded = 0;
        for task in &tasks {
            let check = ReminderCheck::evaluate(task, now);
            let Some(event) = check.event() else {
                continue;
            };

            self.notifier.notify_reminder(event, task).await;
            reminded += 1;

            let h1 = task.reminder_1h_sent || check.remind_1h;
            let due = task.reminder_due_sent || check.remind_due;
            if let Err(e) = self.tasks.update_reminder_flags(task.id, h1, due).await {
                error!(task_id = %task.id, error = %e, "Failed to update reminder flags");
            }
        }
        reminded
    }

    async fn send_daily_digest(&self) -> usize {
        let users = match self.users.list_all().await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "Failed to list users for digest");
                return 0;
            }
        };

        let mut sent = 0;
        for user in users.iter().filter(|u| u.tg_id != 0) {
            let (tasks, total) = match self.tasks.list_open_for_user(user.id, DIGEST_FETCH).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "Failed to list tasks for digest");
                    continue;
                }
            };
            let Some(text) = format_digest(&tasks, total.max(0) as usize) else {
                continue;
            };
            match self.chat.send_message(OutgoingMessage::new(user.tg_id, text)).await {
                Ok(()) => sent += 1,
                Err(e) => error!(chat_id = user.tg_id, error = %e, "Failed to send digest"),
            }
        }
        info!(sent = sent, "Daily digest sent");
        sent
    }
}

pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    shutdown: CancellationToken,
    running: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Scheduler {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        users: Arc<dyn UserStore>,
        chat: Arc<dyn ChatClient>,
        notifier: NotificationService,
        config: SchedulerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner { tasks, users, chat, notifier, config }),
            shutdown,
            running: Mutex::new(None),
        }
    }

    /// Check reminders every minute and send the digest once a day at
    /// the configured UTC hour
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            return Err(TodoBridgeError::AlreadyRunning("scheduler"));
        }

        let token = self.shutdown.child_token();
        let loop_token = token.clone();
        let inner = self.inner.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_digest: Option<NaiveDate> = None;

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        if inner.config.reminders_enabled {
                            let reminded = inner.check_reminders(now).await;
                            debug!(reminded = reminded, "Reminder check finished");
                        }
                        let today = now.date_naive();
                        if inner.config.digest_enabled
                            && now.hour() == inner.config.digest_hour
                            && last_digest != Some(today)
                        {
                            last_digest = Some(today);
                            inner.send_daily_digest().await;
                        }
                    }
                }
            }
            info!("Scheduler stopped");
        });

        info!(
            reminders = self.inner.config.reminders_enabled,
            digest = self.inner.config.digest_enabled,
            digest_hour = self.inner.config.digest_hour,
            "Scheduler started"
        );
        *running = Some((token, handle));
        Ok(())
    }

    pub async fn stop(&self) {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some((token, handle)) = running {
            token.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduler task ended abnormally");
            }
        }
    }

    /// Send due reminders as of `now`; returns the number of tasks reminded
    pub async fn check_reminders(&self, now: DateTime<Utc>) -> usize {
        self.inner.check_reminders(now).await
    }

    /// Returns the number of digests delivered
    pub async fn send_daily_digest(&self) -> usize {
        self.inner.send_daily_digest().await
    }
}

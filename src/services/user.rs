//! User service implementation
//!
//! Registers Telegram users on first contact, keeps their profile in step
//! with Telegram, and hands over tasks that were assigned to their
//! username before they ever talked to the bot.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::database::{PendingAssignmentStore, TaskStore, UserStore};
use crate::models::{CreateUserRequest, User};
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    tasks: Arc<dyn TaskStore>,
    pending: Arc<dyn PendingAssignmentStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, tasks: Arc<dyn TaskStore>, pending: Arc<dyn PendingAssignmentStore>) -> Self {
        Self { users, tasks, pending }
    }

    /// Register a new user or get the existing one, refreshing name and
    /// username when they changed on Telegram
    pub async fn ensure_user(&self, profile: CreateUserRequest) -> Result<User> {
        let user = match self.users.find_by_tg_id(profile.tg_id).await? {
            Some(existing) => {
                if existing.name != profile.name || existing.tg_username != profile.tg_username {
                    debug!(user_id = %existing.id, "Refreshing user profile");
                    self.users
                        .update_profile(existing.id, &profile.name, profile.tg_username.as_deref())
                        .await?
                } else {
                    existing
                }
            }
            None => {
                let user = self.users.create(profile).await?;
                info!(user_id = %user.id, tg_id = user.tg_id, "New user registered");
                user
            }
        };

        if let Err(e) = self.claim_pending_assignments(&user).await {
            warn!(user_id = %user.id, error = %e, "Failed to claim pending assignments");
        }
        Ok(user)
    }

    /// Turn assignments made to this user's username into real ones.
    /// Returns the number of tasks claimed.
    pub async fn claim_pending_assignments(&self, user: &User) -> Result<usize> {
        let Some(username) = user.tg_username.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(0);
        };

        let pending = self.pending.list_by_username(username).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        for assignment in &pending {
            self.tasks.add_assignee(assignment.task_id, user.id, None).await?;
        }
        self.pending.delete_by_username(username).await?;

        info!(user_id = %user.id, username = %username, count = pending.len(), "Claimed pending assignments");
        Ok(pending.len())
    }
}

//! Group lifecycle: the bot joining, leaving and being bound to Notion

use std::sync::Arc;

use tracing::info;

use crate::database::GroupStore;
use crate::models::{CreateUserRequest, Group, GroupRole, GroupStatus};
use crate::services::user::UserService;
use crate::utils::errors::{Result, TodoBridgeError};
use crate::utils::logging::log_group_event;

#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupStore>,
    users: UserService,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupStore>, users: UserService) -> Self {
        Self { groups, users }
    }

    /// Register a group the bot was added to. An inactive group becomes
    /// unbound again while a bound one keeps its binding; the person who
    /// added the bot becomes an admin member.
    pub async fn ensure_group(&self, chat_id: i64, title: &str, added_by: Option<CreateUserRequest>) -> Result<Group> {
        let status = match self.groups.find(chat_id).await? {
            Some(group) if group.status != GroupStatus::Inactive => group.status,
            _ => GroupStatus::Unbound,
        };
        let group = self.groups.upsert(chat_id, title, status).await?;

        let added_by_tg_id = added_by.as_ref().map(|p| p.tg_id);
        if let Some(profile) = added_by {
            let user = self.users.ensure_user(profile).await?;
            self.groups.add_member(user.id, chat_id, GroupRole::Admin).await?;
        }

        log_group_event(chat_id, "ensured", added_by_tg_id, Some(title));
        Ok(group)
    }

    pub async fn update_status(&self, chat_id: i64, status: GroupStatus) -> Result<()> {
        if !self.groups.set_status(chat_id, status).await? {
            return Err(TodoBridgeError::GroupNotFound { group_id: chat_id });
        }
        info!(group_id = chat_id, status = ?status, "Group status updated");
        Ok(())
    }
}

//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod task;
pub mod user;
pub mod group;
pub mod pending_assignment;
pub mod telegram_update;

// Re-export commonly used models
pub use task::{
    ContextRole, NewSnapshot, NewTask, SyncStatus, Task, TaskAssignee, TaskChanges, TaskComment,
    TaskContextSnapshot, TaskStatus,
};
pub use user::{CreateUserRequest, User, UserNotionToken};
pub use group::{Group, GroupRole, GroupStatus, UserGroup};
pub use pending_assignment::PendingAssignment;
pub use telegram_update::{
    CallbackMessage, CallbackQuery, ChatMember, ChatMemberUpdate, ForwardSource, IncomingMessage, InlineQuery,
    RepliedMessage, TelegramUpdate, TgChat, TgUser, Update, UpdatePayload,
};

//! Database service layer
//!
//! Bundles every store behind its trait so services receive exactly the
//! capabilities they need and tests can swap in fakes.

use std::sync::Arc;

use crate::database::{
    DatabasePool, GroupRepository, GroupStore, PendingAssignmentRepository, PendingAssignmentStore, TaskRepository,
    TaskStore, UpdateRepository, UpdateStore, UserRepository, UserStore,
};

#[derive(Clone)]
pub struct DatabaseService {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
    pub groups: Arc<dyn GroupStore>,
    pub updates: Arc<dyn UpdateStore>,
    pub pending: Arc<dyn PendingAssignmentStore>,
}

impl DatabaseService {
    /// Postgres-backed stores sharing one pool
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            tasks: Arc::new(TaskRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            groups: Arc::new(GroupRepository::new(pool.clone())),
            updates: Arc::new(UpdateRepository::new(pool.clone())),
            pending: Arc::new(PendingAssignmentRepository::new(pool)),
        }
    }
}

//! Webhook update deduplication
//!
//! Telegram redelivers an update until it is acknowledged. Every update id is
//! recorded once with a TTL; the check and the record happen in one atomic
//! step so concurrent deliveries of the same id cannot both pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::config::RedisConfig;
use crate::utils::errors::Result;

#[async_trait]
pub trait Deduplicator: Send + Sync {
    /// Returns true when the update id was already seen
    async fn is_duplicate(&self, update_id: i64) -> Result<bool>;
}

/// Redis-backed deduplicator using `SET NX EX`
#[derive(Clone)]
pub struct RedisDeduplicator {
    conn: ConnectionManager,
    prefix: String,
    ttl: Duration,
}

impl RedisDeduplicator {
    pub async fn connect(config: &RedisConfig, ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            prefix: config.prefix.clone(),
            ttl,
        })
    }

    fn key(&self, update_id: i64) -> String {
        format!("{}telegram:update:{}", self.prefix, update_id)
    }
}

#[async_trait]
impl Deduplicator for RedisDeduplicator {
    async fn is_duplicate(&self, update_id: i64) -> Result<bool> {
        let key = self.key(update_id);
        let mut conn = self.conn.clone();

        let stored: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        let duplicate = stored.is_none();
        debug!(key = %key, duplicate = duplicate, "Update deduplication check");
        Ok(duplicate)
    }
}

/// In-process deduplicator for polling mode and tests
#[derive(Clone)]
pub struct MemoryDeduplicator {
    seen: Arc<Mutex<HashMap<i64, Instant>>>,
    ttl: Duration,
}

impl MemoryDeduplicator {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }
}

#[async_trait]
impl Deduplicator for MemoryDeduplicator {
    async fn is_duplicate(&self, update_id: i64) -> Result<bool> {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());

        seen.retain(|_, recorded| now.duration_since(*recorded) < self.ttl);

        if seen.contains_key(&update_id) {
            return Ok(true);
        }
        seen.insert(update_id, now);
        Ok(false)
    }
}

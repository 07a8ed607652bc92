//! # Queue Store
//!
//! External key/value + sorted-set service holding matchmaking queue entries
//! and the auth-token blocklist (`spec.md` §3, §4.1, §6). The trait lets the
//! matchmaker and auth middleware be tested without a live Redis instance,
//! the same way [`crate::services::judge::JudgeClient`] is mocked for tests.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::models::QueueEntry;

#[derive(Debug, Error)]
pub enum QueueStoreError {
    #[error("queue store backend error: {0}")]
    Backend(#[from] redis::RedisError),
    #[error("failed to (de)serialize queue entry: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Sorted-set queue plus blocklist, as described in `spec.md` §3/§6.
///
/// Implementations must keep the sorted-set entry and the `queue:user:<id>`
/// uniqueness marker paired: both created, both removed (invariant 8).
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Inserts `entry` if its user is not already queued. Returns `false`
    /// (no-op) if the uniqueness marker already exists.
    async fn enqueue(&self, entry: &QueueEntry, ttl: Duration) -> Result<bool, QueueStoreError>;

    /// Removes a user's queue entry and marker. Returns `false` if absent.
    async fn cancel(&self, user_id: Uuid) -> Result<bool, QueueStoreError>;

    /// Whether a user currently holds a uniqueness marker.
    async fn is_queued(&self, user_id: Uuid) -> Result<bool, QueueStoreError>;

    /// Full queue contents in ascending `enqueued_at` order, for a tick.
    async fn snapshot(&self) -> Result<Vec<QueueEntry>, QueueStoreError>;

    /// Removes a set of users from the queue and their markers together,
    /// as a pair-formation tick does once pairs are chosen.
    async fn remove_many(&self, user_ids: &[Uuid]) -> Result<(), QueueStoreError>;

    /// Blocklists a token identifier for `ttl` (its own remaining lifetime).
    async fn block_jti(&self, jti: &str, ttl: Duration) -> Result<(), QueueStoreError>;

    /// Whether a token identifier has been blocklisted.
    async fn is_blocked(&self, jti: &str) -> Result<bool, QueueStoreError>;
}

const QUEUE_KEY: &str = "queue:entries";
fn user_marker_key(user_id: Uuid) -> String {
    format!("queue:user:{user_id}")
}
fn blocklist_key(jti: &str) -> String {
    format!("jti:{jti}")
}

/// Redis-backed implementation using a sorted set (score = epoch seconds)
/// keyed alongside a per-user TTL'd uniqueness marker (`spec.md` §4.1).
pub struct RedisQueueStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisQueueStore {
    pub async fn connect(redis_url: &str) -> Result<Self, QueueStoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    #[instrument(skip(self, entry), fields(user_id = %entry.user_id))]
    async fn enqueue(&self, entry: &QueueEntry, ttl: Duration) -> Result<bool, QueueStoreError> {
        let mut conn = self.conn.clone();
        let marker = user_marker_key(entry.user_id);

        let set: bool = conn
            .set_options(
                &marker,
                entry.user_id.to_string(),
                redis::SetOptions::default()
                    .with_expiration(redis::SetExpiry::EX(ttl.as_secs()))
                    .conditional_set(redis::ExistenceCheck::NX),
            )
            .await?;

        if !set {
            debug!("enqueue no-op: user already holds a queue marker");
            return Ok(false);
        }

        let payload = serde_json::to_string(entry)?;
        let score = entry.enqueued_at.unix_timestamp() as f64;
        let _: () = conn.zadd(QUEUE_KEY, payload, score).await?;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn cancel(&self, user_id: Uuid) -> Result<bool, QueueStoreError> {
        let mut conn = self.conn.clone();
        let marker = user_marker_key(user_id);

        let removed: i64 = conn.del(&marker).await?;

        let entries: Vec<String> = conn.zrange(QUEUE_KEY, 0, -1).await?;
        for raw in entries {
            if let Ok(entry) = serde_json::from_str::<QueueEntry>(&raw) {
                if entry.user_id == user_id {
                    let _: () = conn.zrem(QUEUE_KEY, raw).await?;
                }
            }
        }

        Ok(removed > 0)
    }

    async fn is_queued(&self, user_id: Uuid) -> Result<bool, QueueStoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(user_marker_key(user_id)).await?;
        Ok(exists)
    }

    async fn snapshot(&self) -> Result<Vec<QueueEntry>, QueueStoreError> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.zrange(QUEUE_KEY, 0, -1).await?;
        let mut entries = Vec::with_capacity(raw.len());
        for item in raw {
            match serde_json::from_str::<QueueEntry>(&item) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(error = %e, "dropping unparseable queue entry"),
            }
        }
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn remove_many(&self, user_ids: &[Uuid]) -> Result<(), QueueStoreError> {
        for &user_id in user_ids {
            self.cancel(user_id).await?;
        }
        Ok(())
    }

    async fn block_jti(&self, jti: &str, ttl: Duration) -> Result<(), QueueStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(blocklist_key(jti), "1", ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn is_blocked(&self, jti: &str) -> Result<bool, QueueStoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(blocklist_key(jti)).await?;
        Ok(exists)
    }
}

/// In-memory fake used by tests in place of a live Redis instance, the way
/// [`crate::services::judge::LogJudgeClient`] stands in for a real judge.
#[derive(Default)]
pub struct InMemoryQueueStore {
    inner: tokio::sync::Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    entries: BTreeMap<Uuid, QueueEntry>,
    blocklist: std::collections::HashSet<String>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(&self, entry: &QueueEntry, _ttl: Duration) -> Result<bool, QueueStoreError> {
        let mut state = self.inner.lock().await;
        if state.entries.contains_key(&entry.user_id) {
            return Ok(false);
        }
        state.entries.insert(entry.user_id, entry.clone());
        Ok(true)
    }

    async fn cancel(&self, user_id: Uuid) -> Result<bool, QueueStoreError> {
        let mut state = self.inner.lock().await;
        Ok(state.entries.remove(&user_id).is_some())
    }

    async fn is_queued(&self, user_id: Uuid) -> Result<bool, QueueStoreError> {
        let state = self.inner.lock().await;
        Ok(state.entries.contains_key(&user_id))
    }

    async fn snapshot(&self) -> Result<Vec<QueueEntry>, QueueStoreError> {
        let state = self.inner.lock().await;
        let mut entries: Vec<_> = state.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.enqueued_at);
        Ok(entries)
    }

    async fn remove_many(&self, user_ids: &[Uuid]) -> Result<(), QueueStoreError> {
        let mut state = self.inner.lock().await;
        for id in user_ids {
            state.entries.remove(id);
        }
        Ok(())
    }

    async fn block_jti(&self, jti: &str, _ttl: Duration) -> Result<(), QueueStoreError> {
        let mut state = self.inner.lock().await;
        state.blocklist.insert(jti.to_string());
        Ok(())
    }

    async fn is_blocked(&self, jti: &str) -> Result<bool, QueueStoreError> {
        let state = self.inner.lock().await;
        Ok(state.blocklist.contains(jti))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn entry(user_id: Uuid, rating: i32) -> QueueEntry {
        QueueEntry {
            user_id,
            rating,
            enqueued_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_per_user() {
        let store = InMemoryQueueStore::new();
        let user = Uuid::new_v4();
        assert!(store.enqueue(&entry(user, 1000), Duration::from_secs(60)).await.unwrap());
        assert!(!store.enqueue(&entry(user, 1000), Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_removes_marker_and_entry() {
        let store = InMemoryQueueStore::new();
        let user = Uuid::new_v4();
        store.enqueue(&entry(user, 1000), Duration::from_secs(60)).await.unwrap();
        assert!(store.cancel(user).await.unwrap());
        assert!(!store.is_queued(user).await.unwrap());
        assert!(!store.cancel(user).await.unwrap());
    }

    #[tokio::test]
    async fn blocklist_roundtrips() {
        let store = InMemoryQueueStore::new();
        assert!(!store.is_blocked("abc").await.unwrap());
        store.block_jti("abc", Duration::from_secs(1)).await.unwrap();
        assert!(store.is_blocked("abc").await.unwrap());
    }
}

//! # Queue entry
//!
//! The wire shape stored in the Queue Store's sorted set (`spec.md` §3,
//! §9 — "a fresh consumer can parse its own writes" is the only contract).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: Uuid,
    pub rating: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub enqueued_at: OffsetDateTime,
}

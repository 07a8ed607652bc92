//! # User
//!
//! The only user attribute the matchmaking core mutates is `rating`;
//! identity, credentials, and display fields are owned by an external
//! auth collaborator and only read here.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Rating assigned to a user who has never completed a match.
pub const DEFAULT_RATING: i32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub rating: i32,
    pub created_at: OffsetDateTime,
}

//! # Match
//!
//! The `Match` row and its status enum. `player1_id`/`player2_id` ordering
//! is fixed at creation time (`spec.md` §3) and every per-side column
//! (`player1_accepted`, `player1_old_rating`, ...) is indexed against it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle states of a match (`spec.md` §4.2). Corresponds to the
/// Postgres `match_status` enum defined in `migrations/0001_init.sql`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "match_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Created,
    Pending,
    Active,
    Completed,
    Declined,
    Cancelled,
}

impl MatchStatus {
    /// Terminal statuses always carry an `end_time` (`spec.md` §3 invariant 5).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::Completed | MatchStatus::Declined | MatchStatus::Cancelled
        )
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchStatus::Created => "created",
            MatchStatus::Pending => "pending",
            MatchStatus::Active => "active",
            MatchStatus::Completed => "completed",
            MatchStatus::Declined => "declined",
            MatchStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: Uuid,
    pub problem_id: Option<i64>,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    pub status: MatchStatus,
    pub player1_accepted: bool,
    pub player2_accepted: bool,
    pub player1_old_rating: Option<i32>,
    pub player2_old_rating: Option<i32>,
    pub player1_new_rating: Option<i32>,
    pub player2_new_rating: Option<i32>,
    pub winner_id: Option<Uuid>,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
}

impl Match {
    /// Returns the side (1 or 2) of `user_id`, or `None` if they are not a
    /// participant (`spec.md` §4.2, "not-a-participant" error signal).
    pub fn side_of(&self, user_id: Uuid) -> Option<u8> {
        if user_id == self.player1_id {
            Some(1)
        } else if user_id == self.player2_id {
            Some(2)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, user_id: Uuid) -> Option<Uuid> {
        match self.side_of(user_id)? {
            1 => Some(self.player2_id),
            _ => Some(self.player1_id),
        }
    }
}

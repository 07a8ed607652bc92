//! # Notification Broker
//!
//! Converts match-lifecycle events into typed messages and pushes them via
//! the [`PresenceRegistry`] (`spec.md` §4.4, C7). Fan-out happens after the
//! state-change transaction commits: notifications must reflect persisted
//! state, never a speculative write.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;
use uuid::Uuid;

use crate::services::presence::PresenceRegistry;

/// Typed lifecycle events, tagged with `status` per `spec.md` §9 (the design
/// fixes `status`, not `type`, as the wire discriminator).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchEvent {
    MatchFound {
        match_id: Uuid,
        opponent_username: String,
        problem_id: Option<i64>,
    },
    MatchAcceptStatus {
        match_id: Uuid,
        player1_accepted: bool,
        player2_accepted: bool,
    },
    MatchStarted {
        match_id: Uuid,
        opponent_username: String,
        problem_id: Option<i64>,
    },
    MatchCancelled {
        match_id: Uuid,
        reason: String,
    },
    SubmissionResult {
        match_id: Uuid,
        is_correct: bool,
    },
    MatchCompleted {
        match_id: Uuid,
        result: MatchResult,
        old_rating: i32,
        new_rating: i32,
    },
    MatchDraw {
        match_id: Uuid,
        old_rating: i32,
        new_rating: i32,
    },
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Win,
    Loss,
}

/// Pushes [`MatchEvent`]s to one or both sides of a match via the presence
/// registry. Delivery is best-effort; see `spec.md` §4.4. Cheaply `Clone`
/// (an `Arc` clone) so spawned timer tasks can own one.
#[derive(Clone)]
pub struct NotificationBroker {
    presence: Arc<PresenceRegistry>,
}

impl NotificationBroker {
    pub fn new(presence: Arc<PresenceRegistry>) -> Self {
        Self { presence }
    }

    #[instrument(skip(self, event))]
    pub fn send(&self, user_id: Uuid, event: &MatchEvent) {
        let payload: Value = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
        self.presence.push(user_id, payload);
    }

    pub fn broadcast(&self, participants: [Uuid; 2], event: &MatchEvent) {
        self.send(participants[0], event);
        self.send(participants[1], event);
    }
}

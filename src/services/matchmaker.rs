//! # Matchmaker (C5)
//!
//! Enqueue / cancel / tick — the rating-banded player queue and the pair
//! formation loop that drives it (`spec.md` §4.1). Mirrors the structure of
//! [`crate::services::match_engine::MatchEngine`]: a unit struct of
//! associated functions taking the collaborators they need as parameters,
//! the same shape as the teacher's `SchedulerService`.

use std::sync::Arc;

use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Problem, QueueEntry, User};
use crate::services::match_engine::MatchEngine;
use crate::services::notify::NotificationBroker;
use crate::services::queue_store::QueueStore;
use crate::utils::constant::{MATCHMAKER_TICK_INTERVAL, QUEUE_ENTRY_TTL};

pub struct Matchmaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    AlreadyQueued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Removed,
    NotPresent,
}

impl Matchmaker {
    /// `spec.md` §4.1 `enqueue`. Rejected (409, via `AppError::Conflict`) if
    /// the user is already in-queue or already has an in-progress match.
    #[instrument(skip(db_pool, queue_store))]
    pub async fn enqueue(
        db_pool: &PgPool,
        queue_store: &dyn QueueStore,
        user_id: Uuid,
    ) -> AppResult<EnqueueOutcome> {
        if queue_store.is_queued(user_id).await? {
            return Ok(EnqueueOutcome::AlreadyQueued);
        }

        if has_in_progress_match(db_pool, user_id).await? {
            return Err(AppError::Conflict("user already has an in-progress match"));
        }

        let user = sqlx::query_as!(
            User,
            r#"SELECT id, username, rating, created_at FROM users WHERE id = $1"#,
            user_id
        )
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound("user not found"))?;

        let entry = QueueEntry {
            user_id: user.id,
            rating: user.rating,
            enqueued_at: OffsetDateTime::now_utc(),
        };

        let inserted = queue_store.enqueue(&entry, QUEUE_ENTRY_TTL).await?;
        Ok(if inserted {
            EnqueueOutcome::Queued
        } else {
            EnqueueOutcome::AlreadyQueued
        })
    }

    /// `spec.md` §4.1 `cancel`.
    #[instrument(skip(queue_store))]
    pub async fn cancel(queue_store: &dyn QueueStore, user_id: Uuid) -> AppResult<CancelOutcome> {
        let removed = queue_store.cancel(user_id).await?;
        Ok(if removed {
            CancelOutcome::Removed
        } else {
            CancelOutcome::NotPresent
        })
    }

    /// `spec.md` §4.1 pair-formation algorithm. Reads the full queue, greedily
    /// pairs the earliest unmatched entry with its nearest-by-rating
    /// opponent, re-verifies both are still free of in-progress matches, and
    /// creates a PENDING match for each pair. Returns the number of pairs
    /// formed.
    #[instrument(skip_all)]
    pub async fn tick(
        db_pool: &PgPool,
        queue_store: &dyn QueueStore,
        notify: &NotificationBroker,
    ) -> AppResult<usize> {
        let entries = queue_store.snapshot().await?;
        let mut matched = std::collections::HashSet::new();
        let mut pairs_formed = 0;

        for i in 0..entries.len() {
            let p1 = &entries[i];
            if matched.contains(&p1.user_id) {
                continue;
            }

            let opponent = entries[(i + 1)..]
                .iter()
                .filter(|e| !matched.contains(&e.user_id))
                .min_by_key(|e| (e.rating - p1.rating).abs());

            let Some(p2) = opponent else { continue };

            if has_in_progress_match(db_pool, p1.user_id).await?
                || has_in_progress_match(db_pool, p2.user_id).await?
            {
                // Lost the race to a concurrent enqueue/pairing elsewhere;
                // leave both entries for the next tick to reconcile.
                matched.insert(p1.user_id);
                matched.insert(p2.user_id);
                continue;
            }

            let problem_id = select_problem(db_pool, p1.user_id, p2.user_id, p1.rating, p2.rating)
                .await?
                .map(|p| p.id);

            let created = MatchEngine::create_pending(db_pool, p1.user_id, p2.user_id, problem_id)
                .await?;

            queue_store.remove_many(&[p1.user_id, p2.user_id]).await?;
            matched.insert(p1.user_id);
            matched.insert(p2.user_id);
            pairs_formed += 1;

            MatchEngine::notify_match_found(db_pool, notify, &created).await?;
            MatchEngine::spawn_acceptance_timer(db_pool.clone(), notify.clone(), created.id);

            info!(match_id = %created.id, p1 = %p1.user_id, p2 = %p2.user_id, "pair formed");
        }

        debug!(pairs_formed, queue_len = entries.len(), "tick complete");
        Ok(pairs_formed)
    }

    /// Spawns the single logical loop that runs `tick()` at the configured
    /// cadence (`spec.md` §4.1 — "at most once per second").
    pub fn spawn_tick_task(
        db_pool: PgPool,
        queue_store: Arc<dyn QueueStore>,
        notify: Arc<NotificationBroker>,
    ) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(MATCHMAKER_TICK_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = Self::tick(&db_pool, queue_store.as_ref(), notify.as_ref()).await
                {
                    tracing::error!(error = %e, "matchmaker tick failed");
                }
            }
        });
    }
}

async fn has_in_progress_match(db_pool: &PgPool, user_id: Uuid) -> AppResult<bool> {
    let row = sqlx::query!(
        r#"
        SELECT 1 AS "exists!"
        FROM matches
        WHERE (player1_id = $1 OR player2_id = $1)
          AND status IN ('pending', 'active')
        LIMIT 1
        "#,
        user_id
    )
    .fetch_optional(db_pool)
    .await?;

    Ok(row.is_some())
}

/// `spec.md` §4.1 problem selection, invoked during pair formation.
async fn select_problem(
    db_pool: &PgPool,
    p1: Uuid,
    p2: Uuid,
    r1: i32,
    r2: i32,
) -> AppResult<Option<Problem>> {
    let target = (r1 + r2) / 2;

    let candidates = sqlx::query_as!(
        Problem,
        r#"
        SELECT id, rating
        FROM problems
        WHERE id NOT IN (
            SELECT problem_id FROM matches
            WHERE status = 'completed'
              AND problem_id IS NOT NULL
              AND (player1_id = $1 OR player2_id = $1 OR player1_id = $2 OR player2_id = $2)
        )
        "#,
        p1,
        p2
    )
    .fetch_all(db_pool)
    .await?;

    if let Some(problem) = closest_to_target(&candidates, target) {
        return Ok(Some(problem));
    }

    // Both players have exhausted the unplayed set; fall back to the
    // closest overall (spec.md §4.1: "a random choice among ties is
    // permitted" — we deterministically take the lowest id instead).
    let all = sqlx::query_as!(Problem, r#"SELECT id, rating FROM problems"#)
        .fetch_all(db_pool)
        .await?;

    Ok(closest_to_target(&all, target))
}

fn closest_to_target(problems: &[Problem], target: i32) -> Option<Problem> {
    problems
        .iter()
        .min_by_key(|p| ((p.rating - target).abs(), p.id))
        .copied()
}

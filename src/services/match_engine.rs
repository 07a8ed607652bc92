//! # Match State Machine (C6)
//!
//! Transitions, acceptance accounting, timers, and result finalization
//! (`spec.md` §4.2). Like the teacher's `SchedulerService`, this is a unit
//! struct of associated functions rather than an object with fields — each
//! call takes the `PgPool` and `NotificationBroker` it needs. Every
//! transition that changes `status`, writes ratings, or sets `end_time` is
//! committed in a single transaction (`spec.md` §4.2 concurrency clause).

use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Match, MatchStatus, User};
use crate::services::notify::{MatchEvent, MatchResult, NotificationBroker};
use crate::services::rating::{self, Outcome};
use crate::utils::constant::{
    ACCEPTANCE_TIMEOUT, DRAW_TIMEOUT, PENDING_SWEEP_THRESHOLD, SWEEP_INTERVAL,
};

pub struct MatchEngine;

impl MatchEngine {
    /// Creates a PENDING match and starts its acceptance timer.
    #[instrument(skip(db_pool))]
    pub async fn create_pending(
        db_pool: &PgPool,
        player1_id: Uuid,
        player2_id: Uuid,
        problem_id: Option<i64>,
    ) -> AppResult<Match> {
        let created = sqlx::query_as!(
            Match,
            r#"
            INSERT INTO matches (player1_id, player2_id, problem_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, problem_id, player1_id, player2_id,
                      status AS "status: MatchStatus",
                      player1_accepted, player2_accepted,
                      player1_old_rating, player2_old_rating,
                      player1_new_rating, player2_new_rating,
                      winner_id, start_time, end_time
            "#,
            player1_id,
            player2_id,
            problem_id
        )
        .fetch_one(db_pool)
        .await?;

        info!(match_id = %created.id, "match created in PENDING");
        Ok(created)
    }

    /// `spec.md` §4.2 `accept`. Idempotent: accepting twice from the same
    /// side is a no-op that does not re-notify.
    #[instrument(skip(db_pool, notify))]
    pub async fn accept(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        match_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Match> {
        let mut tx = db_pool.begin().await?;

        let m = fetch_for_update(tx.as_mut(), match_id).await?;
        let side = m.side_of(user_id).ok_or(AppError::Forbidden("not a participant"))?;
        if m.status != MatchStatus::Pending {
            return Err(AppError::Conflict("match is not PENDING"));
        }

        let already_accepted = if side == 1 { m.player1_accepted } else { m.player2_accepted };
        if already_accepted {
            tx.rollback().await?;
            return Ok(m);
        }

        if side == 1 {
            sqlx::query!(
                "UPDATE matches SET player1_accepted = true WHERE id = $1",
                match_id
            )
            .execute(tx.as_mut())
            .await?;
        } else {
            sqlx::query!(
                "UPDATE matches SET player2_accepted = true WHERE id = $1",
                match_id
            )
            .execute(tx.as_mut())
            .await?;
        }

        let both_accepted = m.player1_accepted || side == 1;
        let both_accepted = both_accepted && (m.player2_accepted || side == 2);

        let updated = if both_accepted {
            sqlx::query_as!(
                Match,
                r#"
                UPDATE matches
                SET status = 'active', start_time = now()
                WHERE id = $1
                RETURNING id, problem_id, player1_id, player2_id,
                          status AS "status: MatchStatus",
                          player1_accepted, player2_accepted,
                          player1_old_rating, player2_old_rating,
                          player1_new_rating, player2_new_rating,
                          winner_id, start_time, end_time
                "#,
                match_id
            )
            .fetch_one(tx.as_mut())
            .await?
        } else {
            refetch(tx.as_mut(), match_id).await?
        };

        tx.commit().await?;

        notify.broadcast(
            [updated.player1_id, updated.player2_id],
            &MatchEvent::MatchAcceptStatus {
                match_id: updated.id,
                player1_accepted: updated.player1_accepted,
                player2_accepted: updated.player2_accepted,
            },
        );

        if updated.status == MatchStatus::Active {
            Self::notify_match_started(db_pool, notify, &updated).await?;
            Self::spawn_draw_timer(db_pool.clone(), notify.clone(), match_id);
        }

        Ok(updated)
    }

    /// `spec.md` §4.2 `decline`.
    #[instrument(skip(db_pool, notify))]
    pub async fn decline(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        match_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Match> {
        let mut tx = db_pool.begin().await?;
        let m = fetch_for_update(tx.as_mut(), match_id).await?;
        let side = m.side_of(user_id).ok_or(AppError::Forbidden("not a participant"))?;
        if m.status != MatchStatus::Pending {
            return Err(AppError::Conflict("match is not PENDING"));
        }

        let updated = sqlx::query_as!(
            Match,
            r#"
            UPDATE matches
            SET status = 'cancelled', end_time = now()
            WHERE id = $1
            RETURNING id, problem_id, player1_id, player2_id,
                      status AS "status: MatchStatus",
                      player1_accepted, player2_accepted,
                      player1_old_rating, player2_old_rating,
                      player1_new_rating, player2_new_rating,
                      winner_id, start_time, end_time
            "#,
            match_id
        )
        .fetch_one(tx.as_mut())
        .await?;
        tx.commit().await?;

        let reason = format!("player {side} declined");
        notify.broadcast(
            [updated.player1_id, updated.player2_id],
            &MatchEvent::MatchCancelled { match_id, reason },
        );

        Ok(updated)
    }

    /// `spec.md` §4.2 `submit_verdict`. A correct verdict finalizes the
    /// match; an incorrect one is reported only to the submitter and leaves
    /// state unchanged. Resubmitting against an already-COMPLETED match is a
    /// no-op only for the player who actually won it (`spec.md` §8); the
    /// losing side of a race between two correct submissions gets `conflict`
    /// (`spec.md` §4.2 Boundaries).
    #[instrument(skip(db_pool, notify))]
    pub async fn submit_verdict(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        match_id: Uuid,
        user_id: Uuid,
        correct: bool,
    ) -> AppResult<Match> {
        let m = fetch(db_pool, match_id).await?;
        m.side_of(user_id).ok_or(AppError::Forbidden("not a participant"))?;

        if m.status == MatchStatus::Completed {
            return if m.winner_id == Some(user_id) {
                Ok(m)
            } else {
                Err(AppError::Conflict("match already completed"))
            };
        }
        if m.status != MatchStatus::Active {
            return Err(AppError::Conflict("match is not ACTIVE"));
        }

        if !correct {
            notify.send(
                user_id,
                &MatchEvent::SubmissionResult { match_id, is_correct: false },
            );
            return Ok(m);
        }

        Self::finalize(db_pool, notify, match_id, Some(user_id), Outcome::Win, Some(user_id)).await
    }

    /// `spec.md` §4.2 `capitulate`. Same finalization path as a correct
    /// verdict, with the winner being the non-capitulating side. Same race
    /// treatment as `submit_verdict`: capitulating against a match already
    /// completed with a different winner is a conflict, not a no-op.
    #[instrument(skip(db_pool, notify))]
    pub async fn capitulate(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        match_id: Uuid,
        loser_id: Uuid,
    ) -> AppResult<Match> {
        let m = fetch(db_pool, match_id).await?;
        let winner_id = m.opponent_of(loser_id).ok_or(AppError::Forbidden("not a participant"))?;

        if m.status == MatchStatus::Completed {
            return if m.winner_id == Some(winner_id) {
                Ok(m)
            } else {
                Err(AppError::Conflict("match already completed"))
            };
        }
        if m.status != MatchStatus::Active {
            return Err(AppError::Conflict("match is not ACTIVE"));
        }

        Self::finalize(db_pool, notify, match_id, Some(winner_id), Outcome::Win, Some(winner_id))
            .await
    }

    /// Timer `acceptance_timeout`. A no-op if the match is no longer
    /// PENDING — the timer body re-reads state before acting
    /// (`spec.md` §5 "cancellation-tolerant").
    #[instrument(skip(db_pool, notify))]
    pub async fn acceptance_timeout(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        match_id: Uuid,
    ) -> AppResult<()> {
        let mut tx = db_pool.begin().await?;
        let m = match fetch_for_update(tx.as_mut(), match_id).await {
            Ok(m) => m,
            Err(_) => {
                tx.rollback().await?;
                return Ok(());
            }
        };
        if m.status != MatchStatus::Pending {
            tx.rollback().await?;
            return Ok(());
        }

        let updated = sqlx::query_as!(
            Match,
            r#"
            UPDATE matches
            SET status = 'cancelled', end_time = now()
            WHERE id = $1
            RETURNING id, problem_id, player1_id, player2_id,
                      status AS "status: MatchStatus",
                      player1_accepted, player2_accepted,
                      player1_old_rating, player2_old_rating,
                      player1_new_rating, player2_new_rating,
                      winner_id, start_time, end_time
            "#,
            match_id
        )
        .fetch_one(tx.as_mut())
        .await?;
        tx.commit().await?;

        let reason = non_accepting_side_description(&updated);
        notify.broadcast(
            [updated.player1_id, updated.player2_id],
            &MatchEvent::MatchCancelled { match_id, reason },
        );
        Ok(())
    }

    /// Timer `draw_timeout`. A no-op if the match is no longer ACTIVE.
    #[instrument(skip(db_pool, notify))]
    pub async fn draw_timeout(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        match_id: Uuid,
    ) -> AppResult<()> {
        let m = fetch(db_pool, match_id).await?;
        if m.status != MatchStatus::Active {
            return Ok(());
        }
        Self::finalize(db_pool, notify, match_id, None, Outcome::Draw, None).await?;
        Ok(())
    }

    /// Shared finalization path for correct verdict, capitulation, and draw
    /// timeout: writes `status = COMPLETED`, `winner_id`, `end_time`, and
    /// both rating snapshots atomically (`spec.md` §4.2, §4.3).
    ///
    /// `requester_id` discriminates a genuine idempotent resubmission from a
    /// losing race once the match is already COMPLETED: `None` means the
    /// caller is a system timer with nobody to reject (`draw_timeout`,
    /// always a no-op here), `Some(id)` means a player action that must only
    /// be treated as a no-op if `id` is in fact the match's recorded winner.
    async fn finalize(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        match_id: Uuid,
        winner_id: Option<Uuid>,
        outcome_for_p1: Outcome,
        requester_id: Option<Uuid>,
    ) -> AppResult<Match> {
        let mut tx = db_pool.begin().await?;
        let m = fetch_for_update(tx.as_mut(), match_id).await?;

        if m.status == MatchStatus::Completed {
            tx.rollback().await?;
            return match requester_id {
                None => Ok(m),
                Some(id) if m.winner_id == Some(id) => Ok(m),
                Some(_) => Err(AppError::Conflict("match already completed")),
            };
        }
        if m.status != MatchStatus::Active {
            tx.rollback().await?;
            return Err(AppError::Conflict("match is not ACTIVE"));
        }

        let p1 = fetch_user(tx.as_mut(), m.player1_id).await?;
        let p2 = fetch_user(tx.as_mut(), m.player2_id).await?;

        let outcome_for_p1 = match winner_id {
            Some(id) if id == m.player1_id => Outcome::Win,
            Some(_) => Outcome::Loss,
            None => outcome_for_p1,
        };
        let (new_r1, new_r2) = rating::updated_ratings(p1.rating, p2.rating, outcome_for_p1);

        sqlx::query!("UPDATE users SET rating = $1 WHERE id = $2", new_r1, p1.id)
            .execute(tx.as_mut())
            .await?;
        sqlx::query!("UPDATE users SET rating = $1 WHERE id = $2", new_r2, p2.id)
            .execute(tx.as_mut())
            .await?;

        let updated = sqlx::query_as!(
            Match,
            r#"
            UPDATE matches
            SET status = 'completed', end_time = now(), winner_id = $2,
                player1_old_rating = $3, player2_old_rating = $4,
                player1_new_rating = $5, player2_new_rating = $6
            WHERE id = $1
            RETURNING id, problem_id, player1_id, player2_id,
                      status AS "status: MatchStatus",
                      player1_accepted, player2_accepted,
                      player1_old_rating, player2_old_rating,
                      player1_new_rating, player2_new_rating,
                      winner_id, start_time, end_time
            "#,
            match_id,
            winner_id,
            p1.rating,
            p2.rating,
            new_r1,
            new_r2
        )
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;

        match winner_id {
            Some(winner) => {
                let loser = updated.opponent_of(winner).expect("winner is a participant");
                notify.send(
                    winner,
                    &MatchEvent::MatchCompleted {
                        match_id,
                        result: MatchResult::Win,
                        old_rating: if winner == p1.id { p1.rating } else { p2.rating },
                        new_rating: if winner == p1.id { new_r1 } else { new_r2 },
                    },
                );
                notify.send(
                    loser,
                    &MatchEvent::MatchCompleted {
                        match_id,
                        result: MatchResult::Loss,
                        old_rating: if loser == p1.id { p1.rating } else { p2.rating },
                        new_rating: if loser == p1.id { new_r1 } else { new_r2 },
                    },
                );
            }
            None => {
                notify.send(
                    p1.id,
                    &MatchEvent::MatchDraw { match_id, old_rating: p1.rating, new_rating: new_r1 },
                );
                notify.send(
                    p2.id,
                    &MatchEvent::MatchDraw { match_id, old_rating: p2.rating, new_rating: new_r2 },
                );
            }
        }

        Ok(updated)
    }

    /// Defensive sweep reconciling timers lost to a process restart
    /// (`spec.md` §5 "Crash recovery"): cancels stale PENDING matches and
    /// draws stale ACTIVE matches.
    #[instrument(skip(db_pool, notify))]
    pub async fn sweep_stale(db_pool: &PgPool, notify: &NotificationBroker) -> AppResult<()> {
        let pending_cutoff = OffsetDateTime::now_utc() - PENDING_SWEEP_THRESHOLD;
        let stale_pending = sqlx::query!(
            r#"SELECT id FROM matches WHERE status = 'pending' AND start_time <= $1"#,
            pending_cutoff
        )
        .fetch_all(db_pool)
        .await?;
        for row in stale_pending {
            if let Err(e) = Self::acceptance_timeout(db_pool, notify, row.id).await {
                warn!(match_id = %row.id, error = %e, "sweep failed to cancel stale pending match");
            }
        }

        let active_cutoff = OffsetDateTime::now_utc() - DRAW_TIMEOUT;
        let stale_active = sqlx::query!(
            r#"SELECT id FROM matches WHERE status = 'active' AND start_time <= $1"#,
            active_cutoff
        )
        .fetch_all(db_pool)
        .await?;
        for row in stale_active {
            if let Err(e) = Self::draw_timeout(db_pool, notify, row.id).await {
                warn!(match_id = %row.id, error = %e, "sweep failed to draw stale active match");
            }
        }

        Ok(())
    }

    pub async fn notify_match_found(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        m: &Match,
    ) -> AppResult<()> {
        let p1 = fetch_username(db_pool, m.player1_id).await?;
        let p2 = fetch_username(db_pool, m.player2_id).await?;

        notify.send(
            m.player1_id,
            &MatchEvent::MatchFound {
                match_id: m.id,
                opponent_username: p2,
                problem_id: m.problem_id,
            },
        );
        notify.send(
            m.player2_id,
            &MatchEvent::MatchFound {
                match_id: m.id,
                opponent_username: p1,
                problem_id: m.problem_id,
            },
        );
        Ok(())
    }

    async fn notify_match_started(
        db_pool: &PgPool,
        notify: &NotificationBroker,
        m: &Match,
    ) -> AppResult<()> {
        let p1 = fetch_username(db_pool, m.player1_id).await?;
        let p2 = fetch_username(db_pool, m.player2_id).await?;

        notify.send(
            m.player1_id,
            &MatchEvent::MatchStarted {
                match_id: m.id,
                opponent_username: p2,
                problem_id: m.problem_id,
            },
        );
        notify.send(
            m.player2_id,
            &MatchEvent::MatchStarted {
                match_id: m.id,
                opponent_username: p1,
                problem_id: m.problem_id,
            },
        );
        Ok(())
    }

    /// Fire-and-forget acceptance timer: sleeps 30s then fires
    /// `acceptance_timeout`, which re-reads state before acting.
    pub fn spawn_acceptance_timer(db_pool: PgPool, notify: NotificationBroker, match_id: Uuid) {
        tokio::spawn(async move {
            tokio::time::sleep(ACCEPTANCE_TIMEOUT).await;
            if let Err(e) = Self::acceptance_timeout(&db_pool, &notify, match_id).await {
                error!(match_id = %match_id, error = %e, "acceptance timer failed");
            }
        });
    }

    /// Fire-and-forget draw timer: sleeps 45min then fires `draw_timeout`.
    pub fn spawn_draw_timer(db_pool: PgPool, notify: NotificationBroker, match_id: Uuid) {
        tokio::spawn(async move {
            tokio::time::sleep(DRAW_TIMEOUT).await;
            if let Err(e) = Self::draw_timeout(&db_pool, &notify, match_id).await {
                error!(match_id = %match_id, error = %e, "draw timer failed");
            }
        });
    }

    /// Spawns the periodic defensive sweep (`spec.md` §5).
    pub fn spawn_sweep_task(db_pool: PgPool, notify: NotificationBroker) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = Self::sweep_stale(&db_pool, &notify).await {
                    error!(error = %e, "sweep task failed");
                }
            }
        });
    }
}

fn non_accepting_side_description(m: &Match) -> String {
    match (m.player1_accepted, m.player2_accepted) {
        (false, false) => "neither player accepted in time".to_string(),
        (false, true) => "player 1 did not accept in time".to_string(),
        (true, false) => "player 2 did not accept in time".to_string(),
        (true, true) => "acceptance raced the timeout".to_string(),
    }
}

async fn fetch(db_pool: &PgPool, match_id: Uuid) -> AppResult<Match> {
    sqlx::query_as!(
        Match,
        r#"
        SELECT id, problem_id, player1_id, player2_id,
               status AS "status: MatchStatus",
               player1_accepted, player2_accepted,
               player1_old_rating, player2_old_rating,
               player1_new_rating, player2_new_rating,
               winner_id, start_time, end_time
        FROM matches WHERE id = $1
        "#,
        match_id
    )
    .fetch_optional(db_pool)
    .await?
    .ok_or(AppError::NotFound("match not found"))
}

async fn fetch_for_update(
    conn: &mut sqlx::PgConnection,
    match_id: Uuid,
) -> AppResult<Match> {
    sqlx::query_as!(
        Match,
        r#"
        SELECT id, problem_id, player1_id, player2_id,
               status AS "status: MatchStatus",
               player1_accepted, player2_accepted,
               player1_old_rating, player2_old_rating,
               player1_new_rating, player2_new_rating,
               winner_id, start_time, end_time
        FROM matches WHERE id = $1
        FOR UPDATE
        "#,
        match_id
    )
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::NotFound("match not found"))
}

async fn refetch(conn: &mut sqlx::PgConnection, match_id: Uuid) -> AppResult<Match> {
    fetch_for_update(conn, match_id).await
}

async fn fetch_user(conn: &mut sqlx::PgConnection, user_id: Uuid) -> AppResult<User> {
    sqlx::query_as!(
        User,
        r#"SELECT id, username, rating, created_at FROM users WHERE id = $1 FOR UPDATE"#,
        user_id
    )
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::NotFound("user not found"))
}

async fn fetch_username(db_pool: &PgPool, user_id: Uuid) -> AppResult<String> {
    let row = sqlx::query!("SELECT username FROM users WHERE id = $1", user_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound("user not found"))?;
    Ok(row.username)
}

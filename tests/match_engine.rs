mod common;

use std::sync::Arc;

use sqlx::PgPool;

use common::create_user;
use duelcore::models::MatchStatus;
use duelcore::services::match_engine::MatchEngine;
use duelcore::services::notify::NotificationBroker;
use duelcore::services::presence::PresenceRegistry;

fn test_broker() -> NotificationBroker {
    NotificationBroker::new(Arc::new(PresenceRegistry::new()))
}

/// Scenario 2: neither side accepts within the acceptance window, so the
/// timer cancels the match instead of leaving it PENDING forever.
#[sqlx::test]
async fn acceptance_timeout_cancels_an_unaccepted_match(pool: PgPool) {
    let notify = test_broker();
    let (p1, _) = create_user(&pool, "p1", 1000).await;
    let (p2, _) = create_user(&pool, "p2", 1000).await;

    let m = MatchEngine::create_pending(&pool, p1, p2, None).await.unwrap();

    MatchEngine::acceptance_timeout(&pool, &notify, m.id).await.unwrap();

    let row = sqlx::query!("SELECT status AS \"status: MatchStatus\" FROM matches WHERE id = $1", m.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.status, MatchStatus::Cancelled);
}

/// The acceptance timer must be a no-op once both sides already accepted
/// and the match went ACTIVE — a slow timer must not clobber live state.
#[sqlx::test]
async fn acceptance_timeout_is_a_noop_once_active(pool: PgPool) {
    let notify = test_broker();
    let (p1, _) = create_user(&pool, "p1", 1000).await;
    let (p2, _) = create_user(&pool, "p2", 1000).await;

    let m = MatchEngine::create_pending(&pool, p1, p2, None).await.unwrap();
    MatchEngine::accept(&pool, &notify, m.id, p1).await.unwrap();
    MatchEngine::accept(&pool, &notify, m.id, p2).await.unwrap();

    MatchEngine::acceptance_timeout(&pool, &notify, m.id).await.unwrap();

    let row = sqlx::query!("SELECT status AS \"status: MatchStatus\" FROM matches WHERE id = $1", m.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.status, MatchStatus::Active);
}

/// Scenario 3: nobody solves the problem before the draw timer fires, so
/// the match completes with no winner and both ratings move as a draw.
#[sqlx::test]
async fn draw_timeout_completes_with_no_winner(pool: PgPool) {
    let notify = test_broker();
    let (p1, _) = create_user(&pool, "p1", 1000).await;
    let (p2, _) = create_user(&pool, "p2", 1000).await;

    let m = MatchEngine::create_pending(&pool, p1, p2, None).await.unwrap();
    MatchEngine::accept(&pool, &notify, m.id, p1).await.unwrap();
    MatchEngine::accept(&pool, &notify, m.id, p2).await.unwrap();

    MatchEngine::draw_timeout(&pool, &notify, m.id).await.unwrap();

    let row = sqlx::query!(
        r#"SELECT status AS "status: MatchStatus", winner_id,
                  player1_new_rating, player2_new_rating
           FROM matches WHERE id = $1"#,
        m.id
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.status, MatchStatus::Completed);
    assert!(row.winner_id.is_none());
    assert_eq!(row.player1_new_rating, Some(1000));
    assert_eq!(row.player2_new_rating, Some(1000));
}

/// Scenario 4: both sides accept at nearly the same time. Accepting twice
/// from the same side must stay idempotent rather than double-transition.
#[sqlx::test]
async fn double_accept_from_same_side_is_idempotent(pool: PgPool) {
    let notify = test_broker();
    let (p1, _) = create_user(&pool, "p1", 1000).await;
    let (p2, _) = create_user(&pool, "p2", 1000).await;

    let m = MatchEngine::create_pending(&pool, p1, p2, None).await.unwrap();
    MatchEngine::accept(&pool, &notify, m.id, p1).await.unwrap();
    let repeat = MatchEngine::accept(&pool, &notify, m.id, p1).await.unwrap();
    assert_eq!(repeat.status, MatchStatus::Pending);

    let after_both = MatchEngine::accept(&pool, &notify, m.id, p2).await.unwrap();
    assert_eq!(after_both.status, MatchStatus::Active);
}

/// Scenario 5: a player capitulates mid-match; the opponent is credited a
/// win and ratings update as if they had solved the problem.
#[sqlx::test]
async fn capitulate_awards_the_opponent_a_win(pool: PgPool) {
    let notify = test_broker();
    let (p1, _) = create_user(&pool, "p1", 1000).await;
    let (p2, _) = create_user(&pool, "p2", 1000).await;

    let m = MatchEngine::create_pending(&pool, p1, p2, None).await.unwrap();
    MatchEngine::accept(&pool, &notify, m.id, p1).await.unwrap();
    MatchEngine::accept(&pool, &notify, m.id, p2).await.unwrap();

    let finished = MatchEngine::capitulate(&pool, &notify, m.id, p1).await.unwrap();
    assert_eq!(finished.status, MatchStatus::Completed);
    assert_eq!(finished.winner_id, Some(p2));

    // Capitulating again (or submitting) against a COMPLETED match is a
    // no-op that returns the existing result rather than erroring.
    let repeat = MatchEngine::capitulate(&pool, &notify, m.id, p1).await.unwrap();
    assert_eq!(repeat.winner_id, Some(p2));

    let resubmit = MatchEngine::submit_verdict(&pool, &notify, m.id, p2, true).await.unwrap();
    assert_eq!(resubmit.winner_id, Some(p2));

    // The losing side submitting a correct verdict against the same
    // already-completed match is a genuine conflict, not a no-op: it would
    // otherwise look like the loser won.
    let err = MatchEngine::submit_verdict(&pool, &notify, m.id, p1, true).await.unwrap_err();
    assert!(matches!(err, duelcore::error::AppError::Conflict(_)));
}

/// A non-participant must never be able to act on someone else's match.
#[sqlx::test]
async fn non_participant_cannot_accept(pool: PgPool) {
    let notify = test_broker();
    let (p1, _) = create_user(&pool, "p1", 1000).await;
    let (p2, _) = create_user(&pool, "p2", 1000).await;
    let (outsider, _) = create_user(&pool, "outsider", 1000).await;

    let m = MatchEngine::create_pending(&pool, p1, p2, None).await.unwrap();
    let err = MatchEngine::accept(&pool, &notify, m.id, outsider).await.unwrap_err();
    assert!(matches!(err, duelcore::error::AppError::Forbidden(_)));
}

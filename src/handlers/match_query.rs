//! # Match Read Handlers
//!
//! `GET /match/active`, `/match/history`, `/match/details/{match_id}`
//! (`spec.md` §6). Pure reads; no state-machine involvement.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{AppState, Match, MatchStatus};

/// GET /match/active
///
/// The caller's current PENDING/ACTIVE match, or 404 (`spec.md` §6). Also
/// the resynchronization path a reconnecting client uses after missing
/// best-effort notifications (`spec.md` §4.4).
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn get_active_match(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let m = sqlx::query_as!(
        Match,
        r#"
        SELECT id, problem_id, player1_id, player2_id,
               status AS "status: MatchStatus",
               player1_accepted, player2_accepted,
               player1_old_rating, player2_old_rating,
               player1_new_rating, player2_new_rating,
               winner_id, start_time, end_time
        FROM matches
        WHERE (player1_id = $1 OR player2_id = $1)
          AND status IN ('pending', 'active')
        "#,
        user.user_id
    )
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(AppError::NotFound("no active match"))?;

    Ok(Json(m))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// GET /match/history?limit&offset
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn get_match_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let matches = sqlx::query_as!(
        Match,
        r#"
        SELECT id, problem_id, player1_id, player2_id,
               status AS "status: MatchStatus",
               player1_accepted, player2_accepted,
               player1_old_rating, player2_old_rating,
               player1_new_rating, player2_new_rating,
               winner_id, start_time, end_time
        FROM matches
        WHERE (player1_id = $1 OR player2_id = $1)
          AND status = 'completed'
        ORDER BY end_time DESC
        LIMIT $2 OFFSET $3
        "#,
        user.user_id,
        limit,
        offset
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(matches))
}

/// GET /match/details/{match_id}
///
/// Participants-only (`spec.md` §6); anyone else gets 403.
#[instrument(skip_all, fields(user_id = %user.user_id, match_id = %match_id))]
pub async fn get_match_details(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let m = sqlx::query_as!(
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
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(AppError::NotFound("match not found"))?;

    if m.side_of(user.user_id).is_none() {
        return Err(AppError::Forbidden("not a participant"));
    }

    Ok(Json(m))
}

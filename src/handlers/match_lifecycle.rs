//! # Match Lifecycle Handlers
//!
//! `accept` / `decline` / `capitulate` — thin HTTP wrappers over
//! [`crate::services::match_engine::MatchEngine`] (`spec.md` §4.2, §6).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::Match;
use crate::models::AppState;
use crate::services::match_engine::MatchEngine;

#[derive(Deserialize)]
pub struct MatchIdBody {
    match_id: Uuid,
}

/// POST /match/accept
#[instrument(skip_all, fields(user_id = %user.user_id, match_id = %body.match_id))]
pub async fn accept_match(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<MatchIdBody>,
) -> AppResult<impl IntoResponse> {
    let m = MatchEngine::accept(&state.db_pool, &state.notify, body.match_id, user.user_id).await?;
    Ok(Json(m))
}

/// POST /match/decline/{match_id}
#[instrument(skip_all, fields(user_id = %user.user_id, match_id = %match_id))]
pub async fn decline_match(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let m = MatchEngine::decline(&state.db_pool, &state.notify, match_id, user.user_id).await?;
    Ok(Json(m))
}

#[derive(Deserialize)]
pub struct CapitulateBody {
    match_id: Uuid,
    loser_id: Uuid,
}

/// POST /match/capitulate
///
/// `loser_id` must name the authenticated caller; a player cannot surrender
/// on their opponent's behalf.
#[instrument(skip_all, fields(user_id = %user.user_id, match_id = %body.match_id))]
pub async fn capitulate_match(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CapitulateBody>,
) -> AppResult<impl IntoResponse> {
    if body.loser_id != user.user_id {
        return Err(AppError::Forbidden("loser_id must match the authenticated caller"));
    }

    let m: Match =
        MatchEngine::capitulate(&state.db_pool, &state.notify, body.match_id, body.loser_id).await?;
    Ok(Json(m))
}

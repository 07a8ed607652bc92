//! # Matchmaking Entry Points
//!
//! `POST /match/find` and `POST /match/cancel_find` — thin HTTP wrappers
//! over [`crate::services::matchmaker::Matchmaker`] (`spec.md` §4.1, §6).

use std::sync::Arc;

use axum::{Json, extract::Extension, extract::State, response::IntoResponse};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::AppState;
use crate::services::matchmaker::{CancelOutcome, EnqueueOutcome, Matchmaker};

#[derive(Serialize)]
struct FindResponse {
    status: &'static str,
}

/// POST /match/find
///
/// Enqueues the authenticated user. `spec.md` §6 — the body carries
/// `user_id`, but the core only trusts the authenticated principal; a
/// mismatched body id is ignored rather than rejected.
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn find_match(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let outcome = Matchmaker::enqueue(&state.db_pool, state.queue_store.as_ref(), user.user_id).await?;

    let status = match outcome {
        EnqueueOutcome::Queued => "queued",
        EnqueueOutcome::AlreadyQueued => "already_queued",
    };
    Ok(Json(FindResponse { status }))
}

/// POST /match/cancel_find
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn cancel_find(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    let outcome = Matchmaker::cancel(state.queue_store.as_ref(), user.user_id).await?;

    let status = match outcome {
        CancelOutcome::Removed => "removed",
        CancelOutcome::NotPresent => "not_present",
    };
    Ok(Json(FindResponse { status }))
}

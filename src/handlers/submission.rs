//! # Verdict Ingress (C8)
//!
//! `POST /submissions/match` — obtains a correctness verdict from the
//! external judge collaborator and forwards it to
//! [`crate::services::match_engine::MatchEngine::submit_verdict`]
//! (`spec.md` §4.5, §6).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::AppState;
use crate::services::judge::Submission;
use crate::services::match_engine::MatchEngine;

#[derive(Deserialize)]
pub struct SubmitBody {
    match_id: Uuid,
    user_id: Uuid,
    code: String,
    language: String,
}

/// POST /submissions/match
///
/// `user_id` in the body must match the authenticated caller; the judge
/// call happens outside any match-level lock (`spec.md` §4.5).
#[instrument(skip_all, fields(user_id = %user.user_id, match_id = %body.match_id))]
pub async fn submit_solution(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SubmitBody>,
) -> AppResult<impl IntoResponse> {
    if body.user_id != user.user_id {
        return Err(AppError::Forbidden("user_id must match the authenticated caller"));
    }

    let m = sqlx::query!(
        r#"SELECT problem_id, player1_id, player2_id FROM matches WHERE id = $1"#,
        body.match_id
    )
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(AppError::NotFound("match not found"))?;

    if user.user_id != m.player1_id && user.user_id != m.player2_id {
        return Err(AppError::Forbidden("not a participant"));
    }

    let problem_id = m
        .problem_id
        .ok_or(AppError::Conflict("match has no assigned problem"))?;

    let submission = Submission {
        language: &body.language,
        source: &body.code,
        problem_id,
    };
    let correct = state.judge.judge(submission).await.map_err(|e| {
        tracing::error!(error = %e, "judge call failed");
        AppError::Unavailable("judge service unavailable")
    })?;

    let updated = MatchEngine::submit_verdict(
        &state.db_pool,
        &state.notify,
        body.match_id,
        user.user_id,
        correct,
    )
    .await?;

    Ok(Json(updated))
}

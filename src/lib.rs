//! # duelcore - Matchmaking and Match-Lifecycle Engine
//!
//! A 1-on-1 competitive programming matchmaker: players are paired by
//! rating, must mutually accept, then race to solve a shared problem.
//!
//! ## Modules
//!
//! - [`handlers`] - HTTP request handlers for matchmaking and match lifecycle
//! - [`middleware`] - Authentication middleware and other cross-cutting concerns
//! - [`models`] - Persisted entities and shared application state
//! - [`services`] - Business logic services (matchmaker, match engine, rating, ...)
//! - [`utils`] - Utility functions and constants
//! - [`error`] - Centralized error handling

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::env;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use jsonwebtoken::DecodingKey;
use secrecy::{ExposeSecret, SecretSlice};
use sqlx::PgPool;
use tracing::info;

use crate::handlers::{
    accept_match, cancel_find, capitulate_match, decline_match, find_match, get_active_match,
    get_match_details, get_match_history, health_check, match_ws, submit_solution,
};
use crate::middleware::auth_middleware;
use crate::models::AppState;
use crate::services::judge::{HttpJudgeClient, JudgeClient, LogJudgeClient};
use crate::services::jwt::JwtService;
use crate::services::match_engine::MatchEngine;
use crate::services::matchmaker::Matchmaker;
use crate::services::queue_store::{QueueStore, RedisQueueStore};

/// Creates an Axum router auto-detecting its judge and queue-store
/// collaborators from `APP_ENV`/`REDIS_URL`, the way the upstream
/// email-service selection worked.
#[inline]
pub async fn app(db_pool: PgPool) -> Router {
    app_with_collaborators(db_pool, None, None).await
}

/// Creates an Axum router with application routes and state, auto-detecting
/// the judge collaborator from `APP_ENV` and connecting the queue store to a
/// real Redis instance.
///
/// # Arguments
///
/// * `db_pool` - PostgreSQL database connection pool
/// * `judge_client` - Optional custom judge collaborator. If `None`, will
///   auto-detect based on `APP_ENV`
///
/// # Environment Variables
///
/// - `APP_ENV` - "production" uses [`HttpJudgeClient`], otherwise
///   [`LogJudgeClient`] (mock, always returns a correct verdict)
/// - `JUDGE_API_URL` - Required in production for the external judge
/// - `REDIS_URL` - Required; backs the queue store and token blocklist
/// - `JWT_SECRET` - Required for access-token signature verification
#[inline]
pub async fn app_with_judge_client(
    db_pool: PgPool,
    judge_client: Option<Arc<dyn JudgeClient>>,
) -> Router {
    app_with_collaborators(db_pool, judge_client, None).await
}

/// Creates an Axum router with application routes and state.
///
/// Lets tests substitute an in-memory [`QueueStore`] in place of a live
/// Redis instance, the same way the judge collaborator is substitutable.
///
/// # Returns
///
/// A configured Axum router with all application routes, background tasks
/// already spawned, and state attached.
pub async fn app_with_collaborators(
    db_pool: PgPool,
    judge_client: Option<Arc<dyn JudgeClient>>,
    queue_store: Option<Arc<dyn QueueStore>>,
) -> Router {
    let judge: Arc<dyn JudgeClient> = if let Some(client) = judge_client {
        client
    } else {
        let app_env = env::var("APP_ENV")
            .expect("Env variable `APP_ENV` should be set")
            .to_ascii_lowercase();

        if app_env == "production" {
            info!("Running in production mode with [HttpJudgeClient]");
            let api_url =
                env::var("JUDGE_API_URL").expect("Env variable `JUDGE_API_URL` should be set");
            Arc::new(HttpJudgeClient::new(api_url))
        } else {
            info!("Running in development mode with [LogJudgeClient (Mock)]");
            Arc::new(LogJudgeClient { verdict: true })
        }
    };

    let queue_store: Arc<dyn QueueStore> = if let Some(store) = queue_store {
        store
    } else {
        let redis_url = env::var("REDIS_URL").expect("Env variable `REDIS_URL` should be set");
        Arc::new(
            RedisQueueStore::connect(&redis_url)
                .await
                .expect("Failed to connect to Redis"),
        )
    };

    let jwt_secret = SecretSlice::from(
        env::var("JWT_SECRET")
            .expect("Env variable `JWT_SECRET` should be set")
            .into_bytes(),
    );
    let jwt_service = JwtService::new(DecodingKey::from_secret(jwt_secret.expose_secret()));

    let state = Arc::new(AppState::new(db_pool, queue_store, judge, jwt_service));

    Matchmaker::spawn_tick_task(
        state.db_pool.clone(),
        Arc::clone(&state.queue_store),
        Arc::new(state.notify.clone()),
    );
    MatchEngine::spawn_sweep_task(state.db_pool.clone(), state.notify.clone());

    let public = Router::new().route("/health-check", get(health_check));

    let protected = Router::new()
        .route("/match/find", post(find_match))
        .route("/match/cancel_find", post(cancel_find))
        .route("/match/accept", post(accept_match))
        .route("/match/decline/{match_id}", post(decline_match))
        .route("/match/capitulate", post(capitulate_match))
        .route("/match/active", get(get_active_match))
        .route("/match/history", get(get_match_history))
        .route("/match/details/{match_id}", get(get_match_details))
        .route("/match/ws/{user_id}", get(match_ws))
        .route("/submissions/match", post(submit_solution))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    public.merge(protected).with_state(state)
}

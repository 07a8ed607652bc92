//! # Authentication Middleware
//!
//! This module contains the authentication middleware that validates JWT
//! access tokens and provides user context to protected routes. Identity and
//! credential issuance belong to an external auth collaborator; this
//! middleware only verifies a bearer token presented against it
//! (`spec.md` §1, §6).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, instrument, trace, warn};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::jwt::Claims;

/// Authentication middleware for protecting routes.
///
/// # Authentication Flow
///
/// 1. Extracts `Authorization` header with `Bearer <token>` format
/// 2. Validates the JWT token signature and expiration
/// 3. Consults the queue store's blocklist for the token's `jti`
/// 4. Adds [`AuthUser`] to request extensions for handler access
///
/// # Returns
///
/// - **Success**: Continues to next handler with user context
/// - **Failure**: Returns `401 Unauthorized` for missing, invalid, expired,
///   or blocklisted tokens
#[instrument(
    skip_all,
    fields(
        method = %req.method(),
        uri = %req.uri(),
        request_id = %uuid::Uuid::new_v4()
    )
)]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    trace!("processing authentication middleware");

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let Some(auth_header) = auth_header else {
        warn!("missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if !auth_header.starts_with("Bearer ") {
        warn!("invalid Authorization header format");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = auth_header.trim_start_matches("Bearer ");
    trace!("extracted bearer token from Authorization header");

    let claims = state.jwt_service.validate_access_token(token).map_err(|e| {
        warn!(error = %e, "token validation failed");
        StatusCode::UNAUTHORIZED
    })?;

    let blocked = state.queue_store.is_blocked(&claims.jti).await.map_err(|e| {
        error!(error = %e, "blocklist lookup failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    if blocked {
        warn!(jti = %claims.jti, "rejected blocklisted token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user_id = Uuid::try_parse(&claims.sub).map_err(|e| {
        error!(error = %e, "failed to parse user ID from token claims");
        StatusCode::UNAUTHORIZED
    })?;

    debug!(user_id = %user_id, "authentication successful");
    req.extensions_mut().insert(AuthUser { user_id, claims });

    let response = next.run(req).await;
    debug!("request processed successfully");
    Ok(response)
}

/// Authenticated user information available to handlers, inserted into
/// request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub claims: Claims,
}

//! # Notification WebSocket (C2 ingress)
//!
//! `WS /match/ws/{user_id}` — registers a live sink in the
//! [`crate::services::presence::PresenceRegistry`] and forwards queued
//! events to the socket until it closes (`spec.md` §4.4, §6). The path's
//! `user_id` must match the authenticated principal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::AppState;

/// GET /match/ws/{user_id} (upgrade)
#[instrument(skip_all, fields(user_id = %user.user_id, path_user_id = %path_user_id))]
pub async fn match_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(path_user_id): Path<Uuid>,
) -> impl IntoResponse {
    if path_user_id != user.user_id {
        warn!("rejected websocket upgrade: path user_id does not match token");
        return axum::http::StatusCode::FORBIDDEN.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, user.user_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.presence.register(user_id);

    let connection_active = Arc::new(AtomicBool::new(true));
    let connection_active_clone = connection_active.clone();

    // Clients send no application messages; this task only watches for
    // close/error so the send task can stop forwarding.
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(_) => break,
                _ => {}
            }
        }
        connection_active_clone.store(false, Ordering::Relaxed);
    });

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if !connection_active.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = sender.send(Message::Text(event.to_string())).await {
                warn!(error = %e, "failed to forward notification to socket");
                break;
            }
        }
    });

    tokio::select! {
        _ = recv_task => {},
        _ = send_task => {},
    }

    state.presence.prune_closed(user_id);
    info!(user_id = %user_id, "notification socket closed");
}

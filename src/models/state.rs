use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::services::jwt::JwtService;
use crate::services::judge::JudgeClient;
use crate::services::notify::NotificationBroker;
use crate::services::presence::PresenceRegistry;
use crate::services::queue_store::QueueStore;

/// Application state shared across requests. Needs to be thread-safe.
///
/// `db_pool` is the C1 Persistent Store; `queue_store` is C3; `presence`
/// and `notify` are C2/C7; `judge` is the C8 external judge collaborator.
pub struct AppState {
    /// The PostgreSQL database connection pool (C1).
    pub db_pool: PgPool,
    /// Redis-backed queue + blocklist store (C3).
    pub queue_store: Arc<dyn QueueStore>,
    /// In-process presence registry (C2).
    pub presence: Arc<PresenceRegistry>,
    /// Converts match-lifecycle events into messages pushed via `presence` (C7).
    pub notify: NotificationBroker,
    /// External judge collaborator (C8).
    pub judge: Arc<dyn JudgeClient>,
    /// JWT service for access-token validation.
    pub jwt_service: JwtService,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        queue_store: Arc<dyn QueueStore>,
        judge: Arc<dyn JudgeClient>,
        jwt_service: JwtService,
    ) -> Self {
        info!("Initializing application state");

        let presence = Arc::new(PresenceRegistry::new());
        let notify = NotificationBroker::new(Arc::clone(&presence));

        Self {
            db_pool,
            queue_store,
            presence,
            notify,
            judge,
            jwt_service,
        }
    }
}

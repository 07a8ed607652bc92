//! # Presence Registry
//!
//! In-process map from player id to a set of live notification sinks
//! (`spec.md` §4.4, C2). Concurrent-safe; any number of sinks may connect or
//! disconnect at any time. A send failure on a sink immediately removes it.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

/// One live bidirectional connection to a client of one user.
pub type Sink = mpsc::UnboundedSender<Value>;

/// Process-wide registry of `user_id -> live sinks`. Injected into the
/// notification broker rather than reached for directly from state-machine
/// code (`spec.md` §9).
#[derive(Default)]
pub struct PresenceRegistry {
    sinks: DashMap<Uuid, Vec<Sink>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new sink for `user_id`. Returns a receiver the caller's
    /// WebSocket send loop should forward to the client.
    #[instrument(skip(self))]
    pub fn register(&self, user_id: Uuid) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sinks.entry(user_id).or_default().push(tx);
        debug!(sink_count = self.sinks.get(&user_id).map(|s| s.len()).unwrap_or(0), "sink registered");
        rx
    }

    /// At-most-once, best-effort fan-out to every live sink of `user_id`.
    /// A send failure drops that sink; it is never retried or queued.
    #[instrument(skip(self, message))]
    pub fn push(&self, user_id: Uuid, message: Value) {
        let Some(mut sinks) = self.sinks.get_mut(&user_id) else {
            trace!("no live sink for user, message dropped");
            return;
        };
        sinks.retain(|sink| sink.send(message.clone()).is_ok());
    }

    /// Removes a sink once its owning connection task observes closure.
    /// Failed sends already self-prune via [`Self::push`]; this lets a
    /// clean disconnect prune eagerly instead of waiting for the next push.
    pub fn prune_closed(&self, user_id: Uuid) {
        if let Some(mut sinks) = self.sinks.get_mut(&user_id) {
            sinks.retain(|sink| !sink.is_closed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_with_no_sink_is_a_silent_no_op() {
        let registry = PresenceRegistry::new();
        registry.push(Uuid::new_v4(), json!({"status": "match_found"}));
    }

    #[test]
    fn push_delivers_to_registered_sink() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let mut rx = registry.register(user);
        registry.push(user, json!({"status": "match_found"}));
        let received = rx.try_recv().expect("message should be delivered");
        assert_eq!(received["status"], "match_found");
    }

    #[test]
    fn dropped_receiver_prunes_the_dead_sink() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let rx = registry.register(user);
        drop(rx);
        registry.push(user, json!({"status": "match_found"}));
        assert_eq!(registry.sinks.get(&user).unwrap().len(), 0);
    }
}

//! # Application Constants
//!
//! Configuration constants controlling matchmaking and match-lifecycle timing.

use std::time::Duration;

/// Window during which both sides of a PENDING match must accept.
pub const ACCEPTANCE_TIMEOUT: Duration = Duration::from_secs(30);

/// ACTIVE deadline after which an unsolved match completes as a draw.
pub const DRAW_TIMEOUT: Duration = Duration::from_secs(45 * 60);

/// Defensive threshold: a PENDING match older than this is swept to CANCELLED
/// on restart or during the periodic sweep, reconciling timers lost to a
/// process restart.
pub const PENDING_SWEEP_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Interval at which the pending-match and stale-active sweeper runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// TTL of a queued user's uniqueness marker and queue entry.
pub const QUEUE_ENTRY_TTL: Duration = Duration::from_secs(60 * 60);

/// Matchmaker tick cadence; the loop also wakes on enqueue/cancel events.
pub const MATCHMAKER_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// K-factor used by the Elo rating update (`spec.md` §4.3).
pub const ELO_K_FACTOR: f64 = 32.0;

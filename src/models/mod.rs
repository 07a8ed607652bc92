mod match_;
mod problem;
mod queue_entry;
mod state;
mod user;

pub use match_::{Match, MatchStatus};
pub use problem::Problem;
pub use queue_entry::QueueEntry;
pub use state::AppState;
pub use user::{DEFAULT_RATING, User};

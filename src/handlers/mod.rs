//! # HTTP Request Handlers
//!
//! This module contains all HTTP request handlers for the matchmaking and
//! match-lifecycle service. Each handler is responsible for processing
//! specific HTTP requests and returning appropriate responses.
//!
//! ## Available Handlers
//!
//! - **Health Check** (`health_check`) - Application health monitoring
//! - **Match find** (`match_find`) - queue enqueue/cancel (C5)
//! - **Match lifecycle** (`match_lifecycle`) - accept/decline/capitulate (C6)
//! - **Match query** (`match_query`) - active/history/details reads
//! - **Submission** (`submission`) - verdict ingress (C8)
//! - **WebSocket** (`ws`) - notification socket registration (C2)

mod health_check;
mod match_find;
mod match_lifecycle;
mod match_query;
mod submission;
mod ws;

pub use health_check::*;
pub use match_find::*;
pub use match_lifecycle::*;
pub use match_query::*;
pub use submission::*;
pub use ws::*;

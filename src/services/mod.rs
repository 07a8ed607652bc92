//! # Business Logic Services
//!
//! This module contains the core business logic services for the matchmaking
//! and match-lifecycle engine. Services encapsulate domain-specific
//! functionality and provide clean interfaces for use by HTTP handlers and
//! other application components.
//!
//! ## Available Services
//!
//! - **JWT** (`jwt`) - access-token validation
//! - **Queue store** (`queue_store`) - matchmaking queue + token blocklist (C3)
//! - **Presence** (`presence`) - live notification sinks per user (C2)
//! - **Notify** (`notify`) - typed lifecycle events pushed via presence (C7)
//! - **Judge** (`judge`) - external submission-correctness collaborator (C8)
//! - **Rating** (`rating`) - Elo rating calculator
//! - **Matchmaker** (`matchmaker`) - queue pairing loop (C5)
//! - **Match engine** (`match_engine`) - per-match state machine (C6)

pub mod judge;
pub mod jwt;
pub mod match_engine;
pub mod matchmaker;
pub mod notify;
pub mod presence;
pub mod queue_store;
pub mod rating;

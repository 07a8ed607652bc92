//! # Problem
//!
//! Problem authoring and test-case storage are external collaborators; the
//! core only needs enough of a catalog to pick a problem whose `rating` is
//! close to a pair's target rating (`spec.md` §4.1).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::FromRow)]
pub struct Problem {
    pub id: i64,
    pub rating: i32,
}

//! # Rating Engine
//!
//! Pure Elo calculator (`K = 32`). Side-effect free: callers persist both
//! users' new ratings and the per-match rating snapshots in the same
//! transaction as the `status = COMPLETED` write.

use crate::utils::constant::ELO_K_FACTOR;

/// Outcome of a match from one side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    fn score(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Loss => 0.0,
            Outcome::Draw => 0.5,
        }
    }

    /// The outcome as seen by the opposing side.
    pub fn flip(self) -> Outcome {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
        }
    }
}

/// Expected score of a player rated `r` against an opponent rated `r_opp`.
fn expected_score(r: i32, r_opp: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf((r_opp - r) as f64 / 400.0))
}

/// Updated rating for a player rated `r` against `r_opp` given `outcome`.
pub fn updated_rating(r: i32, r_opp: i32, outcome: Outcome) -> i32 {
    let e = expected_score(r, r_opp);
    let delta = ELO_K_FACTOR * (outcome.score() - e);
    r + delta.round() as i32
}

/// Ratings for both sides of a completed match in one call.
pub fn updated_ratings(r1: i32, r2: i32, outcome_for_p1: Outcome) -> (i32, i32) {
    let new_r1 = updated_rating(r1, r2, outcome_for_p1);
    let new_r2 = updated_rating(r2, r1, outcome_for_p1.flip());
    (new_r1, new_r2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_raises_underdog_rating() {
        // 1000 beats 1200: each side's own expected score is used, so the
        // two deltas are not required to be equal in magnitude.
        let (winner, loser) = updated_ratings(1000, 1200, Outcome::Win);
        assert_eq!(winner, 1024);
        assert_eq!(loser, 1176);
    }

    #[test]
    fn equal_rated_draw_is_unchanged() {
        let (a, b) = updated_ratings(1200, 1200, Outcome::Draw);
        assert_eq!(a, 1200);
        assert_eq!(b, 1200);
    }

    #[test]
    fn mismatched_draw_shifts_toward_underdog() {
        let (low, high) = updated_ratings(1000, 1200, Outcome::Draw);
        assert!(low > 1000);
        assert!(high < 1200);
    }

    #[test]
    fn outcome_flip_is_involutive() {
        assert_eq!(Outcome::Win.flip(), Outcome::Loss);
        assert_eq!(Outcome::Loss.flip(), Outcome::Win);
        assert_eq!(Outcome::Draw.flip(), Outcome::Draw);
    }
}

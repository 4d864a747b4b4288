//! Reward sources: where the rating for a presented movie comes from.
//!
//! A simulated source draws ratings from hidden per-movie qualities; an
//! interactive source relays ratings typed by a person. Both validate ratings
//! against the rating domain before anything reaches the bandit engine.

pub mod interactive;
pub mod simulated;

pub use interactive::{parse_rating, InteractiveFeedback, RatingInputError};
pub use simulated::SimulatedFeedback;

use cinebandit_core::{ArmIndex, BanditResult, RunMode};

/// Result of asking a source for a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Rating(i32),
    /// No more ratings will be supplied (end of input, or the user quit).
    Stopped,
}

pub trait RewardSource {
    /// Obtain a raw rating for the arm, within the configured rating bounds.
    fn observe(&mut self, arm: ArmIndex, label: &str) -> BanditResult<Observation>;

    fn mode(&self) -> RunMode;
}

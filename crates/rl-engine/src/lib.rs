//! Adaptive arm selection: Thompson Sampling over Beta-distributed beliefs,
//! with incremental conjugate updates and posterior credible intervals.

pub mod bandits;

pub use bandits::{ArmState, CredibleInterval, Selection, ThompsonEngine};

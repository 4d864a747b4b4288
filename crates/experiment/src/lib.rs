//! Experiment driver for the movie bandit: plays rounds against a reward
//! source and accumulates the rating log and reward/regret series.

pub mod driver;
pub mod series;

pub use driver::{Experiment, NoProgress, ProgressSink, RunOutcome, RunPlan, RunState};
pub use series::MetricSeries;

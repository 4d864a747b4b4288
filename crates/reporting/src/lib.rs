//! Run reporting — per-movie statistics, rankings, chart data, console text,
//! and rating-log export.

pub mod charts;
pub mod export;
pub mod render;
pub mod stats;

pub use charts::{ErrorBarChart, RewardRegretChart};
pub use export::{RatingLogEntry, RunExport, RunMetadata};
pub use stats::{arm_reports, rank, summarize, ArmReport, RankBy, RunSummary};

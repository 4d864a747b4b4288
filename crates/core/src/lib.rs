//! Shared building blocks for the movie bandit workspace: error taxonomy,
//! configuration, rating domain types and the catalog.

pub mod catalog;
pub mod config;
pub mod error;
pub mod tabular;
pub mod types;

pub use catalog::{Catalog, CatalogItem};
pub use config::AppConfig;
pub use error::{BanditError, BanditResult};
pub use types::{ArmIndex, RatingBounds, RoundRecord, RunMode, SelectionPolicy, StopReason};

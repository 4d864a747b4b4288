use crate::error::{BanditError, BanditResult};
use crate::types::{RatingBounds, RunMode, SelectionPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `CINEBANDIT__`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub experiment: ExperimentConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_round_count")]
    pub round_count: usize,
    #[serde(default)]
    pub policy: SelectionPolicy,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default = "default_rating_min")]
    pub rating_min: i32,
    #[serde(default = "default_rating_max")]
    pub rating_max: i32,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    /// Print interim statistics every K rounds.
    #[serde(default = "default_stats_interval")]
    pub stats_interval: usize,
    #[serde(default)]
    pub credible_interval: IntervalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalConfig {
    #[serde(default = "default_lower_percentile")]
    pub lower_percentile: f64,
    #[serde(default = "default_upper_percentile")]
    pub upper_percentile: f64,
    #[serde(default = "default_interval_samples")]
    pub samples: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Beta prior the hidden per-movie qualities are drawn from.
    #[serde(default = "default_prior_alpha")]
    pub prior_alpha: f64,
    #[serde(default = "default_prior_beta")]
    pub prior_beta: f64,
    /// Standard deviation of the additive Gaussian noise on each observation.
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    #[serde(default = "default_catalog_limit")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
    #[serde(default)]
    pub json_path: Option<PathBuf>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_rank_by")]
    pub rank_by: String,
}

// Default functions
fn default_round_count() -> usize {
    100
}
fn default_rating_min() -> i32 {
    RatingBounds::DEFAULT_MIN
}
fn default_rating_max() -> i32 {
    RatingBounds::DEFAULT_MAX
}
fn default_random_seed() -> u64 {
    42
}
fn default_stats_interval() -> usize {
    5
}
fn default_lower_percentile() -> f64 {
    2.5
}
fn default_upper_percentile() -> f64 {
    97.5
}
fn default_interval_samples() -> usize {
    1000
}
fn default_prior_alpha() -> f64 {
    2.0
}
fn default_prior_beta() -> f64 {
    2.0
}
fn default_noise_std() -> f64 {
    0.1
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/movies.csv")
}
fn default_catalog_limit() -> Option<usize> {
    Some(50)
}
fn default_top_n() -> usize {
    10
}
fn default_rank_by() -> String {
    "mean_rating".to_string()
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            round_count: default_round_count(),
            policy: SelectionPolicy::default(),
            mode: RunMode::default(),
            rating_min: default_rating_min(),
            rating_max: default_rating_max(),
            random_seed: default_random_seed(),
            stats_interval: default_stats_interval(),
            credible_interval: IntervalConfig::default(),
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            lower_percentile: default_lower_percentile(),
            upper_percentile: default_upper_percentile(),
            samples: default_interval_samples(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            prior_alpha: default_prior_alpha(),
            prior_beta: default_prior_beta(),
            noise_std: default_noise_std(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            limit: default_catalog_limit(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            json_path: None,
            top_n: default_top_n(),
            rank_by: default_rank_by(),
        }
    }
}

impl ExperimentConfig {
    pub fn rating_bounds(&self) -> BanditResult<RatingBounds> {
        RatingBounds::new(self.rating_min, self.rating_max)
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then the environment.
    /// Environment variables take precedence over the file.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CINEBANDIT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> BanditResult<()> {
        let exp = &self.experiment;
        if exp.round_count == 0 {
            return Err(BanditError::InvalidConfiguration(
                "round_count must be positive".into(),
            ));
        }
        exp.rating_bounds()?;
        if exp.stats_interval == 0 {
            return Err(BanditError::InvalidConfiguration(
                "stats_interval must be positive".into(),
            ));
        }

        let ci = &exp.credible_interval;
        if !(0.0..=100.0).contains(&ci.lower_percentile)
            || !(0.0..=100.0).contains(&ci.upper_percentile)
            || ci.lower_percentile > ci.upper_percentile
        {
            return Err(BanditError::InvalidConfiguration(format!(
                "credible interval percentiles must satisfy 0 <= lower <= upper <= 100, got ({}, {})",
                ci.lower_percentile, ci.upper_percentile
            )));
        }
        if ci.samples == 0 {
            return Err(BanditError::InvalidConfiguration(
                "credible interval needs at least one sample".into(),
            ));
        }

        let sim = &self.simulation;
        if !(sim.prior_alpha > 0.0 && sim.prior_beta > 0.0) {
            return Err(BanditError::InvalidConfiguration(format!(
                "quality prior must be positive, got Beta({}, {})",
                sim.prior_alpha, sim.prior_beta
            )));
        }
        if !(sim.noise_std >= 0.0 && sim.noise_std.is_finite()) {
            return Err(BanditError::InvalidConfiguration(format!(
                "noise_std must be a finite non-negative number, got {}",
                sim.noise_std
            )));
        }
        if self.catalog.limit == Some(0) {
            return Err(BanditError::InvalidConfiguration(
                "catalog limit must be positive".into(),
            ));
        }
        Ok(())
    }
}

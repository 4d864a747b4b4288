//! Simulated viewer with a fixed hidden quality per movie.

use crate::{Observation, RewardSource};
use cinebandit_core::config::SimulationConfig;
use cinebandit_core::{ArmIndex, BanditError, BanditResult, RatingBounds, RunMode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution, Normal};
use tracing::{debug, info};

pub struct SimulatedFeedback {
    qualities: Vec<f64>,
    noise: Option<Normal<f64>>,
    bounds: RatingBounds,
    rng: StdRng,
}

impl SimulatedFeedback {
    /// Draw one hidden quality per arm from `Beta(prior_alpha, prior_beta)`.
    ///
    /// The same seeded generator then drives the observation noise, so a seed
    /// fully determines the ratings of a run.
    pub fn new(
        n_arms: usize,
        config: &SimulationConfig,
        bounds: RatingBounds,
        seed: u64,
    ) -> BanditResult<Self> {
        if n_arms == 0 {
            return Err(BanditError::InvalidConfiguration(
                "simulated feedback needs at least one movie".into(),
            ));
        }
        let prior = Beta::new(config.prior_alpha, config.prior_beta).map_err(|e| {
            BanditError::InvalidConfiguration(format!(
                "invalid quality prior Beta({}, {}): {e}",
                config.prior_alpha, config.prior_beta
            ))
        })?;

        let mut rng = StdRng::seed_from_u64(seed);
        let qualities: Vec<f64> = (0..n_arms).map(|_| prior.sample(&mut rng)).collect();

        info!(
            arms = n_arms,
            seed,
            prior_alpha = config.prior_alpha,
            prior_beta = config.prior_beta,
            noise_std = config.noise_std,
            "Simulated feedback initialized"
        );

        Self::build(qualities, config.noise_std, bounds, rng)
    }

    /// Use explicit hidden qualities in `[0, 1]`.
    pub fn with_qualities(
        qualities: Vec<f64>,
        noise_std: f64,
        bounds: RatingBounds,
        seed: u64,
    ) -> BanditResult<Self> {
        if qualities.is_empty() {
            return Err(BanditError::InvalidConfiguration(
                "simulated feedback needs at least one movie".into(),
            ));
        }
        if let Some(q) = qualities.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(BanditError::InvalidConfiguration(format!(
                "hidden quality {q} is outside [0, 1]"
            )));
        }
        Self::build(qualities, noise_std, bounds, StdRng::seed_from_u64(seed))
    }

    fn build(
        qualities: Vec<f64>,
        noise_std: f64,
        bounds: RatingBounds,
        rng: StdRng,
    ) -> BanditResult<Self> {
        if !(noise_std >= 0.0 && noise_std.is_finite()) {
            return Err(BanditError::InvalidConfiguration(format!(
                "noise_std must be finite and non-negative, got {noise_std}"
            )));
        }
        let noise = if noise_std > 0.0 {
            Some(Normal::new(0.0, noise_std).map_err(|e| {
                BanditError::InvalidConfiguration(format!("invalid noise_std {noise_std}: {e}"))
            })?)
        } else {
            None
        };
        Ok(Self {
            qualities,
            noise,
            bounds,
            rng,
        })
    }

    pub fn true_qualities(&self) -> &[f64] {
        &self.qualities
    }

    /// Arm with the highest hidden quality; lowest index wins ties.
    pub fn optimal_arm(&self) -> (ArmIndex, f64) {
        let mut best = (0, self.qualities[0]);
        for (i, &q) in self.qualities.iter().enumerate().skip(1) {
            if q > best.1 {
                best = (i, q);
            }
        }
        best
    }

    /// Noisy rating for an arm: quality plus Gaussian noise, clipped to
    /// `[0, 1]`, scaled onto the rating domain and rounded.
    pub fn sample_rating(&mut self, arm: ArmIndex) -> BanditResult<i32> {
        let quality = *self.qualities.get(arm).ok_or(BanditError::ArmOutOfRange {
            index: arm,
            arms: self.qualities.len(),
        })?;
        let noisy = match &self.noise {
            Some(normal) => (quality + normal.sample(&mut self.rng)).clamp(0.0, 1.0),
            None => quality,
        };
        Ok(self.bounds.quantize(noisy))
    }
}

impl RewardSource for SimulatedFeedback {
    fn observe(&mut self, arm: ArmIndex, label: &str) -> BanditResult<Observation> {
        let rating = self.sample_rating(arm)?;
        debug!(arm, label, rating, "Simulated rating");
        Ok(Observation::Rating(rating))
    }

    fn mode(&self) -> RunMode {
        RunMode::Simulated
    }
}

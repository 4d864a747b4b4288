//! Thompson Sampling engine over Beta-distributed arm beliefs.
//!
//! Each arm's normalized quality in `[0, 1]` is modeled as `Beta(alpha, beta)`
//! starting from the uniform prior `Beta(1, 1)`. A rating `r` on the domain
//! `[min, max]` is normalized to `r' = (r - min) / (max - min)` and counted as a
//! fractional success: `alpha += r'`, `beta += 1 - r'`.
//!
//! The engine never owns a random generator; callers thread one through
//! `select` and `confidence_bounds` so runs are reproducible from a seed.

use cinebandit_core::config::IntervalConfig;
use cinebandit_core::{ArmIndex, BanditError, BanditResult, RatingBounds, SelectionPolicy};
use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::Serialize;
use tracing::debug;

/// Outcome of a selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Selected(ArmIndex),
    /// Single-shot policy only: every arm has been rated.
    Exhausted,
}

/// Belief and rating accumulators for one catalog item.
#[derive(Debug, Clone, Serialize)]
pub struct ArmState {
    pub index: ArmIndex,
    pub alpha: f64,
    pub beta: f64,
    pub rating_sum: f64,
    pub rating_count: u64,
    pub rated: bool,
}

impl ArmState {
    fn new(index: ArmIndex) -> Self {
        Self {
            index,
            alpha: 1.0,
            beta: 1.0,
            rating_sum: 0.0,
            rating_count: 0,
            rated: false,
        }
    }

    pub fn is_observed(&self) -> bool {
        self.rating_count > 0
    }
}

/// Monte Carlo credible interval parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CredibleInterval {
    pub lower_pct: f64,
    pub upper_pct: f64,
    pub samples: usize,
}

impl Default for CredibleInterval {
    fn default() -> Self {
        Self {
            lower_pct: 2.5,
            upper_pct: 97.5,
            samples: 1000,
        }
    }
}

impl From<&IntervalConfig> for CredibleInterval {
    fn from(config: &IntervalConfig) -> Self {
        Self {
            lower_pct: config.lower_percentile,
            upper_pct: config.upper_percentile,
            samples: config.samples,
        }
    }
}

pub struct ThompsonEngine {
    arms: Vec<ArmState>,
    policy: SelectionPolicy,
    bounds: RatingBounds,
    total_pulls: u64,
}

impl ThompsonEngine {
    pub fn new(n_arms: usize, policy: SelectionPolicy, bounds: RatingBounds) -> BanditResult<Self> {
        if n_arms < 1 {
            return Err(BanditError::InvalidConfiguration(
                "bandit engine needs at least one arm".into(),
            ));
        }
        Ok(Self {
            arms: (0..n_arms).map(ArmState::new).collect(),
            policy,
            bounds,
            total_pulls: 0,
        })
    }

    /// Pick the next arm to present.
    ///
    /// Draws one sample per eligible arm from its posterior and returns the
    /// arm with the largest sample; ties go to the lowest index. Under the
    /// single-shot policy an arm that has never been observed is chosen
    /// uniformly at random before any posterior is consulted.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Selection {
        let eligible: Vec<ArmIndex> = self
            .arms
            .iter()
            .filter(|a| self.is_eligible(a))
            .map(|a| a.index)
            .collect();

        if eligible.is_empty() {
            debug!(total_pulls = self.total_pulls, "All arms rated");
            return Selection::Exhausted;
        }

        if self.policy == SelectionPolicy::SingleShot {
            let unobserved: Vec<ArmIndex> = eligible
                .iter()
                .copied()
                .filter(|&i| !self.arms[i].is_observed())
                .collect();
            if !unobserved.is_empty() {
                let arm = unobserved[rng.gen_range(0..unobserved.len())];
                debug!(arm, candidates = unobserved.len(), "Exploring unobserved arm");
                return Selection::Selected(arm);
            }
        }

        let mut best_sample = f64::NEG_INFINITY;
        let mut best_arm = eligible[0];
        for &i in &eligible {
            let arm = &self.arms[i];
            let sample = Self::sample_beta(rng, arm.alpha, arm.beta);
            if sample > best_sample {
                best_sample = sample;
                best_arm = i;
            }
        }

        debug!(arm = best_arm, sample = best_sample, "Thompson selection");
        Selection::Selected(best_arm)
    }

    /// Fold one observed rating into the arm's posterior.
    ///
    /// Returns the normalized reward in `[0, 1]`.
    pub fn update(&mut self, arm: ArmIndex, raw_reward: i32) -> BanditResult<f64> {
        let n_arms = self.arms.len();
        let policy = self.policy;
        let bounds = self.bounds;

        let state = self.arms.get_mut(arm).ok_or(BanditError::ArmOutOfRange {
            index: arm,
            arms: n_arms,
        })?;
        if policy == SelectionPolicy::SingleShot && state.rated {
            return Err(BanditError::AlreadyRated(arm));
        }
        if !bounds.contains(raw_reward) {
            return Err(BanditError::RewardOutOfRange {
                reward: raw_reward,
                min: bounds.min(),
                max: bounds.max(),
            });
        }

        let reward = bounds.normalize(raw_reward);
        state.alpha += reward;
        state.beta += 1.0 - reward;
        state.rating_sum += raw_reward as f64;
        state.rating_count += 1;
        if policy == SelectionPolicy::SingleShot {
            state.rated = true;
        }
        self.total_pulls += 1;

        debug!(
            arm,
            rating = raw_reward,
            reward,
            alpha = state.alpha,
            beta = state.beta,
            "Arm updated"
        );
        Ok(reward)
    }

    /// Average raw rating, or 0 for an arm that has never been observed.
    pub fn mean_rating(&self, arm: ArmIndex) -> BanditResult<f64> {
        let state = self.arm_checked(arm)?;
        Ok(Self::mean_of(state))
    }

    pub fn mean_ratings(&self) -> Vec<f64> {
        self.arms.iter().map(Self::mean_of).collect()
    }

    /// Posterior mean `alpha / (alpha + beta)` of the normalized quality.
    pub fn posterior_mean(&self, arm: ArmIndex) -> BanditResult<f64> {
        let state = self.arm_checked(arm)?;
        Ok(state.alpha / (state.alpha + state.beta))
    }

    /// Empirical credible interval on the normalized quality.
    ///
    /// Draws `interval.samples` values from the arm's posterior and reports
    /// the requested percentiles. Unobserved arms report `(0, 0)`.
    pub fn confidence_bounds<R: Rng + ?Sized>(
        &self,
        arm: ArmIndex,
        interval: &CredibleInterval,
        rng: &mut R,
    ) -> BanditResult<(f64, f64)> {
        let state = self.arm_checked(arm)?;
        if !state.is_observed() || interval.samples == 0 {
            return Ok((0.0, 0.0));
        }

        let mut samples: Vec<f64> = (0..interval.samples)
            .map(|_| Self::sample_beta(rng, state.alpha, state.beta))
            .collect();
        samples.sort_by(|a, b| a.total_cmp(b));

        Ok((
            percentile(&samples, interval.lower_pct),
            percentile(&samples, interval.upper_pct),
        ))
    }

    /// Arm with the highest mean rating; lowest index wins ties.
    pub fn best_arm(&self) -> (ArmIndex, f64) {
        let mut best = (0, Self::mean_of(&self.arms[0]));
        for arm in &self.arms[1..] {
            let mean = Self::mean_of(arm);
            if mean > best.1 {
                best = (arm.index, mean);
            }
        }
        best
    }

    pub fn arms(&self) -> &[ArmState] {
        &self.arms
    }

    pub fn arm(&self, arm: ArmIndex) -> Option<&ArmState> {
        self.arms.get(arm)
    }

    pub fn n_arms(&self) -> usize {
        self.arms.len()
    }

    pub fn total_pulls(&self) -> u64 {
        self.total_pulls
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn bounds(&self) -> RatingBounds {
        self.bounds
    }

    pub fn rated_count(&self) -> usize {
        self.arms.iter().filter(|a| a.rated).count()
    }

    pub fn is_exhausted(&self) -> bool {
        !self.arms.iter().any(|a| self.is_eligible(a))
    }

    fn is_eligible(&self, arm: &ArmState) -> bool {
        match self.policy {
            SelectionPolicy::Repeatable => true,
            SelectionPolicy::SingleShot => !arm.rated,
        }
    }

    fn arm_checked(&self, arm: ArmIndex) -> BanditResult<&ArmState> {
        self.arms.get(arm).ok_or(BanditError::ArmOutOfRange {
            index: arm,
            arms: self.arms.len(),
        })
    }

    fn mean_of(state: &ArmState) -> f64 {
        if state.rating_count > 0 {
            state.rating_sum / state.rating_count as f64
        } else {
            0.0
        }
    }

    fn sample_beta<R: Rng + ?Sized>(rng: &mut R, alpha: f64, beta: f64) -> f64 {
        match Beta::new(alpha, beta) {
            Ok(dist) => dist.sample(rng),
            Err(_) => alpha / (alpha + beta),
        }
    }
}

/// Percentile of sorted data with linear interpolation between order statistics.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (pct.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine(n: usize, policy: SelectionPolicy) -> ThompsonEngine {
        ThompsonEngine::new(n, policy, RatingBounds::default()).unwrap()
    }

    fn selected(selection: Selection) -> ArmIndex {
        match selection {
            Selection::Selected(i) => i,
            Selection::Exhausted => panic!("unexpected exhaustion"),
        }
    }

    #[test]
    fn test_zero_arms_rejected() {
        let err = ThompsonEngine::new(0, SelectionPolicy::Repeatable, RatingBounds::default())
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_fresh_engine_reports_zero_means() {
        for n in 1..=6 {
            let e = engine(n, SelectionPolicy::Repeatable);
            for i in 0..n {
                assert_eq!(e.mean_rating(i).unwrap(), 0.0);
                let arm = e.arm(i).unwrap();
                assert_eq!((arm.alpha, arm.beta), (1.0, 1.0));
            }
            assert_eq!(e.best_arm(), (0, 0.0));
            assert_eq!(e.total_pulls(), 0);
        }
    }

    #[test]
    fn test_midpoint_update() {
        let mut e = engine(3, SelectionPolicy::Repeatable);
        let reward = e.update(0, 3).unwrap();
        assert!((reward - 0.5).abs() < f64::EPSILON);
        let arm = e.arm(0).unwrap();
        assert!((arm.alpha - 1.5).abs() < f64::EPSILON);
        assert!((arm.beta - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_max_and_min_ratings_accumulate() {
        let mut e = engine(2, SelectionPolicy::Repeatable);
        for _ in 0..7 {
            e.update(0, 5).unwrap();
            e.update(1, 1).unwrap();
        }
        let a = e.arm(0).unwrap();
        assert_eq!((a.alpha, a.beta), (8.0, 1.0));
        let b = e.arm(1).unwrap();
        assert_eq!((b.alpha, b.beta), (1.0, 8.0));
        assert_eq!(e.total_pulls(), 14);
    }

    #[test]
    fn test_parameter_mass_grows_by_one_per_update() {
        let mut e = engine(4, SelectionPolicy::Repeatable);
        let ratings = [1, 4, 2, 5, 3, 3, 4, 1, 2, 5, 5];
        for (t, &r) in ratings.iter().enumerate() {
            e.update(t % 4, r).unwrap();
        }
        for arm in e.arms() {
            let expected = 2.0 + arm.rating_count as f64;
            assert!((arm.alpha + arm.beta - expected).abs() < 1e-9);
            assert!(arm.alpha >= 1.0 && arm.beta >= 1.0);
        }
    }

    #[test]
    fn test_update_contract_violations() {
        let mut e = engine(2, SelectionPolicy::SingleShot);
        assert!(matches!(
            e.update(5, 3),
            Err(BanditError::ArmOutOfRange { index: 5, arms: 2 })
        ));
        assert!(matches!(
            e.update(0, 9),
            Err(BanditError::RewardOutOfRange { reward: 9, .. })
        ));
        e.update(0, 4).unwrap();
        let err = e.update(0, 4).unwrap_err();
        assert!(matches!(err, BanditError::AlreadyRated(0)));
        assert!(err.is_contract_violation());
        // Failed updates leave state untouched.
        assert_eq!(e.total_pulls(), 1);
        assert_eq!(e.arm(0).unwrap().rating_count, 1);
    }

    #[test]
    fn test_repeatable_allows_rerating() {
        let mut e = engine(1, SelectionPolicy::Repeatable);
        e.update(0, 2).unwrap();
        e.update(0, 4).unwrap();
        assert_eq!(e.mean_rating(0).unwrap(), 3.0);
        assert!(!e.arm(0).unwrap().rated);
        assert!(!e.is_exhausted());
    }

    #[test]
    fn test_single_shot_never_repeats_and_exhausts() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut e = engine(5, SelectionPolicy::SingleShot);
        let mut seen = Vec::new();
        for _ in 0..5 {
            let arm = selected(e.select(&mut rng));
            assert!(!seen.contains(&arm));
            assert!(!e.arm(arm).unwrap().rated);
            seen.push(arm);
            e.update(arm, 3).unwrap();
        }
        assert_eq!(e.select(&mut rng), Selection::Exhausted);
        assert!(e.is_exhausted());
        assert_eq!(e.rated_count(), 5);
    }

    #[test]
    fn test_single_shot_only_returns_unobserved_arms() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut e = engine(6, SelectionPolicy::SingleShot);
        e.update(0, 5).unwrap();
        e.update(2, 5).unwrap();
        e.update(4, 1).unwrap();
        for _ in 0..500 {
            let arm = selected(e.select(&mut rng));
            assert!(!e.arm(arm).unwrap().is_observed(), "picked observed arm {arm}");
        }
    }

    #[test]
    fn test_single_shot_exploration_is_uniform() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut e = engine(4, SelectionPolicy::SingleShot);
        e.update(3, 5).unwrap();
        let mut counts = [0usize; 4];
        for _ in 0..3000 {
            counts[selected(e.select(&mut rng))] += 1;
        }
        assert_eq!(counts[3], 0);
        for &c in &counts[..3] {
            assert!(c > 850 && c < 1150, "skewed exploration: {counts:?}");
        }
    }

    #[test]
    fn test_thompson_prefers_strong_arm() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut e = engine(2, SelectionPolicy::Repeatable);
        for _ in 0..20 {
            e.update(0, 1).unwrap();
            e.update(1, 5).unwrap();
        }
        for _ in 0..100 {
            assert_eq!(e.select(&mut rng), Selection::Selected(1));
        }
    }

    #[test]
    fn test_selection_reproducible_with_same_seed() {
        let mut a = engine(5, SelectionPolicy::Repeatable);
        let mut b = engine(5, SelectionPolicy::Repeatable);
        for (arm, r) in [(0, 2), (1, 4), (2, 3), (3, 5), (4, 1)] {
            a.update(arm, r).unwrap();
            b.update(arm, r).unwrap();
        }
        let mut rng_a = StdRng::seed_from_u64(2024);
        let mut rng_b = StdRng::seed_from_u64(2024);
        let picks_a: Vec<_> = (0..50).map(|_| a.select(&mut rng_a)).collect();
        let picks_b: Vec<_> = (0..50).map(|_| b.select(&mut rng_b)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_confidence_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut e = engine(2, SelectionPolicy::Repeatable);
        for _ in 0..30 {
            e.update(0, 5).unwrap();
        }
        let interval = CredibleInterval::default();
        let (lo, hi) = e.confidence_bounds(0, &interval, &mut rng).unwrap();
        assert!(0.0 <= lo && lo <= hi && hi <= 1.0);
        assert!(lo > 0.8, "Beta(31, 1) lower bound too low: {lo}");

        assert_eq!(e.confidence_bounds(1, &interval, &mut rng).unwrap(), (0.0, 0.0));
        assert!(e.confidence_bounds(2, &interval, &mut rng).is_err());
    }

    #[test]
    fn test_best_arm_ties_go_to_lowest_index() {
        let mut e = engine(4, SelectionPolicy::Repeatable);
        e.update(1, 4).unwrap();
        e.update(2, 4).unwrap();
        e.update(3, 2).unwrap();
        assert_eq!(e.best_arm(), (1, 4.0));
    }

    #[test]
    fn test_posterior_mean() {
        let mut e = engine(1, SelectionPolicy::Repeatable);
        assert!((e.posterior_mean(0).unwrap() - 0.5).abs() < f64::EPSILON);
        e.update(0, 5).unwrap();
        assert!((e.posterior_mean(0).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.0), 0.0);
        assert_eq!(percentile(&data, 100.0), 4.0);
        assert!((percentile(&data, 50.0) - 2.0).abs() < 1e-12);
        assert!((percentile(&data, 12.5) - 0.5).abs() < 1e-12);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}

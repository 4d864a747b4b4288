//! Per-movie statistics and rankings derived from the rating log and the
//! engine's posterior state. Nothing here mutates either input.

use cinebandit_core::{ArmIndex, BanditResult, Catalog, RoundRecord};
use cinebandit_rl_engine::{CredibleInterval, ThompsonEngine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize)]
pub struct ArmReport {
    pub arm_index: ArmIndex,
    pub label: String,
    pub selections: usize,
    pub selection_ratio: f64,
    /// Mean of the logged ratings.
    pub avg_rating: f64,
    /// Population standard deviation; 0 with fewer than two ratings.
    pub std_rating: f64,
    pub n_ratings: usize,
    /// Mean rating as tracked by the engine.
    pub engine_mean_rating: f64,
    pub posterior_mean: f64,
    /// Credible interval on the normalized quality in `[0, 1]`.
    pub credible_lower: f64,
    pub credible_upper: f64,
    pub popularity_score: f64,
}

/// Statistics for every movie selected at least once, in arm order.
pub fn arm_reports<R: Rng + ?Sized>(
    records: &[RoundRecord],
    engine: &ThompsonEngine,
    catalog: &Catalog,
    interval: &CredibleInterval,
    rng: &mut R,
) -> BanditResult<Vec<ArmReport>> {
    let total = records.len();
    let mut ratings: Vec<Vec<f64>> = vec![Vec::new(); engine.n_arms()];
    for record in records {
        if let Some(bucket) = ratings.get_mut(record.arm_index) {
            bucket.push(record.rating as f64);
        }
    }

    let mut reports = Vec::new();
    for (arm, arm_ratings) in ratings.iter().enumerate() {
        let selections = arm_ratings.len();
        if selections == 0 {
            continue;
        }
        let avg = mean(arm_ratings);
        let (credible_lower, credible_upper) = engine.confidence_bounds(arm, interval, rng)?;

        reports.push(ArmReport {
            arm_index: arm,
            label: catalog.label(arm).to_string(),
            selections,
            selection_ratio: selections as f64 / total as f64,
            avg_rating: avg,
            std_rating: population_std(arm_ratings, avg),
            n_ratings: selections,
            engine_mean_rating: engine.mean_rating(arm)?,
            posterior_mean: engine.posterior_mean(arm)?,
            credible_lower,
            credible_upper,
            popularity_score: avg * selections as f64 / total as f64,
        });
    }
    Ok(reports)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    #[default]
    MeanRating,
    Popularity,
}

impl fmt::Display for RankBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankBy::MeanRating => write!(f, "mean_rating"),
            RankBy::Popularity => write!(f, "popularity"),
        }
    }
}

impl FromStr for RankBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean_rating" | "mean-rating" | "rating" | "avg_rating" => Ok(RankBy::MeanRating),
            "popularity" | "popularity_score" => Ok(RankBy::Popularity),
            other => Err(format!(
                "unknown ranking '{other}', expected 'mean_rating' or 'popularity'"
            )),
        }
    }
}

/// Sort descending by the chosen key, keeping the lowest arm index first on
/// ties, and keep at most `top_n` entries.
pub fn rank(reports: &[ArmReport], by: RankBy, top_n: Option<usize>) -> Vec<ArmReport> {
    let key = |r: &ArmReport| match by {
        RankBy::MeanRating => r.avg_rating,
        RankBy::Popularity => r.popularity_score,
    };
    let mut ranked = reports.to_vec();
    ranked.sort_by(|a, b| {
        key(b)
            .total_cmp(&key(a))
            .then_with(|| a.arm_index.cmp(&b.arm_index))
    });
    if let Some(n) = top_n {
        ranked.truncate(n);
    }
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestArm {
    pub arm_index: ArmIndex,
    pub label: String,
    pub mean_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rounds: usize,
    pub average_reward: f64,
    pub cumulative_reward: f64,
    pub cumulative_regret: f64,
    pub best_arm: Option<BestArm>,
    pub most_selected: Option<(ArmIndex, usize)>,
}

pub fn summarize(
    records: &[RoundRecord],
    rewards: &[f64],
    regrets: &[f64],
    engine: &ThompsonEngine,
    catalog: &Catalog,
) -> RunSummary {
    let cumulative_reward: f64 = rewards.iter().sum();
    let best_arm = (engine.total_pulls() > 0).then(|| {
        let (arm_index, mean_rating) = engine.best_arm();
        BestArm {
            arm_index,
            label: catalog.label(arm_index).to_string(),
            mean_rating,
        }
    });

    let mut counts = vec![0usize; engine.n_arms()];
    for record in records {
        if let Some(c) = counts.get_mut(record.arm_index) {
            *c += 1;
        }
    }
    let most_selected = counts
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > 0)
        .fold(None, |best: Option<(ArmIndex, usize)>, (i, &c)| match best {
            Some((_, bc)) if bc >= c => best,
            _ => Some((i, c)),
        });

    RunSummary {
        rounds: records.len(),
        average_reward: if rewards.is_empty() {
            0.0
        } else {
            cumulative_reward / rewards.len() as f64
        },
        cumulative_reward,
        cumulative_regret: regrets.iter().sum(),
        best_arm,
        most_selected,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

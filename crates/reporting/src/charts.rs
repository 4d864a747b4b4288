//! Chart data for the two standard run plots, plus compact text renderings.
//!
//! Plotting backends are left to the caller; these types carry exactly the
//! series a plot needs and serialize to JSON for external tools.

use cinebandit_core::{ArmIndex, BanditResult, Catalog};
use cinebandit_rl_engine::{CredibleInterval, ThompsonEngine};
use rand::Rng;
use serde::Serialize;
use std::fmt::Write as _;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Running average reward and cumulative regret, one point per round.
#[derive(Debug, Clone, Serialize)]
pub struct RewardRegretChart {
    pub average_reward: Vec<f64>,
    pub cumulative_reward: Vec<f64>,
    pub cumulative_regret: Vec<f64>,
}

impl RewardRegretChart {
    pub fn from_series(rewards: &[f64], regrets: &[f64]) -> Self {
        let cumulative_reward = running_sum(rewards);
        let average_reward = cumulative_reward
            .iter()
            .enumerate()
            .map(|(t, total)| total / (t + 1) as f64)
            .collect();
        Self {
            average_reward,
            cumulative_reward,
            cumulative_regret: running_sum(regrets),
        }
    }

    pub fn len(&self) -> usize {
        self.average_reward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.average_reward.is_empty()
    }

    pub fn render_text(&self, width: usize) -> String {
        let mut out = String::new();
        let last = |v: &[f64]| v.last().copied().unwrap_or(0.0);
        let _ = writeln!(
            out,
            "Average reward    {}  {:.3}",
            sparkline(&self.average_reward, width),
            last(self.average_reward.as_slice())
        );
        let _ = writeln!(
            out,
            "Cumulative regret {}  {:.3}",
            sparkline(&self.cumulative_regret, width),
            last(self.cumulative_regret.as_slice())
        );
        out
    }
}

/// One movie's mean rating with its credible interval on the rating scale.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBar {
    pub arm_index: ArmIndex,
    pub label: String,
    pub mean_rating: f64,
    /// False until the movie has at least one rating.
    pub observed: bool,
    pub lower: f64,
    pub upper: f64,
    /// Extent below the mean, never negative.
    pub err_below: f64,
    /// Extent above the mean, never negative.
    pub err_above: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBarChart {
    pub bars: Vec<ErrorBar>,
    pub y_min: f64,
    pub y_max: f64,
}

impl ErrorBarChart {
    /// Build bars for every arm. The posterior interval on the normalized
    /// quality is mapped onto the rating scale; unobserved arms keep the
    /// `(0, 0)` sentinel and a zero mean.
    pub fn from_engine<R: Rng + ?Sized>(
        engine: &ThompsonEngine,
        catalog: &Catalog,
        interval: &CredibleInterval,
        rng: &mut R,
    ) -> BanditResult<Self> {
        let bounds = engine.bounds();
        let mut bars = Vec::with_capacity(engine.n_arms());
        for arm in engine.arms() {
            let mean_rating = engine.mean_rating(arm.index)?;
            let (lo, hi) = engine.confidence_bounds(arm.index, interval, rng)?;
            let (lower, upper) = if arm.is_observed() {
                (bounds.denormalize(lo), bounds.denormalize(hi))
            } else {
                (0.0, 0.0)
            };
            bars.push(ErrorBar {
                arm_index: arm.index,
                label: catalog.label(arm.index).to_string(),
                mean_rating,
                observed: arm.is_observed(),
                lower,
                upper,
                err_below: (mean_rating - lower).max(0.0),
                err_above: (upper - mean_rating).max(0.0),
            });
        }
        Ok(Self {
            bars,
            y_min: bounds.min() as f64,
            y_max: bounds.max() as f64,
        })
    }

    /// One line per movie: `label  mean  [lower, upper]  |--o--|`.
    pub fn render_text(&self, width: usize) -> String {
        let label_width = self
            .bars
            .iter()
            .map(|b| b.label.chars().count())
            .max()
            .unwrap_or(0)
            .min(40);
        let span = (self.y_max - self.y_min).max(f64::EPSILON);
        let width = width.max(2);
        let col = |v: f64| {
            let frac = ((v - self.y_min) / span).clamp(0.0, 1.0);
            (frac * (width - 1) as f64).round() as usize
        };

        let mut out = String::new();
        for bar in &self.bars {
            let label: String = bar.label.chars().take(label_width).collect();
            let mut track = vec![' '; width];
            if bar.observed {
                let (lo, hi) = (col(bar.lower), col(bar.upper));
                for c in track.iter_mut().take(hi + 1).skip(lo) {
                    *c = '-';
                }
                track[lo] = '|';
                track[hi] = '|';
                track[col(bar.mean_rating)] = 'o';
            }
            let _ = writeln!(
                out,
                "{label:<label_width$}  {:>4.2}  [{:.2}, {:.2}]  {}",
                bar.mean_rating,
                bar.lower,
                bar.upper,
                track.into_iter().collect::<String>()
            );
        }
        out
    }
}

fn running_sum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Scale a series onto eight block heights, resampled to at most `width` cells.
pub fn sparkline(values: &[f64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }
    let cells = width.min(values.len());
    let picked: Vec<f64> = (0..cells)
        .map(|i| values[i * (values.len() - 1) / (cells - 1).max(1)])
        .collect();
    let min = picked.iter().copied().fold(f64::INFINITY, f64::min);
    let max = picked.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    picked
        .iter()
        .map(|v| {
            if range <= f64::EPSILON {
                SPARK_LEVELS[SPARK_LEVELS.len() / 2]
            } else {
                let level = ((v - min) / range * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            }
        })
        .collect()
}

//! Per-round reward, regret and choice series.

use cinebandit_core::ArmIndex;
use serde::{Deserialize, Serialize};

/// Three equal-length series indexed by round.
///
/// Regret is measured against the best possible rating:
/// `regret[t] = 1 - reward[t]`, where `reward[t]` is the normalized rating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub rewards: Vec<f64>,
    pub regrets: Vec<f64>,
    pub chosen_arms: Vec<ArmIndex>,
}

impl MetricSeries {
    pub fn with_capacity(rounds: usize) -> Self {
        Self {
            rewards: Vec::with_capacity(rounds),
            regrets: Vec::with_capacity(rounds),
            chosen_arms: Vec::with_capacity(rounds),
        }
    }

    pub fn push(&mut self, arm: ArmIndex, normalized_reward: f64) {
        let reward = normalized_reward.clamp(0.0, 1.0);
        self.rewards.push(reward);
        self.regrets.push(1.0 - reward);
        self.chosen_arms.push(arm);
    }

    pub fn len(&self) -> usize {
        self.chosen_arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chosen_arms.is_empty()
    }

    pub fn cumulative_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    pub fn cumulative_regret(&self) -> f64 {
        self.regrets.iter().sum()
    }

    pub fn average_reward(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.cumulative_reward() / self.len() as f64
        }
    }
}

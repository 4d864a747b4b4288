//! Experiment driver: runs the select → observe → update loop.
//!
//! Lifecycle is `Ready → Running → Done`. A run ends when the planned number
//! of rounds is reached, when the single-shot policy has no arm left, or when
//! the rating source stops. Every early end keeps the rounds played so far.

use crate::series::MetricSeries;
use chrono::{DateTime, Utc};
use cinebandit_core::config::ExperimentConfig;
use cinebandit_core::{
    BanditError, BanditResult, Catalog, RatingBounds, RoundRecord, SelectionPolicy, StopReason,
};
use cinebandit_feedback::{Observation, RewardSource};
use cinebandit_rl_engine::{Selection, ThompsonEngine};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Ready,
    Running,
    Done,
}

/// Number of rounds a run will attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    pub rounds: usize,
    pub requested: usize,
    /// Set when the request exceeded what the policy can deliver.
    pub clamped_from: Option<usize>,
}

impl RunPlan {
    pub fn new(requested: usize, catalog_len: usize, policy: SelectionPolicy) -> BanditResult<Self> {
        if requested == 0 {
            return Err(BanditError::InvalidConfiguration(
                "round count must be positive".into(),
            ));
        }
        if policy == SelectionPolicy::SingleShot && requested > catalog_len {
            warn!(
                requested,
                catalog_len, "Round count exceeds catalog size, clamping"
            );
            return Ok(Self {
                rounds: catalog_len,
                requested,
                clamped_from: Some(requested),
            });
        }
        Ok(Self {
            rounds: requested,
            requested,
            clamped_from: None,
        })
    }
}

/// Observer hooks invoked by the driver while a run is in progress.
pub trait ProgressSink {
    fn on_round(&mut self, _record: &RoundRecord, _plan: &RunPlan) {}

    /// Called every `stats_interval` completed rounds.
    fn on_interim(&mut self, _engine: &ThompsonEngine, _catalog: &Catalog, _records: &[RoundRecord]) {
    }
}

/// Sink that ignores all progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub plan: RunPlan,
    pub records: Vec<RoundRecord>,
    pub series: MetricSeries,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn rounds_completed(&self) -> usize {
        self.records.len()
    }
}

pub struct Experiment {
    run_id: Uuid,
    catalog: Catalog,
    engine: ThompsonEngine,
    plan: RunPlan,
    stats_interval: usize,
    state: RunState,
}

impl Experiment {
    pub fn new(
        catalog: Catalog,
        policy: SelectionPolicy,
        bounds: RatingBounds,
        requested_rounds: usize,
        stats_interval: usize,
    ) -> BanditResult<Self> {
        if stats_interval == 0 {
            return Err(BanditError::InvalidConfiguration(
                "stats_interval must be positive".into(),
            ));
        }
        let engine = ThompsonEngine::new(catalog.len(), policy, bounds)?;
        let plan = RunPlan::new(requested_rounds, catalog.len(), policy)?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            catalog,
            engine,
            plan,
            stats_interval,
            state: RunState::Ready,
        })
    }

    pub fn from_config(catalog: Catalog, config: &ExperimentConfig) -> BanditResult<Self> {
        Self::new(
            catalog,
            config.policy,
            config.rating_bounds()?,
            config.round_count,
            config.stats_interval,
        )
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read-only view of the engine, for reporting.
    pub fn engine(&self) -> &ThompsonEngine {
        &self.engine
    }

    /// Play the run. An experiment can only be run once.
    pub fn run<S, R, P>(
        &mut self,
        source: &mut S,
        rng: &mut R,
        progress: &mut P,
    ) -> BanditResult<RunOutcome>
    where
        S: RewardSource + ?Sized,
        R: Rng + ?Sized,
        P: ProgressSink + ?Sized,
    {
        if self.state != RunState::Ready {
            return Err(BanditError::InvalidConfiguration(
                "experiment has already been run".into(),
            ));
        }
        self.state = RunState::Running;
        info!(
            run_id = %self.run_id,
            arms = self.catalog.len(),
            rounds = self.plan.rounds,
            policy = %self.engine.policy(),
            mode = %source.mode(),
            "Experiment started"
        );

        let result = self.play(source, rng, progress);
        self.state = RunState::Done;

        match &result {
            Ok(outcome) => info!(
                run_id = %self.run_id,
                rounds = outcome.rounds_completed(),
                stop_reason = %outcome.stop_reason,
                average_reward = outcome.series.average_reward(),
                cumulative_regret = outcome.series.cumulative_regret(),
                "Experiment finished"
            ),
            Err(e) => warn!(run_id = %self.run_id, error = %e, "Experiment aborted"),
        }
        result
    }

    fn play<S, R, P>(
        &mut self,
        source: &mut S,
        rng: &mut R,
        progress: &mut P,
    ) -> BanditResult<RunOutcome>
    where
        S: RewardSource + ?Sized,
        R: Rng + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let started_at = Utc::now();
        let mut records = Vec::with_capacity(self.plan.rounds);
        let mut series = MetricSeries::with_capacity(self.plan.rounds);
        let mut stop_reason = StopReason::Completed;

        for t in 0..self.plan.rounds {
            let arm = match self.engine.select(rng) {
                Selection::Selected(arm) => arm,
                Selection::Exhausted => {
                    metrics::counter!("bandit.exhausted").increment(1);
                    info!(rounds = t, "All movies rated");
                    stop_reason = StopReason::Exhausted;
                    break;
                }
            };
            let label = self.catalog.label(arm).to_string();

            let rating = match source.observe(arm, &label)? {
                Observation::Rating(rating) => rating,
                Observation::Stopped => {
                    info!(rounds = t, "Rating source stopped");
                    stop_reason = StopReason::InputClosed;
                    break;
                }
            };

            let reward = self.engine.update(arm, rating)?;
            series.push(arm, reward);

            let record = RoundRecord {
                iteration: t + 1,
                arm_index: arm,
                label,
                rating,
                timestamp: Utc::now(),
            };
            debug!(
                iteration = record.iteration,
                arm,
                rating,
                reward,
                "Round complete"
            );
            metrics::counter!("bandit.rounds").increment(1);
            progress.on_round(&record, &self.plan);
            records.push(record);

            if records.len() % self.stats_interval == 0 {
                progress.on_interim(&self.engine, &self.catalog, &records);
            }
        }

        Ok(RunOutcome {
            run_id: self.run_id,
            plan: self.plan,
            records,
            series,
            stop_reason,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

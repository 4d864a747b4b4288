//! Terminal interaction around a run: the round-count prompt and interim
//! statistics printed while a person is rating.

use cinebandit_core::{Catalog, RoundRecord};
use cinebandit_experiment::{ProgressSink, RunPlan};
use cinebandit_feedback::interactive::is_quit;
use cinebandit_reporting::{arm_reports, rank, render, RankBy};
use cinebandit_rl_engine::{CredibleInterval, ThompsonEngine};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

const INTERIM_TOP: usize = 3;

/// Prints interim rankings every stats interval when enabled.
pub struct ConsoleProgress {
    enabled: bool,
    interval: CredibleInterval,
    rng: StdRng,
}

impl ConsoleProgress {
    pub fn new(enabled: bool, interval: CredibleInterval, seed: u64) -> Self {
        Self {
            enabled,
            interval,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_round(&mut self, record: &RoundRecord, plan: &RunPlan) {
        debug!(
            iteration = record.iteration,
            rounds = plan.rounds,
            movie = %record.label,
            rating = record.rating,
            "Round complete"
        );
    }

    fn on_interim(&mut self, engine: &ThompsonEngine, catalog: &Catalog, records: &[RoundRecord]) {
        if !self.enabled {
            return;
        }
        match arm_reports(records, engine, catalog, &self.interval, &mut self.rng) {
            Ok(reports) => {
                let top = rank(&reports, RankBy::MeanRating, Some(INTERIM_TOP));
                print!(
                    "{}",
                    render::render_interim(&top, records.len(), engine.bounds())
                );
            }
            Err(e) => warn!(error = %e, "Failed to compute interim statistics"),
        }
    }
}

/// Ask how many movies to rate on stdin.
pub fn ask_round_count() -> anyhow::Result<Option<usize>> {
    read_round_count(std::io::stdin().lock(), std::io::stdout())
}

/// Re-prompts until a positive integer is entered. `None` when input ends or
/// the user quits.
pub fn read_round_count<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
) -> anyhow::Result<Option<usize>> {
    loop {
        write!(writer, "\nHow many movies would you like to rate? (recommended: 10-20): ")?;
        writer.flush()?;
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || is_quit(&line) {
            return Ok(None);
        }
        match line.trim().parse::<usize>() {
            Ok(n) if n > 0 => return Ok(Some(n)),
            _ => writeln!(writer, "Please enter a positive whole number.")?,
        }
    }
}

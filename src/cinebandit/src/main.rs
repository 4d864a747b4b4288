//! cinebandit — movie recommendation experiment driven by Thompson Sampling.
//!
//! Loads a movie catalog, then repeatedly recommends a movie, collects a
//! simulated or typed rating, and reports what the bandit learned.

mod console;

use anyhow::Context;
use cinebandit_core::{AppConfig, Catalog, RunMode, SelectionPolicy};
use cinebandit_experiment::{Experiment, RunOutcome};
use cinebandit_feedback::{InteractiveFeedback, RewardSource, SimulatedFeedback};
use cinebandit_reporting::export::{self, RunExport, RunMetadata};
use cinebandit_reporting::{
    arm_reports, rank, render, summarize, ErrorBarChart, RankBy, RewardRegretChart,
};
use cinebandit_rl_engine::CredibleInterval;
use clap::Parser;
use console::ConsoleProgress;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cinebandit")]
#[command(about = "Thompson Sampling movie recommendation experiment")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CINEBANDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Movie catalog CSV with movieId and title columns (overrides config)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Keep only the first N movies of the catalog (overrides config)
    #[arg(long)]
    limit: Option<usize>,

    /// Number of recommendation rounds (overrides config)
    #[arg(short, long)]
    rounds: Option<usize>,

    /// Selection policy: repeatable or single_shot (overrides config)
    #[arg(long)]
    policy: Option<SelectionPolicy>,

    /// Rating source: simulated or interactive (overrides config)
    #[arg(long)]
    mode: Option<RunMode>,

    /// Seed for hidden qualities, noise and selection (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Lowest rating on the scale (overrides config)
    #[arg(long)]
    min_rating: Option<i32>,

    /// Highest rating on the scale (overrides config)
    #[arg(long)]
    max_rating: Option<i32>,

    /// Standard deviation of simulated rating noise (overrides config)
    #[arg(long)]
    noise_std: Option<f64>,

    /// Print interim statistics every K rounds (overrides config)
    #[arg(long)]
    stats_interval: Option<usize>,

    /// Write the rating log to this CSV file
    #[arg(long)]
    csv_out: Option<PathBuf>,

    /// Write run metadata and the rating log to this JSON file
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Write reward/regret and error-bar chart data to this JSON file
    #[arg(long)]
    charts_out: Option<PathBuf>,

    /// Rank final statistics by mean_rating or popularity
    #[arg(long)]
    rank_by: Option<RankBy>,

    /// Number of movies in the final ranking
    #[arg(long)]
    top: Option<usize>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[derive(Serialize)]
struct ChartExport<'a> {
    reward_regret: &'a RewardRegretChart,
    error_bars: &'a ErrorBarChart,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(&cli)?;
    config.validate()?;

    let catalog = Catalog::load(&config.catalog.path, config.catalog.limit)
        .with_context(|| format!("loading catalog {}", config.catalog.path.display()))?;

    println!("=== Movie recommendation system ===");
    println!("Movies available: {}", catalog.len());
    println!("\nCatalog:");
    for (i, title) in catalog.titles().enumerate() {
        println!("{:2}. {title}", i + 1);
    }

    let mut experiment_config = config.experiment.clone();
    if experiment_config.mode == RunMode::Interactive && cli.rounds.is_none() {
        println!("\n=== Interactive mode ===");
        println!(
            "You will rate movies from {} to {} stars.",
            experiment_config.rating_min, experiment_config.rating_max
        );
        match console::ask_round_count()? {
            Some(rounds) => experiment_config.round_count = rounds,
            None => {
                println!("No round count given, nothing to do.");
                return Ok(());
            }
        }
    }

    let mut experiment = Experiment::from_config(catalog, &experiment_config)?;
    if let Some(requested) = experiment.plan().clamped_from {
        println!(
            "Round count adjusted from {requested} to {} (one rating per movie).",
            experiment.plan().rounds
        );
    }

    let bounds = experiment_config.rating_bounds()?;
    let interval = CredibleInterval::from(&experiment_config.credible_interval);
    let seed = experiment_config.random_seed;
    let mut selection_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut report_rng = StdRng::seed_from_u64(seed.wrapping_add(2));

    let mut source: Box<dyn RewardSource> = match experiment_config.mode {
        RunMode::Simulated => Box::new(SimulatedFeedback::new(
            experiment.catalog().len(),
            &config.simulation,
            bounds,
            seed,
        )?),
        RunMode::Interactive => Box::new(InteractiveFeedback::new(
            std::io::stdin().lock(),
            std::io::stdout(),
            bounds,
        )),
    };

    let mut progress = ConsoleProgress::new(
        experiment_config.mode == RunMode::Interactive,
        interval,
        seed.wrapping_add(3),
    );
    let outcome = experiment.run(source.as_mut(), &mut selection_rng, &mut progress)?;

    println!(
        "\nRun finished: {} ({} rounds)",
        outcome.stop_reason,
        outcome.rounds_completed()
    );

    let engine = experiment.engine();
    let catalog = experiment.catalog();

    let summary = summarize(
        &outcome.records,
        &outcome.series.rewards,
        &outcome.series.regrets,
        engine,
        catalog,
    );
    println!("\n=== Summary ===");
    print!("{}", render::render_summary(&summary, catalog));

    let reward_chart =
        RewardRegretChart::from_series(&outcome.series.rewards, &outcome.series.regrets);
    let error_bars = ErrorBarChart::from_engine(engine, catalog, &interval, &mut report_rng)?;
    println!("\n=== Progress ===");
    print!("{}", reward_chart.render_text(60));
    println!("\n=== Estimated quality ===");
    print!("{}", error_bars.render_text(30));

    let rank_by = match cli.rank_by {
        Some(by) => by,
        None => config.output.rank_by.parse().unwrap_or_else(|e: String| {
            warn!(error = %e, "Falling back to mean rating ranking");
            RankBy::MeanRating
        }),
    };
    let top_n = cli.top.unwrap_or(config.output.top_n);
    let reports = arm_reports(&outcome.records, engine, catalog, &interval, &mut report_rng)?;
    println!("\n=== Movie statistics (by {rank_by}) ===");
    let ranked = rank(&reports, rank_by, Some(top_n));
    print!("{}", render::render_rankings(&ranked, bounds));

    if let Some(path) = cli.csv_out.or(config.output.csv_path.clone()) {
        export::save_csv(&path, &outcome.records)?;
        println!("\nRating log saved to {}", path.display());
    }
    if let Some(path) = cli.json_out.or(config.output.json_path.clone()) {
        let run_export = RunExport {
            metadata: metadata(
                &outcome,
                catalog.len(),
                experiment_config.policy,
                experiment_config.mode,
            ),
            ratings: outcome.records.clone(),
        };
        export::save_json(&path, &run_export)?;
        println!("Run export saved to {}", path.display());
    }
    if let Some(path) = cli.charts_out {
        let charts = ChartExport {
            reward_regret: &reward_chart,
            error_bars: &error_bars,
        };
        std::fs::write(&path, serde_json::to_string_pretty(&charts)?)
            .with_context(|| format!("writing chart data to {}", path.display()))?;
        println!("Chart data saved to {}", path.display());
    }

    info!(run_id = %outcome.run_id, "Done");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,cinebandit=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(Some(path.as_path()))
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config from environment, using defaults");
            AppConfig::default()
        }),
    };

    // Apply CLI overrides
    if let Some(path) = &cli.catalog {
        config.catalog.path = path.clone();
    }
    if let Some(limit) = cli.limit {
        config.catalog.limit = Some(limit);
    }
    if let Some(rounds) = cli.rounds {
        config.experiment.round_count = rounds;
    }
    if let Some(policy) = cli.policy {
        config.experiment.policy = policy;
    }
    if let Some(mode) = cli.mode {
        config.experiment.mode = mode;
    }
    if let Some(seed) = cli.seed {
        config.experiment.random_seed = seed;
    }
    if let Some(min) = cli.min_rating {
        config.experiment.rating_min = min;
    }
    if let Some(max) = cli.max_rating {
        config.experiment.rating_max = max;
    }
    if let Some(noise) = cli.noise_std {
        config.simulation.noise_std = noise;
    }
    if let Some(interval) = cli.stats_interval {
        config.experiment.stats_interval = interval;
    }

    info!(
        catalog = %config.catalog.path.display(),
        rounds = config.experiment.round_count,
        policy = %config.experiment.policy,
        mode = %config.experiment.mode,
        seed = config.experiment.random_seed,
        "Configuration loaded"
    );
    Ok(config)
}

fn metadata(
    outcome: &RunOutcome,
    item_count: usize,
    policy: SelectionPolicy,
    mode: RunMode,
) -> RunMetadata {
    RunMetadata {
        run_id: outcome.run_id,
        started_at: outcome.started_at,
        finished_at: outcome.finished_at,
        item_count,
        round_count: outcome.rounds_completed(),
        requested_rounds: outcome.plan.requested,
        policy,
        mode,
        stop_reason: outcome.stop_reason,
    }
}

//! End-to-end runs: catalog, simulated ratings, engine and exports together.

#[cfg(test)]
mod tests {
    use cinebandit_core::config::SimulationConfig;
    use cinebandit_core::{Catalog, RatingBounds, RunMode, SelectionPolicy, StopReason};
    use cinebandit_experiment::{Experiment, NoProgress, RunOutcome};
    use cinebandit_feedback::SimulatedFeedback;
    use cinebandit_reporting::export::{self, RatingLogEntry, RunExport, RunMetadata};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const MOVIES: &str = "movieId,title,genres\n\
        1,Toy Story (1995),Animation\n\
        2,Jumanji (1995),Adventure\n\
        3,Heat (1995),Action\n\
        4,\"American President, The (1995)\",Comedy\n\
        5,Casino (1995),Crime\n";

    fn catalog(limit: Option<usize>) -> Catalog {
        Catalog::from_reader(MOVIES.as_bytes(), limit).unwrap()
    }

    fn simulated_run(
        limit: usize,
        policy: SelectionPolicy,
        rounds: usize,
        seed: u64,
    ) -> (Experiment, RunOutcome) {
        let bounds = RatingBounds::default();
        let mut experiment =
            Experiment::new(catalog(Some(limit)), policy, bounds, rounds, 5).unwrap();
        let mut source =
            SimulatedFeedback::new(limit, &SimulationConfig::default(), bounds, seed).unwrap();
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        let outcome = experiment.run(&mut source, &mut rng, &mut NoProgress).unwrap();
        (experiment, outcome)
    }

    fn posteriors(experiment: &Experiment) -> Vec<(f64, f64)> {
        experiment
            .engine()
            .arms()
            .iter()
            .map(|a| (a.alpha, a.beta))
            .collect()
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let (first, a) = simulated_run(3, SelectionPolicy::Repeatable, 10, 42);
        let (second, b) = simulated_run(3, SelectionPolicy::Repeatable, 10, 42);

        assert_eq!(a.stop_reason, StopReason::Completed);
        assert_eq!(a.series.chosen_arms.len(), 10);
        assert_eq!(a.series.chosen_arms, b.series.chosen_arms);
        assert_eq!(a.series.rewards, b.series.rewards);
        assert_eq!(posteriors(&first), posteriors(&second));

        let ratings_a: Vec<_> = a.records.iter().map(|r| r.rating).collect();
        let ratings_b: Vec<_> = b.records.iter().map(|r| r.rating).collect();
        assert_eq!(ratings_a, ratings_b);
    }

    #[test]
    fn test_posterior_counts_match_log() {
        let (experiment, outcome) = simulated_run(5, SelectionPolicy::Repeatable, 40, 7);
        let engine = experiment.engine();
        assert_eq!(engine.total_pulls(), 40);
        for arm in engine.arms() {
            let logged = outcome
                .records
                .iter()
                .filter(|r| r.arm_index == arm.index)
                .count() as u64;
            assert_eq!(arm.rating_count, logged);
            assert!((arm.alpha + arm.beta - (2.0 + logged as f64)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_shot_rates_each_movie_once() {
        let (experiment, outcome) = simulated_run(5, SelectionPolicy::SingleShot, 10, 3);

        assert_eq!(outcome.plan.rounds, 5);
        assert_eq!(outcome.plan.clamped_from, Some(10));
        assert_eq!(outcome.rounds_completed(), 5);
        assert_eq!(outcome.series.len(), 5);
        assert!(experiment.engine().is_exhausted());

        let mut arms = outcome.series.chosen_arms.clone();
        arms.sort_unstable();
        assert_eq!(arms, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_reward_and_regret_are_complementary() {
        let (_, outcome) = simulated_run(4, SelectionPolicy::Repeatable, 25, 11);
        let series = &outcome.series;
        assert_eq!(series.rewards.len(), series.regrets.len());
        for (reward, regret) in series.rewards.iter().zip(&series.regrets) {
            assert!((0.0..=1.0).contains(reward));
            assert!((0.0..=1.0).contains(regret));
            assert!((reward + regret - 1.0).abs() < 1e-12);
        }
        assert!(
            (series.cumulative_reward() + series.cumulative_regret() - 25.0).abs() < 1e-9
        );
    }

    #[test]
    fn test_iterations_are_sequential() {
        let (_, outcome) = simulated_run(5, SelectionPolicy::Repeatable, 12, 5);
        let iterations: Vec<_> = outcome.records.iter().map(|r| r.iteration).collect();
        assert_eq!(iterations, (1..=12).collect::<Vec<_>>());
        assert!(outcome
            .records
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_run_exports_round_trip() {
        let (experiment, outcome) = simulated_run(5, SelectionPolicy::Repeatable, 15, 21);
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("ratings.csv");
        export::save_csv(&csv_path, &outcome.records).unwrap();
        let loaded = export::load_csv(&csv_path).unwrap();
        let expected: Vec<RatingLogEntry> =
            outcome.records.iter().map(RatingLogEntry::from).collect();
        assert_eq!(loaded, expected);
        for (entry, record) in loaded.iter().zip(&outcome.records) {
            assert_eq!(entry.movie, experiment.catalog().label(record.arm_index));
        }

        let json_path = dir.path().join("run.json");
        let run = RunExport {
            metadata: RunMetadata {
                run_id: outcome.run_id,
                started_at: outcome.started_at,
                finished_at: outcome.finished_at,
                item_count: experiment.catalog().len(),
                round_count: outcome.rounds_completed(),
                requested_rounds: outcome.plan.requested,
                policy: SelectionPolicy::Repeatable,
                mode: RunMode::Simulated,
                stop_reason: outcome.stop_reason,
            },
            ratings: outcome.records.clone(),
        };
        export::save_json(&json_path, &run).unwrap();
        assert_eq!(export::load_json(&json_path).unwrap(), run);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(raw["metadata"]["round_count"], 15);
        assert_eq!(raw["ratings"].as_array().unwrap().len(), 15);
    }
}

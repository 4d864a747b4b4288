//! Console text for run summaries and ranked movie statistics.

use crate::stats::{ArmReport, RunSummary};
use cinebandit_core::{Catalog, RatingBounds};
use std::fmt::Write as _;

/// Ranked statistics block, one entry per movie.
pub fn render_rankings(ranked: &[ArmReport], bounds: RatingBounds) -> String {
    let mut out = String::new();
    for (pos, report) in ranked.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", pos + 1, report.label);
        let _ = writeln!(
            out,
            "   Average rating: {:.2}/{} {}",
            report.avg_rating,
            bounds.max(),
            bounds.stars(report.avg_rating)
        );
        let _ = writeln!(
            out,
            "   Ratings: {} (std {:.2}), selected {:.1}% of rounds",
            report.n_ratings,
            report.std_rating,
            report.selection_ratio * 100.0
        );
        let _ = writeln!(
            out,
            "   Credible interval: [{:.2}, {:.2}]  popularity {:.3}",
            bounds.denormalize(report.credible_lower),
            bounds.denormalize(report.credible_upper),
            report.popularity_score
        );
    }
    out
}

pub fn render_summary(summary: &RunSummary, catalog: &Catalog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Rounds played: {}", summary.rounds);
    let _ = writeln!(
        out,
        "Average reward: {:.3}   Cumulative regret: {:.3}",
        summary.average_reward, summary.cumulative_regret
    );
    if let Some(best) = &summary.best_arm {
        let _ = writeln!(
            out,
            "Best movie: {} ({:.2} average)",
            best.label, best.mean_rating
        );
    }
    if let Some((arm, count)) = summary.most_selected {
        let _ = writeln!(
            out,
            "Most recommended: {} ({} times)",
            catalog.label(arm),
            count
        );
    }
    out
}

/// Short progress block: the top entries of an already ranked list.
pub fn render_interim(ranked: &[ArmReport], rounds: usize, bounds: RatingBounds) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n--- After {rounds} rounds ---");
    for report in ranked {
        let _ = writeln!(
            out,
            "  {} {}  {:.2} avg over {} rating(s)",
            bounds.stars(report.avg_rating),
            report.label,
            report.avg_rating,
            report.n_ratings
        );
    }
    out
}

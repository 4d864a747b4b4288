use crate::error::{BanditError, BanditResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dense 0-based position of an item in the catalog.
pub type ArmIndex = usize;

/// Inclusive integer rating domain, e.g. 1..=5 stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingBounds {
    min: i32,
    max: i32,
}

impl RatingBounds {
    pub const DEFAULT_MIN: i32 = 1;
    pub const DEFAULT_MAX: i32 = 5;
    /// Widest domain drawn one star per level; wider domains are scaled.
    pub const MAX_STAR_CELLS: usize = 10;

    pub fn new(min: i32, max: i32) -> BanditResult<Self> {
        if min >= max {
            return Err(BanditError::InvalidConfiguration(format!(
                "rating bounds must satisfy min < max, got [{min}, {max}]"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn span(&self) -> f64 {
        (self.max as i64 - self.min as i64) as f64
    }

    pub fn contains(&self, rating: i32) -> bool {
        (self.min..=self.max).contains(&rating)
    }

    /// Map a raw rating onto [0, 1].
    pub fn normalize(&self, rating: i32) -> f64 {
        (rating as i64 - self.min as i64) as f64 / self.span()
    }

    /// Map a value in [0, 1] back onto the continuous rating scale.
    pub fn denormalize(&self, value: f64) -> f64 {
        self.min as f64 + value * self.span()
    }

    /// Nearest integer rating for a quality in [0, 1], clamped to the domain.
    pub fn quantize(&self, value: f64) -> i32 {
        let rating = self.denormalize(value.clamp(0.0, 1.0)).round() as i32;
        rating.clamp(self.min, self.max)
    }

    /// Number of distinct ratings in the domain.
    pub fn levels(&self) -> usize {
        (self.max as i64 - self.min as i64 + 1) as usize
    }

    /// Whether every level gets its own star.
    pub fn has_star_scale(&self) -> bool {
        self.levels() <= Self::MAX_STAR_CELLS
    }

    /// Star string for a (possibly fractional) rating, e.g. `★★★☆☆` for 3 on 1..=5.
    /// Domains wider than `MAX_STAR_CELLS` levels are scaled onto that many stars.
    pub fn stars(&self, rating: f64) -> String {
        let (levels, filled) = if self.has_star_scale() {
            let levels = self.levels() as i64;
            (levels, (rating.round() as i64 - self.min as i64 + 1).clamp(0, levels))
        } else {
            let levels = Self::MAX_STAR_CELLS as i64;
            let frac = ((rating - self.min as f64) / self.span()).clamp(0.0, 1.0);
            (levels, (frac * levels as f64).round() as i64)
        };
        let mut out = "★".repeat(filled as usize);
        out.push_str(&"☆".repeat((levels - filled) as usize));
        out
    }
}

impl Default for RatingBounds {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

/// Which arms remain eligible for selection during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Every arm may be selected any number of times.
    #[default]
    Repeatable,
    /// Each arm is rated at most once; the run ends when all are rated.
    SingleShot,
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::Repeatable => write!(f, "repeatable"),
            SelectionPolicy::SingleShot => write!(f, "single_shot"),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "repeatable" | "repeat" => Ok(SelectionPolicy::Repeatable),
            "single_shot" | "single-shot" | "singleshot" | "once" => {
                Ok(SelectionPolicy::SingleShot)
            }
            other => Err(format!(
                "unknown policy '{other}', expected 'repeatable' or 'single_shot'"
            )),
        }
    }
}

/// Where ratings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Simulated,
    Interactive,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Simulated => write!(f, "simulated"),
            RunMode::Interactive => write!(f, "interactive"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "simulation" | "auto" | "1" => Ok(RunMode::Simulated),
            "interactive" | "manual" | "2" => Ok(RunMode::Interactive),
            other => Err(format!(
                "unknown mode '{other}', expected 'simulated' or 'interactive'"
            )),
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The planned number of rounds was played.
    Completed,
    /// Single-shot policy ran out of unrated arms.
    Exhausted,
    /// The rating source stopped supplying ratings.
    InputClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::Exhausted => write!(f, "exhausted"),
            StopReason::InputClosed => write!(f, "input closed"),
        }
    }
}

/// One completed selection. Append-only once written to a run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based round number.
    pub iteration: usize,
    pub arm_index: ArmIndex,
    pub label: String,
    pub rating: i32,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_validation() {
        assert!(RatingBounds::new(1, 5).is_ok());
        assert!(RatingBounds::new(5, 5).is_err());
        assert!(RatingBounds::new(5, 1).is_err());
    }

    #[test]
    fn test_normalize_midpoint() {
        let bounds = RatingBounds::default();
        assert!((bounds.normalize(3) - 0.5).abs() < f64::EPSILON);
        assert!((bounds.normalize(1)).abs() < f64::EPSILON);
        assert!((bounds.normalize(5) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quantize_rounds_and_clamps() {
        let bounds = RatingBounds::default();
        assert_eq!(bounds.quantize(0.0), 1);
        assert_eq!(bounds.quantize(1.0), 5);
        assert_eq!(bounds.quantize(0.49), 3);
        assert_eq!(bounds.quantize(1.7), 5);
        assert_eq!(bounds.quantize(-0.3), 1);
    }

    #[test]
    fn test_alternate_domain() {
        let bounds = RatingBounds::new(0, 10).unwrap();
        assert_eq!(bounds.levels(), 11);
        assert!((bounds.normalize(7) - 0.7).abs() < 1e-12);
        assert_eq!(bounds.quantize(0.7), 7);
    }

    #[test]
    fn test_wide_domain_arithmetic() {
        let bounds = RatingBounds::new(-2_000_000_000, 2_000_000_000).unwrap();
        assert_eq!(bounds.normalize(2_000_000_000), 1.0);
        assert_eq!(bounds.normalize(-2_000_000_000), 0.0);
        assert_eq!(bounds.normalize(0), 0.5);
        assert_eq!(bounds.levels(), 4_000_000_001);
        assert_eq!(bounds.quantize(1.0), 2_000_000_000);

        let full = RatingBounds::new(i32::MIN, i32::MAX).unwrap();
        assert_eq!(full.normalize(i32::MAX), 1.0);
        assert_eq!(full.normalize(i32::MIN), 0.0);
    }

    #[test]
    fn test_wide_domain_stars_are_scaled() {
        let bounds = RatingBounds::new(0, 100_000_000).unwrap();
        assert!(!bounds.has_star_scale());
        assert_eq!(bounds.stars(50_000_000.0), "★★★★★☆☆☆☆☆");
        assert_eq!(bounds.stars(100_000_000.0).chars().count(), 10);
        assert_eq!(bounds.stars(-5.0), "☆☆☆☆☆☆☆☆☆☆");
    }

    #[test]
    fn test_stars() {
        let bounds = RatingBounds::default();
        assert_eq!(bounds.stars(1.0), "★☆☆☆☆");
        assert_eq!(bounds.stars(3.4), "★★★☆☆");
        assert_eq!(bounds.stars(4.6), "★★★★★");
        assert_eq!(bounds.stars(0.0), "☆☆☆☆☆");
    }

    #[test]
    fn test_policy_and_mode_parsing() {
        assert_eq!(
            "single-shot".parse::<SelectionPolicy>().unwrap(),
            SelectionPolicy::SingleShot
        );
        assert_eq!(
            "Repeatable".parse::<SelectionPolicy>().unwrap(),
            SelectionPolicy::Repeatable
        );
        assert!("sometimes".parse::<SelectionPolicy>().is_err());
        assert_eq!("2".parse::<RunMode>().unwrap(), RunMode::Interactive);
        assert_eq!(RunMode::Simulated.to_string(), "simulated");
    }
}

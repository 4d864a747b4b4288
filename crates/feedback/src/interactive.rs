//! Ratings typed by a person at a prompt.

use crate::{Observation, RewardSource};
use cinebandit_core::{ArmIndex, BanditResult, RatingBounds, RunMode};
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{debug, warn};

/// Rejected prompt input. Handled by re-prompting; never reaches the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingInputError {
    #[error("'{0}' is not a whole number")]
    NotANumber(String),

    #[error("rating {value} is outside {min}..={max}")]
    OutOfRange { value: i64, min: i32, max: i32 },
}

/// Validate one line of user input as a rating.
pub fn parse_rating(input: &str, bounds: RatingBounds) -> Result<i32, RatingInputError> {
    let trimmed = input.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| RatingInputError::NotANumber(trimmed.to_string()))?;
    if value < bounds.min() as i64 || value > bounds.max() as i64 {
        return Err(RatingInputError::OutOfRange {
            value,
            min: bounds.min(),
            max: bounds.max(),
        });
    }
    Ok(value as i32)
}

pub fn is_quit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "q" | "quit" | "exit")
}

/// Human-readable scale shown before each rating request.
pub fn rating_legend(bounds: RatingBounds) -> Vec<String> {
    const WORDS: [&str; 5] = ["Very bad", "Bad", "Average", "Good", "Excellent"];
    if !bounds.has_star_scale() {
        return vec![format!(
            "{} - worst ... {} - best",
            bounds.min(),
            bounds.max()
        )];
    }
    (bounds.min()..=bounds.max())
        .map(|r| {
            let stars = bounds.stars(r as f64);
            if bounds.levels() == WORDS.len() {
                let word = WORDS[(r as i64 - bounds.min() as i64) as usize];
                format!("{r} - {stars} ({word})")
            } else {
                format!("{r} - {stars}")
            }
        })
        .collect()
}

pub struct InteractiveFeedback<R, W> {
    reader: R,
    writer: W,
    bounds: RatingBounds,
    show_legend: bool,
}

impl<R: BufRead, W: Write> InteractiveFeedback<R, W> {
    pub fn new(reader: R, writer: W, bounds: RatingBounds) -> Self {
        Self {
            reader,
            writer,
            bounds,
            show_legend: true,
        }
    }

    /// Skip the star legend before each prompt.
    pub fn without_legend(mut self) -> Self {
        self.show_legend = false;
        self
    }

    /// Write a prompt and read one line. `None` at end of input.
    /// Bytes that are not valid UTF-8 are replaced, so the line is rejected
    /// by validation rather than failing the read.
    pub fn prompt_line(&mut self, prompt: &str) -> BanditResult<Option<String>> {
        write!(self.writer, "{prompt}")?;
        self.writer.flush()?;
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Ask until a valid rating is entered or the user stops.
    pub fn request_rating(&mut self, label: &str) -> BanditResult<Observation> {
        writeln!(
            self.writer,
            "\nRate '{label}' from {} to {} stars (q to stop):",
            self.bounds.min(),
            self.bounds.max()
        )?;
        if self.show_legend {
            for line in rating_legend(self.bounds) {
                writeln!(self.writer, "{line}")?;
            }
        }

        loop {
            let Some(line) = self.prompt_line("\nYour rating: ")? else {
                debug!(label, "Input closed");
                return Ok(Observation::Stopped);
            };
            if is_quit(&line) {
                debug!(label, "User stopped rating");
                return Ok(Observation::Stopped);
            }
            match parse_rating(&line, self.bounds) {
                Ok(rating) => return Ok(Observation::Rating(rating)),
                Err(e) => {
                    metrics::counter!("feedback.invalid_input").increment(1);
                    warn!(error = %e, "Rejected rating input");
                    writeln!(self.writer, "Invalid rating: {e}. Please try again.")?;
                }
            }
        }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> RewardSource for InteractiveFeedback<R, W> {
    fn observe(&mut self, arm: ArmIndex, label: &str) -> BanditResult<Observation> {
        let observation = self.request_rating(label)?;
        debug!(arm, label, ?observation, "Interactive observation");
        Ok(observation)
    }

    fn mode(&self) -> RunMode {
        RunMode::Interactive
    }
}

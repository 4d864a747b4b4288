//! Rating-log export: a flat CSV of `(iteration, movie, rating, timestamp)`
//! rows, and a JSON document carrying run metadata plus the full log.

use chrono::{DateTime, SecondsFormat, Utc};
use cinebandit_core::tabular::{join_record, split_record};
use cinebandit_core::{
    BanditError, BanditResult, RoundRecord, RunMode, SelectionPolicy, StopReason,
};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const CSV_HEADER: [&str; 4] = ["Iteration", "Movie", "Rating", "Timestamp"];

/// One row of the exported rating log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingLogEntry {
    pub iteration: usize,
    pub movie: String,
    pub rating: i32,
    pub timestamp: DateTime<Utc>,
}

impl From<&RoundRecord> for RatingLogEntry {
    fn from(record: &RoundRecord) -> Self {
        Self {
            iteration: record.iteration,
            movie: record.label.clone(),
            rating: record.rating,
            timestamp: record.timestamp,
        }
    }
}

pub fn write_csv<W: Write>(records: &[RoundRecord], mut writer: W) -> BanditResult<()> {
    writeln!(writer, "{}", join_record(&CSV_HEADER))?;
    for record in records {
        if record.label.contains(['\n', '\r']) {
            return Err(BanditError::Export(format!(
                "round {}: movie title contains a line break",
                record.iteration
            )));
        }
        let row = [
            record.iteration.to_string(),
            record.label.clone(),
            record.rating.to_string(),
            record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ];
        writeln!(writer, "{}", join_record(&row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_csv<R: BufRead>(reader: R) -> BanditResult<Vec<RatingLogEntry>> {
    let mut lines = reader.lines();
    match lines.next() {
        Some(header) => {
            let header = header?;
            let columns = split_record(&header).unwrap_or_default();
            if columns != CSV_HEADER {
                return Err(BanditError::Export(format!(
                    "unexpected rating log header: {header}"
                )));
            }
        }
        None => return Err(BanditError::Export("rating log is empty".into())),
    }

    let mut entries = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 2;
        let bad = |what: &str| BanditError::Export(format!("line {line_no}: {what}"));

        let fields = split_record(&line).ok_or_else(|| bad("unterminated quoted field"))?;
        let [iteration, movie, rating, timestamp]: [String; 4] = fields
            .try_into()
            .map_err(|_| bad("expected 4 fields"))?;

        entries.push(RatingLogEntry {
            iteration: iteration
                .parse()
                .map_err(|_| bad("invalid iteration"))?,
            movie,
            rating: rating.parse().map_err(|_| bad("invalid rating"))?,
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| bad(&format!("invalid timestamp: {e}")))?
                .with_timezone(&Utc),
        });
    }
    Ok(entries)
}

pub fn save_csv(path: &Path, records: &[RoundRecord]) -> BanditResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv(records, BufWriter::new(file))?;
    info!(path = %path.display(), rows = records.len(), "Rating log saved");
    Ok(())
}

pub fn load_csv(path: &Path) -> BanditResult<Vec<RatingLogEntry>> {
    read_csv(BufReader::new(std::fs::File::open(path)?))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub item_count: usize,
    pub round_count: usize,
    pub requested_rounds: usize,
    pub policy: SelectionPolicy,
    pub mode: RunMode,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunExport {
    pub metadata: RunMetadata,
    pub ratings: Vec<RoundRecord>,
}

pub fn save_json(path: &Path, export: &RunExport) -> BanditResult<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, export)?;
    writer.flush()?;
    info!(
        path = %path.display(),
        rounds = export.ratings.len(),
        "Run export saved"
    );
    Ok(())
}

pub fn load_json(path: &Path) -> BanditResult<RunExport> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn records() -> Vec<RoundRecord> {
        let base = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        let titles = [
            "Toy Story (1995)",
            "American President, The (1995)",
            "\"Great\" Expectations (1998)",
        ];
        titles
            .iter()
            .enumerate()
            .map(|(i, title)| RoundRecord {
                iteration: i + 1,
                arm_index: i,
                label: title.to_string(),
                rating: (i as i32 % 5) + 2,
                timestamp: base
                    + chrono::Duration::milliseconds(1234 * i as i64)
                    + chrono::Duration::nanoseconds(789),
            })
            .collect()
    }

    fn metadata(rounds: usize) -> RunMetadata {
        RunMetadata {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            item_count: 3,
            round_count: rounds,
            requested_rounds: 10,
            policy: SelectionPolicy::SingleShot,
            mode: RunMode::Simulated,
            stop_reason: StopReason::Exhausted,
        }
    }

    #[test]
    fn test_csv_layout() {
        let mut buf = Vec::new();
        write_csv(&records(), &mut buf).unwrap();
        let csv = String::from_utf8(buf).unwrap();
        assert!(csv.starts_with("Iteration,Movie,Rating,Timestamp\n"));
        assert!(csv.contains("\"American President, The (1995)\""));
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_csv_round_trip_preserves_rows_and_order() {
        let records = records();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratings.csv");
        save_csv(&path, &records).unwrap();

        let loaded = load_csv(&path).unwrap();
        let expected: Vec<RatingLogEntry> = records.iter().map(RatingLogEntry::from).collect();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn test_csv_rejects_malformed_rows() {
        let bad_header = "Iter,Movie\n1,x\n";
        assert!(read_csv(bad_header.as_bytes()).is_err());

        let short_row = "Iteration,Movie,Rating,Timestamp\n1,Heat (1995),4\n";
        let err = read_csv(short_row.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let bad_time = "Iteration,Movie,Rating,Timestamp\n1,Heat (1995),4,yesterday\n";
        assert!(read_csv(bad_time.as_bytes()).is_err());

        assert!(read_csv("".as_bytes()).is_err());
    }

    #[test]
    fn test_csv_refuses_multiline_titles() {
        let mut records = records();
        records[1].label = "Heat\n(1995)".into();
        let err = write_csv(&records, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("round 2"));
    }

    #[test]
    fn test_empty_log_round_trip() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        assert!(read_csv(buf.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let records = records();
        let export = RunExport {
            metadata: metadata(records.len()),
            ratings: records,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        save_json(&path, &export).unwrap();

        let loaded = load_json(&path).unwrap();
        assert_eq!(loaded, export);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"single_shot\""));
        assert!(raw.contains("\"exhausted\""));
    }
}

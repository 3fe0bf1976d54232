//! Sample ingestion: line-oriented controller frames and recorded CSV files.
//!
//! The controller emits one frame per line, e.g.
//!
//! ```text
//! DATA 1250.0,152.3,0.412,3.81,0.00824
//! STATUS TESTING F:152.3 P:12.40 R:1
//! ```
//!
//! Anything that does not parse is dropped; ingestion never aborts a test.

use log::warn;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use crate::error::{TensileError, TensileResult};
use crate::sample::TestSample;

/// Payload of a `DATA` frame as sent by the controller.
///
/// The controller's stress and strain are informational; the session
/// recomputes them from its own geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub timestamp_ms: f64,
    pub force_n: f64,
    pub extension_mm: f64,
    pub stress_mpa: f64,
    pub strain_ratio: f64,
}

impl FeedRecord {
    pub fn to_sample(&self) -> TestSample {
        TestSample::new(self.timestamp_ms / 1000.0, self.force_n, self.extension_mm)
    }
}

/// Controller state report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub state: String,
    pub force_n: f64,
    pub position_mm: f64,
    pub running: bool,
}

/// One line from the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Frame {
    Data(FeedRecord),
    Status(Status),
    Force(f64),
    Position(f64),
    Ok(String),
    Error(String),
}

fn parse_number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses the comma-separated payload of a `DATA` frame.
///
/// # Errors
///
/// [`TensileError::MalformedFrame`] unless there are exactly five finite
/// numeric fields.
pub fn parse_data_payload(payload: &str) -> TensileResult<FeedRecord> {
    let values: Vec<&str> = payload.split(',').collect();
    if values.len() != 5 {
        return Err(TensileError::MalformedFrame(format!(
            "expected 5 fields, got {}",
            values.len()
        )));
    }
    let mut numbers = [0.0; 5];
    for (slot, raw) in numbers.iter_mut().zip(&values) {
        *slot = parse_number(raw)
            .ok_or_else(|| TensileError::MalformedFrame(format!("not a number: '{}'", raw.trim())))?;
    }
    Ok(FeedRecord {
        timestamp_ms: numbers[0],
        force_n: numbers[1],
        extension_mm: numbers[2],
        stress_mpa: numbers[3],
        strain_ratio: numbers[4],
    })
}

impl Frame {
    /// Parses one line. Unknown commands and malformed payloads give `None`.
    pub fn parse(line: &str) -> Option<Frame> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command.to_ascii_uppercase().as_str() {
            "DATA" => parse_data_payload(rest).ok().map(Frame::Data),
            "FORCE" => parse_number(rest).map(Frame::Force),
            "POS" => parse_number(rest).map(Frame::Position),
            "OK" => Some(Frame::Ok(if rest.is_empty() { "OK".to_string() } else { rest.to_string() })),
            "ERROR" => Some(Frame::Error(if rest.is_empty() { "Error".to_string() } else { rest.to_string() })),
            "STATUS" => Some(Frame::Status(parse_status(rest)?)),
            _ => None,
        }
    }
}

fn parse_status(rest: &str) -> Option<Status> {
    let mut parts = rest.split_whitespace();
    let mut status = Status {
        state: parts.next().unwrap_or("UNKNOWN").to_string(),
        force_n: 0.0,
        position_mm: 0.0,
        running: false,
    };
    for part in parts {
        if let Some(v) = part.strip_prefix("F:") {
            status.force_n = parse_number(v)?;
        } else if let Some(v) = part.strip_prefix("P:") {
            status.position_mm = parse_number(v)?;
        } else if let Some(v) = part.strip_prefix("R:") {
            status.running = v == "1";
        }
    }
    Some(status)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: f64,
    force: f64,
    extension: f64,
    #[serde(default)]
    displacement: Option<f64>,
}

/// Reads a recorded test with columns `time,force,extension[,displacement]`.
///
/// Rows that fail to deserialize or contain non-finite values are dropped
/// with a warning.
pub fn read_samples_csv<R: Read>(reader: R) -> TensileResult<Vec<TestSample>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut samples = Vec::new();
    for (row_no, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("dropping CSV row {}: {}", row_no + 1, e);
                continue;
            }
        };
        let displacement = row.displacement.unwrap_or(row.extension);
        if ![row.time, row.force, row.extension, displacement].iter().all(|v| v.is_finite()) {
            warn!("dropping CSV row {}: non-finite value", row_no + 1);
            continue;
        }
        samples.push(TestSample {
            time: row.time,
            force: row.force,
            extension: row.extension,
            displacement,
        });
    }
    Ok(samples)
}

pub fn read_samples_csv_file<P: AsRef<Path>>(path: P) -> TensileResult<Vec<TestSample>> {
    let file = std::fs::File::open(path)?;
    read_samples_csv(std::io::BufReader::new(file))
}

use crate::error::{AppError, Result};
use crate::models::{RawRecord, RECORD_FIELDS, TIME_FIELDS};
use std::io::Read;
use tracing::warn;

/// Marks a missing reading in any column.
pub const SENTINEL: f64 = -1.0;

/// Default failure threshold - fail if more than 10% of rows carry unparseable fields
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.10;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseStats {
    pub total_lines: usize,
    pub empty_lines: usize,
    pub sentinel_fields: usize,
    pub malformed_fields: usize,
    pub malformed_rows: usize,
    pub failure_rate: f64,
}

impl ParseStats {
    pub fn new() -> Self {
        Self {
            total_lines: 0,
            empty_lines: 0,
            sentinel_fields: 0,
            malformed_fields: 0,
            malformed_rows: 0,
            failure_rate: 0.0,
        }
    }

    pub fn non_empty_lines(&self) -> usize {
        self.total_lines - self.empty_lines
    }

    pub fn finalize(&mut self) {
        let non_empty = self.non_empty_lines();
        self.failure_rate = if non_empty > 0 {
            self.malformed_rows as f64 / non_empty as f64
        } else {
            0.0
        };
    }

    pub fn exceeds_threshold(&self, threshold: f64) -> bool {
        self.failure_rate > threshold
    }
}

impl Default for ParseStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of reading a single field.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Value(f64),
    Sentinel,
    Blank,
    Malformed,
}

impl Field {
    fn value(self) -> Option<f64> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

pub struct Parser;

impl Parser {
    /// Parse headerless measurement rows and return them with parse statistics
    pub fn parse_file(content: &str) -> Result<(Vec<RawRecord>, ParseStats)> {
        Self::parse_reader(content.as_bytes(), DEFAULT_FAILURE_THRESHOLD)
    }

    /// Parse measurement rows with a custom failure threshold
    pub fn parse_file_with_threshold(
        content: &str,
        failure_threshold: f64,
    ) -> Result<(Vec<RawRecord>, ParseStats)> {
        Self::parse_reader(content.as_bytes(), failure_threshold)
    }

    pub fn parse_reader<R: Read>(
        reader: R,
        failure_threshold: f64,
    ) -> Result<(Vec<RawRecord>, ParseStats)> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        let mut stats = ParseStats::new();

        for result in rdr.records() {
            let record = result?;
            stats.total_lines += 1;

            if record.iter().all(str::is_empty) {
                stats.empty_lines += 1;
                continue;
            }

            let line_num = record
                .position()
                .map(|p| p.line())
                .unwrap_or(stats.total_lines as u64);

            if record.len() != RECORD_FIELDS {
                return Err(AppError::Format(format!(
                    "Line {}: expected {} fields, got {}",
                    line_num,
                    RECORD_FIELDS,
                    record.len()
                )));
            }

            let mut fields = [None; RECORD_FIELDS];
            let mut malformed = 0;
            for (col, raw) in record.iter().enumerate() {
                let field = parse_field(raw, col < TIME_FIELDS);
                match field {
                    Field::Sentinel => stats.sentinel_fields += 1,
                    Field::Malformed => malformed += 1,
                    Field::Value(_) | Field::Blank => {}
                }
                fields[col] = field.value();
            }

            if malformed > 0 {
                stats.malformed_fields += malformed;
                stats.malformed_rows += 1;
                warn!(
                    "Line {} has {} unparseable field(s), treating them as missing",
                    line_num, malformed
                );
            }

            records.push(RawRecord::new(fields));
        }

        stats.finalize();

        // Validate parse success rate
        if stats.exceeds_threshold(failure_threshold) {
            return Err(AppError::Format(format!(
                "Malformed row rate {:.1}% exceeds threshold {:.1}%: {} malformed out of {} non-empty lines",
                stats.failure_rate * 100.0,
                failure_threshold * 100.0,
                stats.malformed_rows,
                stats.non_empty_lines()
            )));
        }

        Ok((records, stats))
    }
}

fn parse_field(s: &str, integral: bool) -> Field {
    if s.is_empty() {
        return Field::Blank;
    }

    let parsed = if integral {
        parse_int(s)
    } else {
        s.parse::<f64>().ok()
    };

    match parsed {
        Some(v) if v == SENTINEL => Field::Sentinel,
        Some(v) if v.is_finite() => Field::Value(v),
        // NaN and infinities read as a missing reading, not as data
        Some(_) => Field::Blank,
        None => Field::Malformed,
    }
}

/// Time components must be whole numbers; "2008" and "2008.0" are both accepted.
fn parse_int(s: &str) -> Option<f64> {
    s.parse::<i32>().ok().map(f64::from).or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && v.abs() <= i32::MAX as f64)
    })
}

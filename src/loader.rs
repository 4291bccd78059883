use crate::error::{AppError, Result};
use crate::models::Measurements;
use crate::parser::{ParseStats, Parser, DEFAULT_FAILURE_THRESHOLD};
use crate::repair::{repair, FillPolicy, RepairReport};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// What happened while loading a measurement file.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub policy: FillPolicy,
    pub parse: ParseStats,
    pub repair: RepairReport,
    pub rows_loaded: usize,
}

/// Reads measurement files and repairs them into aligned time/zone tables.
#[derive(Debug, Clone)]
pub struct Loader {
    failure_threshold: f64,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl Loader {
    pub fn new(failure_threshold: f64) -> Self {
        Self { failure_threshold }
    }

    pub fn load_measurements<P: AsRef<Path>>(
        &self,
        path: P,
        policy: FillPolicy,
    ) -> Result<Measurements> {
        self.load_with_report(path, policy).map(|(m, _)| m)
    }

    pub fn load_with_report<P: AsRef<Path>>(
        &self,
        path: P,
        policy: FillPolicy,
    ) -> Result<(Measurements, LoadReport)> {
        let path = path.as_ref();
        debug!("Opening measurement file {}", path.display());

        let file = File::open(path).map_err(|e| {
            AppError::NotFound(format!("Cannot open '{}': {}", path.display(), e))
        })?;

        let (measurements, report) = self.load_reader(file, policy)?;

        info!(
            "Loaded {} rows from {} ({}: {} incomplete, {} dropped, {} fields filled)",
            report.rows_loaded,
            path.display(),
            policy,
            report.repair.rows_with_missing,
            report.repair.rows_dropped,
            report.repair.fields_filled
        );

        Ok((measurements, report))
    }

    /// Parse, repair and split records from any reader.
    pub fn load_reader<R: Read>(
        &self,
        reader: R,
        policy: FillPolicy,
    ) -> Result<(Measurements, LoadReport)> {
        let (records, parse) = Parser::parse_reader(reader, self.failure_threshold)?;
        let (repaired, repair) = repair(records, policy);

        let rows = repaired
            .iter()
            .map(|r| {
                r.split().ok_or_else(|| {
                    AppError::Format("Repaired record still has missing fields".to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let measurements = Measurements::from_rows(rows);
        let report = LoadReport {
            policy,
            parse,
            repair,
            rows_loaded: measurements.len(),
        };

        Ok((measurements, report))
    }
}

/// Load `path` with the default failure threshold.
pub fn load_measurements<P: AsRef<Path>>(path: P, policy: FillPolicy) -> Result<Measurements> {
    Loader::default().load_measurements(path, policy)
}

use crate::aggregate::{aggregate_measurements, Granularity};
use crate::error::{AppError, Result};
use crate::loader::{LoadReport, Loader};
use crate::models::Measurements;
use crate::repair::FillPolicy;
use crate::stats::{summarize, StatisticsTable};
use std::path::Path;
use std::sync::Arc;

/// Data currently selected in the interactive loop.
///
/// Every action returns a new `Session`; a failed action leaves the previous
/// one untouched. Tables are shared behind `Arc` so a session can be cloned
/// cheaply, and are never mutated once stored.
#[derive(Debug, Clone, Default)]
pub struct Session {
    raw: Option<Arc<Measurements>>,
    aggregated: Option<(Arc<Measurements>, Granularity)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> Option<&Measurements> {
        self.raw.as_deref()
    }

    pub fn aggregated(&self) -> Option<(&Measurements, Granularity)> {
        self.aggregated.as_ref().map(|(m, g)| (m.as_ref(), *g))
    }

    /// The aggregated view when present, otherwise the raw data.
    pub fn current(&self) -> Option<&Measurements> {
        self.aggregated()
            .map(|(m, _)| m)
            .or_else(|| self.raw())
    }

    /// Replace the loaded data; any previous aggregation is discarded.
    pub fn with_loaded(&self, measurements: Measurements) -> Session {
        Session {
            raw: Some(Arc::new(measurements)),
            aggregated: None,
        }
    }

    pub fn load<P: AsRef<Path>>(
        &self,
        loader: &Loader,
        path: P,
        policy: FillPolicy,
    ) -> Result<(Session, LoadReport)> {
        let (measurements, report) = loader.load_with_report(path, policy)?;
        Ok((self.with_loaded(measurements), report))
    }

    /// Aggregate the loaded data. `None` clears the aggregated view.
    pub fn aggregate(&self, granularity: Option<Granularity>) -> Result<Session> {
        let raw = self.raw.clone().ok_or_else(|| {
            AppError::InvalidArgument("No data loaded, load a file first".to_string())
        })?;

        let aggregated = match granularity {
            Some(g) => Some((Arc::new(aggregate_measurements(&raw, g)?), g)),
            None => None,
        };

        Ok(Session {
            raw: Some(raw),
            aggregated,
        })
    }

    pub fn statistics(&self) -> Result<StatisticsTable> {
        let current = self.current().ok_or_else(|| {
            AppError::InvalidArgument("No data loaded, load a file first".to_string())
        })?;
        summarize(current.zones())
    }
}

use crate::error::{AppError, Result};
use crate::models::{ZoneTable, ZONE_FIELDS};
use std::fmt;

/// Descriptive statistics for one column of readings.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRow {
    pub label: String,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
    pub mean: f64,
    pub total: f64,
}

impl StatisticsRow {
    /// Summarize `values`, which must be non-empty.
    fn from_values(label: impl Into<String>, values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let total: f64 = sorted.iter().sum();
        Self {
            label: label.into(),
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
            mean: total / sorted.len() as f64,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsTable {
    pub count: usize,
    /// Zone 1..4 followed by "All".
    pub rows: Vec<StatisticsRow>,
}

impl StatisticsTable {
    pub fn zone(&self, index: usize) -> Option<&StatisticsRow> {
        self.rows.get(index).filter(|_| index < ZONE_FIELDS)
    }

    pub fn combined(&self) -> &StatisticsRow {
        &self.rows[ZONE_FIELDS]
    }
}

/// Linear-interpolation quantile of already sorted, non-empty `sorted`.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Per-zone statistics plus an "All" row over the per-row total of the four zones.
pub fn summarize(zones: &ZoneTable) -> Result<StatisticsTable> {
    if zones.is_empty() {
        return Err(AppError::InvalidArgument(
            "Cannot summarize an empty zone table".to_string(),
        ));
    }

    let mut rows: Vec<StatisticsRow> = (0..ZONE_FIELDS)
        .map(|i| StatisticsRow::from_values(format!("Zone {}", i + 1), &zones.column(i)))
        .collect();
    rows.push(StatisticsRow::from_values("All", &zones.combined()));

    Ok(StatisticsTable {
        count: zones.len(),
        rows,
    })
}

impl fmt::Display for StatisticsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>14}",
            "", "Minimum", "1. quart.", "2. quart.", "3. quart.", "Maximum", "Mean", "Total"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<8} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>14.2}",
                row.label, row.min, row.p25, row.median, row.p75, row.max, row.mean, row.total
            )?;
        }
        write!(f, "({} rows)", self.count)
    }
}

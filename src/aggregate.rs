use crate::error::{AppError, Result};
use crate::models::{Measurements, TimeVector, ZoneReading};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    Hour,
    Day,
    Month,
    /// Average profile over the 24 hours of a day, across all dates.
    HourOfDay,
}

/// Bucket key: a prefix of (year, month, day, hour), unused positions zeroed.
type BucketKey = (i32, i32, i32, i32);

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Hour,
        Granularity::Day,
        Granularity::Month,
        Granularity::HourOfDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::HourOfDay => "hour-of-day",
        }
    }

    fn key(&self, t: &TimeVector) -> BucketKey {
        match self {
            Granularity::Hour => (t.year, t.month, t.day, t.hour),
            Granularity::Day => (t.year, t.month, t.day, 0),
            Granularity::Month => (t.year, t.month, 0, 0),
            Granularity::HourOfDay => (0, 0, 0, t.hour),
        }
    }

    /// Representative time vector for the bucket containing `t`.
    ///
    /// Fields finer than the grouping level are zeroed. Hour-of-day buckets
    /// keep only the hour; their date fields are zero and carry no meaning.
    pub fn truncate(&self, t: &TimeVector) -> TimeVector {
        match self {
            Granularity::Hour => TimeVector::new(t.year, t.month, t.day, t.hour, 0, 0),
            Granularity::Day => TimeVector::new(t.year, t.month, t.day, 0, 0, 0),
            Granularity::Month => TimeVector::new(t.year, t.month, 0, 0, 0, 0),
            Granularity::HourOfDay => TimeVector::new(0, 0, 0, t.hour, 0, 0),
        }
    }

    fn averages(&self) -> bool {
        matches!(self, Granularity::HourOfDay)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "hour" | "hourly" => Ok(Granularity::Hour),
            "day" | "daily" => Ok(Granularity::Day),
            "month" | "monthly" => Ok(Granularity::Month),
            "hour-of-day" | "hour-of-the-day" => Ok(Granularity::HourOfDay),
            _ => Err(AppError::InvalidArgument(format!(
                "Unknown granularity '{}', expected one of: hour, day, month, hour-of-day",
                s
            ))),
        }
    }
}

struct Bucket {
    time: TimeVector,
    sum: ZoneReading,
    count: usize,
}

/// Collapse `input` into one row per bucket of `granularity`.
///
/// Hour, day and month buckets hold the column-wise sum of their members;
/// hour-of-day buckets hold the column-wise mean. Buckets are emitted in order
/// of first appearance in the input. The input is never modified.
pub fn aggregate_measurements(
    input: &Measurements,
    granularity: Granularity,
) -> Result<Measurements> {
    let mut index: HashMap<BucketKey, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();

    for (time, zones) in input.rows() {
        let key = granularity.key(time);
        match index.get(&key) {
            Some(&i) => {
                let bucket = &mut buckets[i];
                bucket.sum = bucket.sum.add(zones);
                bucket.count += 1;
            }
            None => {
                index.insert(key, buckets.len());
                buckets.push(Bucket {
                    time: granularity.truncate(time),
                    sum: *zones,
                    count: 1,
                });
            }
        }
    }

    debug!(
        "Aggregated {} rows into {} {} buckets",
        input.len(),
        buckets.len(),
        granularity
    );

    let rows = buckets
        .into_iter()
        .map(|b| {
            let zones = if granularity.averages() {
                b.sum.divide(b.count as f64)
            } else {
                b.sum
            };
            (b.time, zones)
        })
        .collect();

    Ok(Measurements::from_rows(rows))
}

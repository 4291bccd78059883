use crate::error::AppError;
use crate::models::{RawRecord, RECORD_FIELDS};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// How rows with missing fields are repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillPolicy {
    /// Replace a missing field with the nearest earlier valid value in its column.
    ForwardFill,
    /// Replace a missing field with the nearest later valid value in its column.
    BackwardFill,
    /// Discard every row with a missing field.
    Drop,
}

impl FillPolicy {
    pub const ALL: [FillPolicy; 3] = [
        FillPolicy::ForwardFill,
        FillPolicy::BackwardFill,
        FillPolicy::Drop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FillPolicy::ForwardFill => "forward-fill",
            FillPolicy::BackwardFill => "backward-fill",
            FillPolicy::Drop => "drop",
        }
    }
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "forward-fill" | "ffill" => Ok(FillPolicy::ForwardFill),
            "backward-fill" | "bfill" => Ok(FillPolicy::BackwardFill),
            "drop" => Ok(FillPolicy::Drop),
            _ => Err(AppError::InvalidArgument(format!(
                "Unknown fill policy '{}', expected one of: forward-fill, backward-fill, drop",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    pub rows_in: usize,
    pub rows_with_missing: usize,
    pub rows_dropped: usize,
    pub fields_filled: usize,
    /// Set when a fill policy fell back to dropping because its anchor row was incomplete.
    pub degraded_to_drop: bool,
}

/// Repair `records` according to `policy`, returning only complete rows.
///
/// Forward fill needs a complete first row and backward fill a complete last
/// row; when the anchor row has a missing field the whole table is repaired
/// with [`FillPolicy::Drop`] instead.
pub fn repair(records: Vec<RawRecord>, policy: FillPolicy) -> (Vec<RawRecord>, RepairReport) {
    let mut report = RepairReport {
        rows_in: records.len(),
        rows_with_missing: records.iter().filter(|r| r.has_missing()).count(),
        ..Default::default()
    };

    let anchor = match policy {
        FillPolicy::ForwardFill => records.first(),
        FillPolicy::BackwardFill => records.last(),
        FillPolicy::Drop => None,
    };

    let effective = match anchor {
        Some(row) if row.has_missing() => {
            warn!(
                "{} anchor row has missing fields, dropping all {} incomplete rows instead",
                policy, report.rows_with_missing
            );
            report.degraded_to_drop = true;
            FillPolicy::Drop
        }
        _ => policy,
    };

    let repaired = match effective {
        FillPolicy::Drop => {
            let kept: Vec<RawRecord> = records.into_iter().filter(|r| !r.has_missing()).collect();
            report.rows_dropped = report.rows_in - kept.len();
            kept
        }
        FillPolicy::ForwardFill => {
            let mut records = records;
            report.fields_filled = fill_in_order(records.iter_mut());
            records
        }
        FillPolicy::BackwardFill => {
            let mut records = records;
            report.fields_filled = fill_in_order(records.iter_mut().rev());
            records
        }
    };

    debug!(
        "Repaired with {}: {} rows in, {} dropped, {} fields filled",
        effective, report.rows_in, report.rows_dropped, report.fields_filled
    );

    (repaired, report)
}

/// Carry the last seen valid value of each column into missing fields, in iteration order.
fn fill_in_order<'a>(rows: impl Iterator<Item = &'a mut RawRecord>) -> usize {
    let mut last_valid: [Option<f64>; RECORD_FIELDS] = [None; RECORD_FIELDS];
    let mut filled = 0;

    for row in rows {
        for (field, last) in row.fields.iter_mut().zip(last_valid.iter_mut()) {
            if field.is_some() {
                *last = *field;
            } else if last.is_some() {
                *field = *last;
                filled += 1;
            }
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: [f64; RECORD_FIELDS]) -> RawRecord {
        RawRecord::new(values.map(|v| if v == -1.0 { None } else { Some(v) }))
    }

    fn zones(records: &[RawRecord]) -> Vec<Vec<Option<f64>>> {
        records.iter().map(|r| r.fields[6..].to_vec()).collect()
    }

    fn sample() -> Vec<RawRecord> {
        vec![
            row([2008., 1., 1., 0., 0., 0., 10., 20., 30., 40.]),
            row([2008., 1., 1., 1., 0., 0., -1., 25., 35., 45.]),
            row([2008., 1., 1., 2., 0., 0., 15., -1., -1., 50.]),
            row([2008., 1., 1., 3., 0., 0., 16., 26., 36., 46.]),
        ]
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("drop".parse::<FillPolicy>().unwrap(), FillPolicy::Drop);
        assert_eq!(
            "forward fill".parse::<FillPolicy>().unwrap(),
            FillPolicy::ForwardFill
        );
        assert_eq!(
            "Backward-Fill".parse::<FillPolicy>().unwrap(),
            FillPolicy::BackwardFill
        );
        assert!(matches!(
            "interpolate".parse::<FillPolicy>(),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_drop_keeps_complete_rows_in_order() {
        let (repaired, report) = repair(sample(), FillPolicy::Drop);

        assert_eq!(repaired.len(), 2);
        assert_eq!(repaired[0].fields[3], Some(0.0));
        assert_eq!(repaired[1].fields[3], Some(3.0));
        assert_eq!(report.rows_dropped, 2);
        assert!(!report.degraded_to_drop);
    }

    #[test]
    fn test_forward_fill_uses_preceding_values() {
        let (repaired, report) = repair(sample(), FillPolicy::ForwardFill);

        assert_eq!(repaired.len(), 4);
        assert_eq!(report.fields_filled, 3);
        assert_eq!(zones(&repaired)[1], vec![Some(10.), Some(25.), Some(35.), Some(45.)]);
        assert_eq!(zones(&repaired)[2], vec![Some(15.), Some(25.), Some(35.), Some(50.)]);
    }

    #[test]
    fn test_backward_fill_uses_following_values() {
        let (repaired, _) = repair(sample(), FillPolicy::BackwardFill);

        assert_eq!(repaired.len(), 4);
        assert_eq!(zones(&repaired)[1], vec![Some(15.), Some(25.), Some(35.), Some(45.)]);
        assert_eq!(zones(&repaired)[2], vec![Some(15.), Some(26.), Some(36.), Some(50.)]);
    }

    #[test]
    fn test_forward_fill_degrades_when_first_row_incomplete() {
        let mut records = sample();
        records[0].fields[9] = None;

        let (filled, report) = repair(records.clone(), FillPolicy::ForwardFill);
        let (dropped, _) = repair(records, FillPolicy::Drop);

        assert!(report.degraded_to_drop);
        assert_eq!(filled, dropped);
        assert_eq!(filled.len(), 1);
    }

    #[test]
    fn test_backward_fill_degrades_when_last_row_incomplete() {
        let mut records = sample();
        records[3].fields[0] = None;

        let (filled, report) = repair(records.clone(), FillPolicy::BackwardFill);
        let (dropped, _) = repair(records, FillPolicy::Drop);

        assert!(report.degraded_to_drop);
        assert_eq!(filled, dropped);
    }

    #[test]
    fn test_repair_without_missing_is_identity() {
        let records = vec![
            row([2008., 1., 1., 0., 0., 0., 1., 2., 3., 4.]),
            row([2008., 1., 1., 1., 0., 0., 5., 6., 7., 8.]),
        ];

        for policy in FillPolicy::ALL {
            let (repaired, report) = repair(records.clone(), policy);
            assert_eq!(repaired, records);
            assert_eq!(report.rows_dropped, 0);
            assert_eq!(report.fields_filled, 0);
        }
    }

    #[test]
    fn test_repair_empty_input() {
        let (repaired, report) = repair(Vec::new(), FillPolicy::ForwardFill);
        assert!(repaired.is_empty());
        assert!(!report.degraded_to_drop);
    }
}

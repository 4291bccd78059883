use crate::error::{AppError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub const TIME_FIELDS: usize = 6;
pub const ZONE_FIELDS: usize = 4;
pub const RECORD_FIELDS: usize = TIME_FIELDS + ZONE_FIELDS;

/// One raw input row after sentinel substitution. `None` marks a missing field.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub fields: [Option<f64>; RECORD_FIELDS],
}

impl RawRecord {
    pub fn new(fields: [Option<f64>; RECORD_FIELDS]) -> Self {
        Self { fields }
    }

    pub fn has_missing(&self) -> bool {
        self.fields.iter().any(Option::is_none)
    }

    pub fn missing_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_none()).count()
    }

    /// Split a fully repaired record into its time and zone halves.
    ///
    /// Returns `None` if any field is still missing.
    pub fn split(&self) -> Option<(TimeVector, ZoneReading)> {
        let f = &self.fields;
        let time = TimeVector {
            year: f[0]? as i32,
            month: f[1]? as i32,
            day: f[2]? as i32,
            hour: f[3]? as i32,
            minute: f[4]? as i32,
            second: f[5]? as i32,
        };
        let zones = ZoneReading {
            zone1: f[6]?,
            zone2: f[7]?,
            zone3: f[8]?,
            zone4: f[9]?,
        };
        Some((time, zones))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeVector {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
}

impl TimeVector {
    pub fn new(year: i32, month: i32, day: i32, hour: i32, minute: i32, second: i32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Calendar timestamp for this vector, if it names a real date and time.
    ///
    /// Hour-of-day buckets carry a zero date and always yield `None`.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(
            self.year,
            u32::try_from(self.month).ok()?,
            u32::try_from(self.day).ok()?,
        )?;
        let time = NaiveTime::from_hms_opt(
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
            u32::try_from(self.second).ok()?,
        )?;
        Some(NaiveDateTime::new(date, time))
    }
}

/// Readings of the four metered zones, in watt-hours.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZoneReading {
    pub zone1: f64,
    pub zone2: f64,
    pub zone3: f64,
    pub zone4: f64,
}

impl ZoneReading {
    pub fn new(zone1: f64, zone2: f64, zone3: f64, zone4: f64) -> Self {
        Self {
            zone1,
            zone2,
            zone3,
            zone4,
        }
    }

    pub fn as_array(&self) -> [f64; ZONE_FIELDS] {
        [self.zone1, self.zone2, self.zone3, self.zone4]
    }

    /// Simultaneous consumption across all four zones.
    pub fn total(&self) -> f64 {
        self.zone1 + self.zone2 + self.zone3 + self.zone4
    }

    pub fn add(&self, other: &ZoneReading) -> ZoneReading {
        ZoneReading {
            zone1: self.zone1 + other.zone1,
            zone2: self.zone2 + other.zone2,
            zone3: self.zone3 + other.zone3,
            zone4: self.zone4 + other.zone4,
        }
    }

    pub fn divide(&self, divisor: f64) -> ZoneReading {
        ZoneReading {
            zone1: self.zone1 / divisor,
            zone2: self.zone2 / divisor,
            zone3: self.zone3 / divisor,
            zone4: self.zone4 / divisor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeVectorTable(pub Vec<TimeVector>);

impl TimeVectorTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeVector> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneTable(pub Vec<ZoneReading>);

impl ZoneTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ZoneReading> {
        self.0.iter()
    }

    /// Values of one zone column, `index` in `0..4`.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.0.iter().map(|z| z.as_array()[index]).collect()
    }

    /// Per-row sum of the four zones.
    pub fn combined(&self) -> Vec<f64> {
        self.0.iter().map(ZoneReading::total).collect()
    }
}

/// A time vector table and its row-aligned zone table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measurements {
    time_vectors: TimeVectorTable,
    zones: ZoneTable,
}

impl Measurements {
    pub fn new(time_vectors: TimeVectorTable, zones: ZoneTable) -> Result<Self> {
        if time_vectors.len() != zones.len() {
            return Err(AppError::InvalidArgument(format!(
                "Time vector table has {} rows but zone table has {}",
                time_vectors.len(),
                zones.len()
            )));
        }
        Ok(Self {
            time_vectors,
            zones,
        })
    }

    pub fn from_rows(rows: Vec<(TimeVector, ZoneReading)>) -> Self {
        let (time_vectors, zones): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        Self {
            time_vectors: TimeVectorTable(time_vectors),
            zones: ZoneTable(zones),
        }
    }

    pub fn time_vectors(&self) -> &TimeVectorTable {
        &self.time_vectors
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&TimeVector, &ZoneReading)> {
        self.time_vectors.iter().zip(self.zones.iter())
    }

    pub fn into_parts(self) -> (TimeVectorTable, ZoneTable) {
        (self.time_vectors, self.zones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_complete_record() {
        let record = RawRecord::new([
            Some(2008.0),
            Some(1.0),
            Some(2.0),
            Some(3.0),
            Some(4.0),
            Some(5.0),
            Some(10.0),
            Some(20.0),
            Some(30.0),
            Some(40.0),
        ]);

        let (time, zones) = record.split().unwrap();
        assert_eq!(time, TimeVector::new(2008, 1, 2, 3, 4, 5));
        assert_eq!(zones, ZoneReading::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn test_split_incomplete_record() {
        let mut fields = [Some(1.0); RECORD_FIELDS];
        fields[7] = None;
        let record = RawRecord::new(fields);

        assert!(record.has_missing());
        assert_eq!(record.missing_count(), 1);
        assert!(record.split().is_none());
    }

    #[test]
    fn test_to_datetime() {
        let time = TimeVector::new(2008, 2, 29, 23, 59, 0);
        assert_eq!(
            time.to_datetime().unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2008-02-29 23:59:00"
        );

        // Hour-of-day buckets have no calendar date
        assert!(TimeVector::new(0, 0, 0, 7, 0, 0).to_datetime().is_none());
    }

    #[test]
    fn test_measurements_rejects_misaligned_tables() {
        let result = Measurements::new(
            TimeVectorTable(vec![TimeVector::default()]),
            ZoneTable(vec![]),
        );
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_combined_column() {
        let zones = ZoneTable(vec![
            ZoneReading::new(1.0, 2.0, 3.0, 4.0),
            ZoneReading::new(5.0, 6.0, 7.0, 8.0),
        ]);
        assert_eq!(zones.combined(), vec![10.0, 26.0]);
        assert_eq!(zones.column(2), vec![3.0, 7.0]);
    }
}

//! Core data structures for sensor log processing.
//!
//! Defines the reconstructed record, the sensor fields it carries,
//! the source stamp taken from the log filename and per-file
//! extraction statistics.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sensor channels extracted from device-monitor logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    UsRaw,
    TimeOfFlight,
    Temp,
    Hum,
    Pres,
}

impl Field {
    /// All fields in output column order
    pub const ALL: [Field; 5] = [
        Field::UsRaw,
        Field::TimeOfFlight,
        Field::Temp,
        Field::Hum,
        Field::Pres,
    ];

    /// Output column name for this field
    pub fn column_name(&self) -> &'static str {
        match self {
            Field::UsRaw => "us_raw",
            Field::TimeOfFlight => "time_of_flight",
            Field::Temp => "temp",
            Field::Hum => "hum",
            Field::Pres => "pres",
        }
    }
}

/// One observation epoch reconstructed from the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: NaiveDateTime,
    /// Ultrasonic raw distance (mm)
    pub us_raw: Option<f64>,
    /// Time of flight (ns)
    pub time_of_flight: Option<f64>,
    /// Temperature (°C)
    pub temp: Option<f64>,
    /// Relative humidity (%)
    pub hum: Option<f64>,
    /// Pressure (kPa)
    pub pres: Option<f64>,
}

impl Record {
    /// Create an empty record for the given instant
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            us_raw: None,
            time_of_flight: None,
            temp: None,
            hum: None,
            pres: None,
        }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::UsRaw => self.us_raw,
            Field::TimeOfFlight => self.time_of_flight,
            Field::Temp => self.temp,
            Field::Hum => self.hum,
            Field::Pres => self.pres,
        }
    }

    /// Store a value, returning the one it replaced
    pub fn set(&mut self, field: Field, value: f64) -> Option<f64> {
        let slot = match field {
            Field::UsRaw => &mut self.us_raw,
            Field::TimeOfFlight => &mut self.time_of_flight,
            Field::Temp => &mut self.temp,
            Field::Hum => &mut self.hum,
            Field::Pres => &mut self.pres,
        };
        slot.replace(value)
    }

    /// True when no sensor field has been populated
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|field| self.get(*field).is_none())
    }
}

/// Date and capture time encoded in a log filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStamp {
    /// Calendar date applied to every record in the file
    pub date: NaiveDate,
    /// Time the capture was started; informational only
    pub capture_time: NaiveTime,
}

/// Per-file extraction statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub total_lines: usize,
    pub blank_lines: usize,
    pub separator_lines: usize,
    pub excluded_lines: usize,
    pub timestamp_lines: usize,
    pub fragment_lines: usize,
    /// Readouts discarded because they arrived before any timestamp
    pub fragments_dropped: usize,
    pub fields_written: usize,
    /// Field writes that replaced an earlier value on the same record
    pub fields_overwritten: usize,
    pub records_emitted: usize,
    pub empty_records: usize,
}

/// Result of converting one log file
#[derive(Debug, Clone, Default)]
pub struct FileReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub rows_written: usize,
    pub stats: ExtractionStats,
}

/// Summary of a batch conversion run
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub total_rows: usize,
    pub processing_time_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 6)
            .unwrap()
            .and_hms_milli_opt(10, 15, 30, 500)
            .unwrap()
    }

    #[test]
    fn test_new_record_is_empty() {
        let record = Record::new(instant());
        assert!(record.is_empty());
        for field in Field::ALL {
            assert_eq!(record.get(field), None);
        }
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut record = Record::new(instant());
        assert_eq!(record.set(Field::Temp, 21.3), None);
        assert_eq!(record.set(Field::Temp, 22.0), Some(21.3));
        assert_eq!(record.temp, Some(22.0));
        assert!(!record.is_empty());
    }

    #[test]
    fn test_column_names_follow_output_order() {
        let names: Vec<_> = Field::ALL.iter().map(|f| f.column_name()).collect();
        assert_eq!(&crate::constants::OUTPUT_COLUMNS[1..], names.as_slice());
    }
}

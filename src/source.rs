//! Source identifier parsing.
//!
//! Device-monitor logs are named `<prefix>-YYMMDD-HHMMSS.<ext>`. The date
//! token is the only calendar information the log carries; every record in
//! the file is stamped with it.

use crate::constants::{SOURCE_DATE_FORMAT, SOURCE_STAMP_DELIMITER, SOURCE_TIME_FORMAT};
use crate::error::{Result, SensorLogError};
use crate::models::SourceStamp;
use chrono::{NaiveDate, NaiveTime};
use std::path::Path;
use tracing::debug;

/// Extract the date and capture time from a log filename
pub fn parse_source_stamp(path: &Path) -> Result<SourceStamp> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SensorLogError::InvalidSourceName {
            path: path.to_path_buf(),
            reason: "File name is missing or not valid UTF-8".to_string(),
        })?;

    let mut tokens = stem.rsplitn(3, SOURCE_STAMP_DELIMITER);
    let time_token = tokens.next().unwrap_or_default();
    let date_token = tokens.next().ok_or_else(|| SensorLogError::InvalidSourceName {
        path: path.to_path_buf(),
        reason: format!("Expected a '-YYMMDD-HHMMSS' suffix in '{}'", stem),
    })?;

    for (token, what) in [(date_token, "date"), (time_token, "time")] {
        if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SensorLogError::InvalidSourceName {
                path: path.to_path_buf(),
                reason: format!("Expected a six-digit {} token, found '{}'", what, token),
            });
        }
    }

    let date = NaiveDate::parse_from_str(date_token, SOURCE_DATE_FORMAT).map_err(|source| {
        SensorLogError::InvalidSourceDate {
            path: path.to_path_buf(),
            value: date_token.to_string(),
            source,
        }
    })?;

    let capture_time =
        NaiveTime::parse_from_str(time_token, SOURCE_TIME_FORMAT).map_err(|source| {
            SensorLogError::InvalidSourceTime {
                path: path.to_path_buf(),
                value: time_token.to_string(),
                source,
            }
        })?;

    debug!(
        "Source stamp for {}: date={}, capture_time={}",
        path.display(),
        date,
        capture_time
    );

    Ok(SourceStamp { date, capture_time })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_monitor_name() {
        let stamp = parse_source_stamp(Path::new("../logs/device-monitor-251006-154357.log")).unwrap();
        assert_eq!(stamp.date, NaiveDate::from_ymd_opt(2025, 10, 6).unwrap());
        assert_eq!(stamp.capture_time, NaiveTime::from_hms_opt(15, 43, 57).unwrap());
    }

    #[test]
    fn test_parse_name_without_extension() {
        let stamp = parse_source_stamp(Path::new("monitor-240229-000000")).unwrap();
        assert_eq!(stamp.date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_missing_suffix_is_format_error() {
        let err = parse_source_stamp(Path::new("device.log")).unwrap_err();
        assert!(matches!(err, SensorLogError::InvalidSourceName { .. }));

        let err = parse_source_stamp(Path::new("device-monitor-2510-154357.log")).unwrap_err();
        assert!(matches!(err, SensorLogError::InvalidSourceName { .. }));
    }

    #[test]
    fn test_impossible_date_is_format_error() {
        let err = parse_source_stamp(Path::new("device-monitor-251306-154357.log")).unwrap_err();
        match err {
            SensorLogError::InvalidSourceDate { value, .. } => assert_eq!(value, "251306"),
            other => panic!("Expected InvalidSourceDate, got {other:?}"),
        }
    }

    #[test]
    fn test_impossible_capture_time_is_format_error() {
        let err = parse_source_stamp(Path::new("device-monitor-251006-256000.log")).unwrap_err();
        assert!(matches!(err, SensorLogError::InvalidSourceTime { .. }));
    }
}

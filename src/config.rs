//! Configuration for extraction, output and calibration.
//!
//! Defaults reproduce the device-monitor log format; CLI flags override
//! individual settings through the `with_*` builders.

use crate::constants::{
    EXCLUDED_CHANNELS, OUTPUT_DATETIME_FORMAT, SEPARATOR_LINE, calibration_columns,
    device_reference, fit_reference,
};
use crate::error::{Result, SensorLogError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported tabular output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Comma-separated text with a header row
    #[default]
    Csv,
    /// Apache Parquet
    Parquet,
}

impl OutputFormat {
    /// File extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }

    /// Infer the format from an output path, falling back to CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => OutputFormat::Parquet,
            _ => OutputFormat::Csv,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = SensorLogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(SensorLogError::Configuration {
                message: format!("Unknown output format '{}' (expected csv or parquet)", other),
            }),
        }
    }
}

/// Extraction and output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Channel keywords whose lines are dropped
    pub excluded_channels: Vec<String>,

    /// Exact separator text that marks an ignorable line
    pub separator: String,

    /// Drop records that never received a field value
    pub prune_empty_records: bool,

    /// Tabular output format
    pub output_format: OutputFormat,

    /// chrono format for the timestamp column in CSV output
    pub datetime_format: String,

    /// Maximum number of log files converted at once
    pub max_concurrent_files: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            excluded_channels: EXCLUDED_CHANNELS.iter().map(|s| s.to_string()).collect(),
            separator: SEPARATOR_LINE.to_string(),
            prune_empty_records: false,
            output_format: OutputFormat::Csv,
            datetime_format: OUTPUT_DATETIME_FORMAT.to_string(),
            max_concurrent_files: num_cpus::get(),
        }
    }
}

impl ExtractorConfig {
    /// Replace the excluded channel keywords
    pub fn with_excluded_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Add keywords on top of the defaults
    pub fn with_additional_exclusions<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_channels
            .extend(channels.into_iter().map(Into::into));
        self
    }

    /// Drop fully-null records at emission
    pub fn with_prune_empty_records(mut self, prune: bool) -> Self {
        self.prune_empty_records = prune;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_max_concurrent_files(mut self, max_files: usize) -> Self {
        self.max_concurrent_files = max_files;
        self
    }

    /// Reject settings that would make extraction meaningless
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(SensorLogError::Configuration {
                message: "Separator text must not be empty".to_string(),
            });
        }
        if let Some(blank) = self.excluded_channels.iter().find(|k| k.trim().is_empty()) {
            return Err(SensorLogError::Configuration {
                message: format!("Excluded channel keyword must not be blank: '{}'", blank),
            });
        }
        if self.max_concurrent_files == 0 {
            return Err(SensorLogError::Configuration {
                message: "At least one concurrent file is required".to_string(),
            });
        }
        Ok(())
    }
}

/// Column names of a calibration table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationColumns {
    pub real_distance: String,
    pub time_of_flight: String,
    pub temperature: String,
    pub humidity: String,
    pub pressure: String,
}

impl Default for CalibrationColumns {
    fn default() -> Self {
        Self {
            real_distance: calibration_columns::REAL_DISTANCE.to_string(),
            time_of_flight: calibration_columns::TIME_OF_FLIGHT.to_string(),
            temperature: calibration_columns::TEMPERATURE.to_string(),
            humidity: calibration_columns::HUMIDITY.to_string(),
            pressure: calibration_columns::PRESSURE.to_string(),
        }
    }
}

/// Reference point an environmental model is expressed around
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// Speed of sound at the reference point (m/s)
    pub speed_of_sound: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
}

impl ReferencePoint {
    /// Reference used when fitting models from measured tables
    pub fn fit() -> Self {
        Self {
            speed_of_sound: fit_reference::SPEED_OF_SOUND,
            temperature: fit_reference::TEMPERATURE,
            humidity: fit_reference::HUMIDITY,
            pressure: fit_reference::PRESSURE,
        }
    }

    /// Reference baked into the device firmware
    pub fn device() -> Self {
        Self {
            speed_of_sound: device_reference::SPEED_OF_SOUND,
            temperature: device_reference::TEMPERATURE,
            humidity: device_reference::HUMIDITY,
            pressure: device_reference::PRESSURE,
        }
    }
}

/// Calibration utility configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub columns: CalibrationColumns,
    /// Reference point models are fitted around
    pub fit_reference: ReferencePoint,
    /// Reference point compensation is applied around
    pub device_reference: ReferencePoint,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            columns: CalibrationColumns::default(),
            fit_reference: ReferencePoint::fit(),
            device_reference: ReferencePoint::device(),
        }
    }
}

impl CalibrationConfig {
    pub fn with_columns(mut self, columns: CalibrationColumns) -> Self {
        self.columns = columns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.excluded_channels.iter().any(|k| k == "Xg"));
        assert!(!config.prune_empty_records);
        assert_eq!(config.output_format, OutputFormat::Csv);
    }

    #[test]
    fn test_builders_override_defaults() {
        let config = ExtractorConfig::default()
            .with_additional_exclusions(["Gyro"])
            .with_prune_empty_records(true)
            .with_max_concurrent_files(2);
        assert!(config.excluded_channels.iter().any(|k| k == "Gyro"));
        assert!(config.excluded_channels.iter().any(|k| k == "Mic"));
        assert!(config.prune_empty_records);
        assert_eq!(config.max_concurrent_files, 2);
    }

    #[test]
    fn test_validation_rejects_blank_keyword() {
        let config = ExtractorConfig::default().with_excluded_channels(["Xg", " "]);
        assert!(matches!(
            config.validate(),
            Err(SensorLogError::Configuration { .. })
        ));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!(
            "parquet".parse::<OutputFormat>().unwrap(),
            OutputFormat::Parquet
        );
        assert!("xlsx".parse::<OutputFormat>().is_err());
        assert_eq!(
            OutputFormat::from_path(Path::new("out/data.PARQUET")),
            OutputFormat::Parquet
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("out/data.txt")),
            OutputFormat::Csv
        );
    }
}

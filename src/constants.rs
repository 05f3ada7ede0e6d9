//! Application constants for the sensor log processor
//!
//! Log-format markers, channel keywords, output column names and the
//! reference values used by the calibration utilities.

// =============================================================================
// Log Format Markers
// =============================================================================

/// Visual separator printed by the device monitor between readout blocks
pub const SEPARATOR_LINE: &str = "-----------------------------------------------------------";

/// Channel keywords whose lines are dropped wholesale.
///
/// Matching is a plain substring test against the whole line, so a line that
/// mentions any of these is discarded even if it also carries a wanted field.
pub const EXCLUDED_CHANNELS: &[&str] = &["Alt", "Xg", "Yg", "Zg", "Mic", "EMF", "Light", "AIN"];

/// Timestamp marker: fixed-width clock time followed by the `>` delimiter
pub const TIMESTAMP_PATTERN: &str = r"^(\d{2}:\d{2}:\d{2}\.\d{3}) >";

/// chrono format for the captured clock time
pub const CLOCK_TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Log file extension picked up when walking directories
pub const LOG_FILE_EXTENSION: &str = "log";

// =============================================================================
// Source Identifier
// =============================================================================

/// chrono format of the six-digit date token in the filename
pub const SOURCE_DATE_FORMAT: &str = "%y%m%d";

/// chrono format of the six-digit capture time token in the filename
pub const SOURCE_TIME_FORMAT: &str = "%H%M%S";

/// Delimiter between the filename prefix, date and time tokens
pub const SOURCE_STAMP_DELIMITER: char = '-';

// =============================================================================
// Output Columns
// =============================================================================

/// Name of the timestamp column
pub const TIMESTAMP_COLUMN: &str = "datetime";

/// Output header, in emission order
pub const OUTPUT_COLUMNS: &[&str] = &[
    TIMESTAMP_COLUMN,
    "us_raw",
    "time_of_flight",
    "temp",
    "hum",
    "pres",
];

/// Rendering of the timestamp column in CSV output
pub const OUTPUT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Column appended by the `compensate` command
pub const COMPENSATED_DISTANCE_COLUMN: &str = "compensated_distance";

// =============================================================================
// Calibration Reference Values
// =============================================================================

/// Reference values used when fitting calibration models from a measured table
pub mod fit_reference {
    /// Nominal speed of sound (m/s) subtracted from the measured speed
    pub const SPEED_OF_SOUND: f64 = 343.5;
    /// Reference temperature (°C)
    pub const TEMPERATURE: f64 = 20.0;
    /// Reference relative humidity (fraction)
    pub const HUMIDITY: f64 = 0.0;
    /// Reference pressure (kPa)
    pub const PRESSURE: f64 = 100.0;
}

/// Reference values baked into the on-device range compensation
pub mod device_reference {
    /// Speed of sound at the reference point (m/s)
    pub const SPEED_OF_SOUND: f64 = 331.45;
    /// Reference temperature (°C)
    pub const TEMPERATURE: f64 = 20.0;
    /// Reference relative humidity (%)
    pub const HUMIDITY: f64 = 0.0;
    /// Reference pressure (kPa)
    pub const PRESSURE: f64 = 101.325;
    /// Speed of sound (mm/s) the firmware assumes when reporting raw distance
    pub const RAW_DISTANCE_SPEED_MM_S: f64 = 343_500.0;
}

/// Default calibration table column names
pub mod calibration_columns {
    pub const REAL_DISTANCE: &str = "real_distance(mm)";
    pub const TIME_OF_FLIGHT: &str = "time_of_flight(ns)";
    pub const TEMPERATURE: &str = "temperature(C)";
    pub const HUMIDITY: &str = "humidity(%)";
    pub const PRESSURE: &str = "pressure(kPa)";
}

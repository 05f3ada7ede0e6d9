//! Error handling for sensor log processing.
//!
//! Distinguishes fatal format errors on the source identifier, line-level
//! data errors inside a log, and failures of the tabular sink and the
//! calibration utilities.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SensorLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Input not found at path: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Invalid source name: {path} - {reason}")]
    InvalidSourceName { path: PathBuf, reason: String },

    #[error("Invalid date '{value}' in source name: {path}")]
    InvalidSourceDate {
        path: PathBuf,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid capture time '{value}' in source name: {path}")]
    InvalidSourceTime {
        path: PathBuf,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid clock time on line {line_number}: '{line}'")]
    InvalidClockTime {
        line_number: usize,
        line: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Malformed {field} value '{value}' on line {line_number}: '{line}'")]
    MalformedField {
        line_number: usize,
        field: &'static str,
        value: String,
        line: String,
    },

    #[error("Extraction failed for file: {path} - {source}")]
    ExtractionFailed {
        path: PathBuf,
        #[source]
        source: Box<SensorLogError>,
    },

    #[error("Output failed for file: {path} - {reason}")]
    OutputFailed { path: PathBuf, reason: String },

    #[error("Required column '{column}' not found in table: {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Not enough rows to fit model: need at least {needed}, found {found}")]
    InsufficientData { needed: usize, found: usize },

    #[error("Least-squares system is singular: {reason}")]
    SingularSystem { reason: String },

    #[error("No input log files matched: {pattern}")]
    NoInputFiles { pattern: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl SensorLogError {
    /// Attach the source file to an error raised while traversing it
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ Self::ExtractionFailed { .. } => already,
            other => Self::ExtractionFailed {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// True for errors that describe the content of the input rather than
    /// the environment (I/O, sink)
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::InvalidSourceName { .. }
            | Self::InvalidSourceDate { .. }
            | Self::InvalidSourceTime { .. }
            | Self::InvalidClockTime { .. }
            | Self::MalformedField { .. } => true,
            Self::ExtractionFailed { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SensorLogError>;

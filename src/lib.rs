//! Sensor Log Processor Library
//!
//! Converts the human-readable logs captured by a multi-sensor device
//! monitor into time-indexed tables, and calibrates the ultrasonic range
//! channel against environmental readings.
//!
//! This library provides tools for:
//! - Classifying log lines (separators, excluded channels, timestamps, readouts)
//! - Building one record per timestamp with last-write-wins field values
//! - Writing records as CSV or Parquet through polars
//! - Converting many logs concurrently
//! - Fitting speed-of-sound and distance models and compensating raw ranges

pub mod builder;
pub mod calibration;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod extractor;
pub mod fields;
pub mod models;
pub mod processor;
pub mod source;
pub mod table;
pub mod writer;

pub use config::{CalibrationConfig, ExtractorConfig, OutputFormat};
pub use error::{Result, SensorLogError};
pub use extractor::{Extraction, LogExtractor};
pub use models::{ExtractionStats, Field, FileReport, ProcessingStats, Record, SourceStamp};
pub use processor::BatchProcessor;
pub use writer::RecordWriter;

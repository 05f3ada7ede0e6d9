//! Tabular emission of extracted records.
//!
//! Records become a six-column DataFrame in fixed order (timestamp, then
//! the five sensor fields) with one row per record in creation order.
//! Missing values stay null, which the CSV sink renders as an empty cell.

use crate::config::{ExtractorConfig, OutputFormat};
use crate::constants::TIMESTAMP_COLUMN;
use crate::error::{Result, SensorLogError};
use crate::models::{Field, Record};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Build the output frame for a record sequence
pub fn records_to_dataframe(records: &[Record]) -> Result<DataFrame> {
    let timestamps = DatetimeChunked::from_naive_datetime(
        TIMESTAMP_COLUMN.into(),
        records.iter().map(|r| r.timestamp),
        TimeUnit::Milliseconds,
    );

    let mut columns: Vec<Column> = Vec::with_capacity(Field::ALL.len() + 1);
    columns.push(Column::from(timestamps.into_series()));

    for field in Field::ALL {
        let values: Vec<Option<f64>> = records.iter().map(|r| r.get(field)).collect();
        columns.push(Column::new(field.column_name().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Writes record sequences to the configured tabular sink
#[derive(Debug, Clone)]
pub struct RecordWriter {
    output_path: PathBuf,
    format: OutputFormat,
    datetime_format: String,
    prune_empty_records: bool,
}

impl RecordWriter {
    pub fn new(output_path: PathBuf, config: &ExtractorConfig) -> Self {
        Self {
            output_path,
            format: config.output_format,
            datetime_format: config.datetime_format.clone(),
            prune_empty_records: config.prune_empty_records,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write `records`, returning the number of rows emitted
    pub fn write(&self, records: &[Record]) -> Result<usize> {
        let kept: Vec<Record>;
        let rows = if self.prune_empty_records {
            kept = records.iter().filter(|r| !r.is_empty()).cloned().collect();
            debug!(
                "Pruned {} empty records before writing",
                records.len() - kept.len()
            );
            kept.as_slice()
        } else {
            records
        };

        let mut df = records_to_dataframe(rows)?;

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        match self.format {
            OutputFormat::Csv => write_csv(&mut df, &self.output_path, &self.datetime_format)?,
            OutputFormat::Parquet => write_parquet(&mut df, &self.output_path)?,
        }

        debug!(
            "Wrote {} rows to {} as {:?}",
            df.height(),
            self.output_path.display(),
            self.format
        );

        Ok(df.height())
    }
}

/// Write a frame as CSV with a header row; nulls become empty cells
pub fn write_csv(df: &mut DataFrame, path: &Path, datetime_format: &str) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(datetime_format.to_string()))
        .with_null_value(String::new())
        .finish(df)
        .map_err(|e| SensorLogError::OutputFailed {
            path: path.to_path_buf(),
            reason: format!("Failed to write CSV: {}", e),
        })
}

/// Write a frame as Parquet
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    ParquetWriter::new(file)
        .finish(df)
        .map(|_| ())
        .map_err(|e| SensorLogError::OutputFailed {
            path: path.to_path_buf(),
            reason: format!("Failed to write parquet: {}", e),
        })
}

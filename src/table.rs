//! Rectangular table loading for the calibration utilities.
//!
//! Reads a CSV table with a header row and hands back named numeric
//! columns as `f64` vectors.

use crate::error::{Result, SensorLogError};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A loaded table plus the path it came from, for error context
#[derive(Debug, Clone)]
pub struct NumericTable {
    path: PathBuf,
    frame: DataFrame,
}

impl NumericTable {
    /// Load a CSV table with a header row
    pub fn load_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SensorLogError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        debug!(
            "Loaded table {} with {} rows and columns {:?}",
            path.display(),
            frame.height(),
            frame.get_column_names()
        );

        Ok(Self {
            path: path.to_path_buf(),
            frame,
        })
    }

    pub fn from_frame(path: impl Into<PathBuf>, frame: DataFrame) -> Self {
        Self {
            path: path.into(),
            frame,
        }
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// A column cast to `f64`; unparseable or empty cells become `None`
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| SensorLogError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })?;

        let series = column
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        Ok(series.f64()?.into_iter().collect())
    }

    /// Several columns restricted to the rows where every one has a value
    pub fn complete_rows(&self, names: &[&str]) -> Result<Vec<Vec<f64>>> {
        let columns = names
            .iter()
            .map(|name| self.numeric_column(name))
            .collect::<Result<Vec<_>>>()?;

        let rows: Vec<Vec<f64>> = (0..self.height())
            .filter_map(|row| columns.iter().map(|column| column[row]).collect())
            .collect();

        if rows.len() < self.height() {
            debug!(
                "Skipped {} incomplete rows in {}",
                self.height() - rows.len(),
                self.path.display()
            );
        }

        Ok(rows)
    }
}

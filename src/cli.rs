//! Command-line interface definitions.

use crate::config::{CalibrationColumns, OutputFormat};
use crate::constants::calibration_columns;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sensorlog_processor")]
#[command(about = "Convert device-monitor sensor logs to tabular data and calibrate the range channel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract records from device-monitor logs
    Extract(ExtractArgs),
    /// Fit calibration models from a measured table
    Fit(FitArgs),
    /// Add a compensated distance column to an extracted CSV
    Compensate(CompensateArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ExtractArgs {
    /// Log files, directories (searched for *.log) or glob patterns
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Output file; only valid with a single input
    #[arg(short, long, conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory for converted files (default: next to each input)
    #[arg(short = 'd', long)]
    pub output_dir: Option<PathBuf>,

    /// Output format (csv, parquet); inferred from --output when omitted
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Drop records that received no field values
    #[arg(long)]
    pub prune_empty: bool,

    /// Extra channel keywords whose lines are discarded
    #[arg(short = 'x', long = "exclude", value_name = "KEYWORD", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Number of files converted concurrently (default: CPU count)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl ExtractArgs {
    /// Output format from the flag, or from the explicit output path
    pub fn output_format(&self) -> OutputFormat {
        match (self.format, &self.output) {
            (Some(format), _) => format,
            (None, Some(path)) => OutputFormat::from_path(path),
            (None, None) => OutputFormat::default(),
        }
    }
}

/// Which calibration model(s) to fit
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitModel {
    Speed,
    Distance,
    Both,
}

/// Column-name overrides shared by the calibration commands
#[derive(ClapArgs, Debug, Clone)]
pub struct ColumnArgs {
    #[arg(long, default_value = calibration_columns::REAL_DISTANCE)]
    pub distance_column: String,

    #[arg(long, default_value = calibration_columns::TIME_OF_FLIGHT)]
    pub tof_column: String,

    #[arg(long, default_value = calibration_columns::TEMPERATURE)]
    pub temperature_column: String,

    #[arg(long, default_value = calibration_columns::HUMIDITY)]
    pub humidity_column: String,

    #[arg(long, default_value = calibration_columns::PRESSURE)]
    pub pressure_column: String,
}

impl From<&ColumnArgs> for CalibrationColumns {
    fn from(args: &ColumnArgs) -> Self {
        Self {
            real_distance: args.distance_column.clone(),
            time_of_flight: args.tof_column.clone(),
            temperature: args.temperature_column.clone(),
            humidity: args.humidity_column.clone(),
            pressure: args.pressure_column.clone(),
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct FitArgs {
    /// Calibration table (CSV with a header row)
    #[arg(value_name = "TABLE")]
    pub table: PathBuf,

    #[arg(short, long, value_enum, default_value = "both")]
    pub model: FitModel,

    /// Print per-row predictions for the distance model
    #[arg(long)]
    pub details: bool,

    #[command(flatten)]
    pub columns: ColumnArgs,
}

/// Model applied by `compensate`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensateModel {
    Speed,
    Distance,
}

impl CompensateModel {
    pub fn coefficient_count(&self) -> usize {
        match self {
            CompensateModel::Speed => 3,
            CompensateModel::Distance => 5,
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct CompensateArgs {
    /// Extracted CSV (as written by `extract`)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output CSV (default: <input stem>_compensated.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "distance")]
    pub model: CompensateModel,

    /// Fit the model from this calibration table
    #[arg(short, long, required_unless_present = "coefficients")]
    pub table: Option<PathBuf>,

    /// Model coefficients: a_t,a_rh,a_p (speed) or a0,a1,b0,b1,b2 (distance)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        conflicts_with = "table"
    )]
    pub coefficients: Option<Vec<f64>>,

    #[command(flatten)]
    pub columns: ColumnArgs,
}

impl CompensateArgs {
    pub fn get_output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => {
                let stem = self
                    .input
                    .file_stem()
                    .unwrap_or_default()
                    .to_string_lossy();
                self.input.with_file_name(format!("{}_compensated.csv", stem))
            }
        }
    }
}

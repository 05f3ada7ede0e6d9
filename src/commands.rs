//! Command implementations behind the CLI.
//!
//! Each command returns [`ProcessingStats`]; the binary maps
//! `files_failed > 0` to a failing exit code.

use crate::calibration::{
    CompensationModel, DistanceCoefficients, DistanceFit, RangeCompensator, SpeedCoefficients,
    SpeedOfSoundFit, load_samples,
};
use crate::cli::{Args, Command, CompensateArgs, CompensateModel, ExtractArgs, FitArgs, FitModel};
use crate::config::{CalibrationConfig, ExtractorConfig};
use crate::constants::{COMPENSATED_DISTANCE_COLUMN, OUTPUT_DATETIME_FORMAT};
use crate::error::{Result, SensorLogError};
use crate::models::{Field, ProcessingStats};
use crate::processor::{BatchProcessor, OutputTarget, discover_inputs};
use crate::table::NumericTable;
use crate::writer::write_csv;

use anyhow::Context;
use colored::*;
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    // RUST_LOG wins over the command-line level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sensorlog_processor={}", log_level)));

    if args.quiet {
        // Compact, no timer
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .map_err(|e| SensorLogError::Configuration {
                message: format!("Failed to initialise logging: {}", e),
            })?;
    } else {
        // Uptime-stamped lines on stderr
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| SensorLogError::Configuration {
                message: format!("Failed to initialise logging: {}", e),
            })?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Dispatch the parsed command line
pub async fn run(args: Args) -> anyhow::Result<ProcessingStats> {
    setup_logging(&args)?;
    let show_progress = !args.quiet;

    match args.command {
        Command::Extract(extract) => run_extract(extract, show_progress).await,
        Command::Fit(fit) => run_fit(fit),
        Command::Compensate(compensate) => run_compensate(compensate),
    }
}

/// Build the extraction config from command-line overrides
pub fn extractor_config(args: &ExtractArgs) -> ExtractorConfig {
    let mut config = ExtractorConfig::default()
        .with_additional_exclusions(args.exclude.iter().cloned())
        .with_prune_empty_records(args.prune_empty)
        .with_output_format(args.output_format());
    if let Some(jobs) = args.jobs {
        config = config.with_max_concurrent_files(jobs);
    }
    config
}

async fn run_extract(args: ExtractArgs, show_progress: bool) -> anyhow::Result<ProcessingStats> {
    let inputs = discover_inputs(&args.inputs).context("Failed to resolve input logs")?;

    // Explicit file, output directory, or next to each input
    let target = match (&args.output, &args.output_dir) {
        (Some(file), _) => OutputTarget::File(file.clone()),
        (None, Some(dir)) => OutputTarget::Directory(dir.clone()),
        (None, None) => OutputTarget::AlongsideInput,
    };

    let processor = BatchProcessor::new(extractor_config(&args))
        .context("Invalid extraction settings")?
        .with_output_target(target)
        .with_progress(show_progress);

    let (stats, _reports) = processor.process(&inputs).await?;
    Ok(stats)
}

fn run_fit(args: FitArgs) -> anyhow::Result<ProcessingStats> {
    let start_time = Instant::now();
    let config = CalibrationConfig::default().with_columns((&args.columns).into());

    let table = NumericTable::load_csv(&args.table)
        .with_context(|| format!("Failed to load calibration table {}", args.table.display()))?;
    let samples = load_samples(&table, &config.columns)?;

    println!(
        "{} {} ({} samples)",
        "Calibration table:".bright_cyan(),
        args.table.display(),
        samples.len().to_string().bright_white().bold()
    );

    // Fit requested models
    if matches!(args.model, FitModel::Speed | FitModel::Both) {
        let fit = SpeedOfSoundFit::fit(&samples, config.fit_reference)
            .context("Speed-of-sound model fit failed")?;
        print_speed_fit(&fit);
    }

    if matches!(args.model, FitModel::Distance | FitModel::Both) {
        let fit = DistanceFit::fit(&samples, config.fit_reference)
            .context("Distance model fit failed")?;
        print_distance_fit(&fit, args.details);
    }

    Ok(ProcessingStats {
        files_processed: 1,
        files_failed: 0,
        total_rows: samples.len(),
        processing_time_ms: start_time.elapsed().as_millis(),
    })
}

fn print_speed_fit(fit: &SpeedOfSoundFit) {
    let c = &fit.coefficients;
    println!("\n{}", "Speed-of-sound model".bright_green().bold());
    println!(
        "  c = {} + a_t·(T - {}) + a_rh·(RH/100 - {}) + a_p·(P - {})",
        fit.reference.speed_of_sound,
        fit.reference.temperature,
        fit.reference.humidity,
        fit.reference.pressure
    );
    println!("  {} {:.6}", "a_t: ".bright_cyan(), c.a_t);
    println!("  {} {:.6}", "a_rh:".bright_cyan(), c.a_rh);
    println!("  {} {:.6}", "a_p: ".bright_cyan(), c.a_p);
    println!(
        "  {} {}",
        "R²:  ".bright_cyan(),
        format!("{:.6}", fit.r_squared).bright_white().bold()
    );
}

fn print_distance_fit(fit: &DistanceFit, details: bool) {
    let c = &fit.coefficients;
    let m = &fit.metrics;
    println!("\n{}", "Distance model".bright_green().bold());
    println!("  d = a0 + a1·tof + b0·Δt·tof + b1·Δrh·tof + b2·Δp·tof");
    println!("  {} {:.6e}", "a0:".bright_cyan(), c.a0);
    println!("  {} {:.6e}", "a1:".bright_cyan(), c.a1);
    println!("  {} {:.6e}", "b0:".bright_cyan(), c.b0);
    println!("  {} {:.6e}", "b1:".bright_cyan(), c.b1);
    println!("  {} {:.6e}", "b2:".bright_cyan(), c.b2);
    println!(
        "  {} {}",
        "R²:".bright_cyan(),
        format!("{:.6}", m.r_squared).bright_white().bold()
    );
    println!("  {} {:.6}", "MSE:".bright_cyan(), m.mse);
    println!("  {} {:.6}", "RMSE:".bright_cyan(), m.rmse);
    println!("  {} {:.6}", "MAE:".bright_cyan(), m.mae);
    println!(
        "  {} {:.4}% mean, {:.4}% max",
        "Relative error:".bright_cyan(),
        m.mean_relative_error,
        m.max_relative_error
    );

    if details {
        println!(
            "\n  {:>12} {:>12} {:>10} {:>9}",
            "actual", "predicted", "residual", "rel.err%"
        );
        for p in &fit.predictions {
            println!(
                "  {:>12.3} {:>12.3} {:>10.4} {:>9.4}",
                p.actual, p.predicted, p.residual, p.relative_error
            );
        }
    }
}

fn run_compensate(args: CompensateArgs) -> anyhow::Result<ProcessingStats> {
    let start_time = Instant::now();
    let config = CalibrationConfig::default().with_columns((&args.columns).into());
    let compensator = build_compensator(&args, &config)?;

    let output = args.get_output_path();
    let rows = compensate_file(&args.input, &output, &compensator)
        .with_context(|| format!("Failed to compensate {}", args.input.display()))?;

    println!(
        "{} {} rows -> {}",
        "Compensated".bright_green(),
        rows.to_string().bright_white().bold(),
        output.display()
    );

    Ok(ProcessingStats {
        files_processed: 1,
        files_failed: 0,
        total_rows: rows,
        processing_time_ms: start_time.elapsed().as_millis(),
    })
}

fn build_compensator(
    args: &CompensateArgs,
    config: &CalibrationConfig,
) -> anyhow::Result<RangeCompensator> {
    let model = match (&args.coefficients, &args.table) {
        (Some(values), _) => model_from_coefficients(args.model, values)?,
        (None, Some(table_path)) => {
            let table = NumericTable::load_csv(table_path).with_context(|| {
                format!("Failed to load calibration table {}", table_path.display())
            })?;
            let samples = load_samples(&table, &config.columns)?;
            match args.model {
                CompensateModel::Speed => CompensationModel::Speed(
                    SpeedOfSoundFit::fit(&samples, config.fit_reference)?.coefficients,
                ),
                CompensateModel::Distance => CompensationModel::Distance(
                    DistanceFit::fit(&samples, config.fit_reference)?.coefficients,
                ),
            }
        }
        (None, None) => anyhow::bail!("Either --table or --coefficients is required"),
    };

    info!("Compensating with {:?}", model);
    Ok(RangeCompensator::new(model, config.device_reference))
}

/// Turn a flat coefficient list into a compensation model
pub fn model_from_coefficients(model: CompensateModel, values: &[f64]) -> Result<CompensationModel> {
    if values.len() != model.coefficient_count() {
        return Err(SensorLogError::Configuration {
            message: format!(
                "{:?} model takes {} coefficients, got {}",
                model,
                model.coefficient_count(),
                values.len()
            ),
        });
    }

    Ok(match model {
        CompensateModel::Speed => CompensationModel::Speed(SpeedCoefficients {
            a_t: values[0],
            a_rh: values[1],
            a_p: values[2],
        }),
        CompensateModel::Distance => CompensationModel::Distance(DistanceCoefficients {
            a0: values[0],
            a1: values[1],
            b0: values[2],
            b1: values[3],
            b2: values[4],
        }),
    })
}

/// Read an extracted CSV, append the compensated distance and write it out.
///
/// Rows missing any of the raw distance, temperature, humidity or pressure
/// get a null compensated distance. Returns the number of rows written.
pub fn compensate_file(input: &Path, output: &Path, compensator: &RangeCompensator) -> Result<usize> {
    let table = NumericTable::load_csv(input)?;

    let raw = table.numeric_column(Field::UsRaw.column_name())?;
    let temp = table.numeric_column(Field::Temp.column_name())?;
    let hum = table.numeric_column(Field::Hum.column_name())?;
    let pres = table.numeric_column(Field::Pres.column_name())?;

    let compensated: Vec<Option<f64>> = (0..table.height())
        .map(|row| match (raw[row], temp[row], hum[row], pres[row]) {
            (Some(d), Some(t), Some(h), Some(p)) => Some(compensator.compensate(d, t, h, p)),
            _ => None,
        })
        .collect();

    let filled = compensated.iter().filter(|v| v.is_some()).count();
    debug!(
        "Compensated {} of {} rows in {}",
        filled,
        compensated.len(),
        input.display()
    );

    let mut frame = table.into_frame();
    frame.with_column(Column::new(COMPENSATED_DISTANCE_COLUMN.into(), compensated))?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_csv(&mut frame, output, OUTPUT_DATETIME_FORMAT)?;

    Ok(frame.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity_compensator() -> RangeCompensator {
        // a1 = raw-distance speed / 2 in mm/ns gives back the raw distance
        RangeCompensator::device(CompensationModel::Distance(DistanceCoefficients {
            a0: 0.0,
            a1: 343_500.0 / 2.0 * 1e-9,
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
        }))
    }

    #[test]
    fn test_coefficient_count_is_checked() {
        assert!(model_from_coefficients(CompensateModel::Speed, &[0.6, 0.0, 0.0]).is_ok());
        assert!(matches!(
            model_from_coefficients(CompensateModel::Distance, &[1.0, 2.0]),
            Err(SensorLogError::Configuration { .. })
        ));
    }

    #[test]
    fn test_compensate_file_appends_column() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("run.csv");
        let output = temp_dir.path().join("out").join("run_compensated.csv");
        std::fs::write(
            &input,
            "datetime,us_raw,time_of_flight,temp,hum,pres\n\
             2025-10-06T10:00:00.000,250.0,,20.0,40.0,101.3\n\
             2025-10-06T10:00:01.000,,,20.0,40.0,101.3\n",
        )
        .unwrap();

        let rows = compensate_file(&input, &output, &identity_compensator()).unwrap();
        assert_eq!(rows, 2);

        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "datetime,us_raw,time_of_flight,temp,hum,pres,compensated_distance"
        );
        assert!(lines[1].starts_with("2025-10-06T10:00:00.000,250"));
        let value: f64 = lines[1].rsplit(',').next().unwrap().parse().unwrap();
        assert!((value - 250.0).abs() < 1e-6);
        assert!(lines[2].ends_with(','));
    }

    #[test]
    fn test_compensate_file_requires_columns() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("other.csv");
        std::fs::write(&input, "a,b\n1,2\n").unwrap();

        let err = compensate_file(&input, &temp_dir.path().join("o.csv"), &identity_compensator())
            .unwrap_err();
        assert!(matches!(err, SensorLogError::MissingColumn { .. }));
    }

    #[test]
    fn test_extractor_config_from_arguments() {
        use clap::Parser;
        let args = Args::parse_from([
            "sensorlog_processor",
            "extract",
            "a.log",
            "-x",
            "Gyro",
            "-j",
            "3",
            "--format",
            "parquet",
        ]);
        let Command::Extract(extract) = args.command else {
            panic!("Expected extract");
        };
        let config = extractor_config(&extract);
        assert!(config.excluded_channels.iter().any(|k| k == "Gyro"));
        assert!(config.excluded_channels.iter().any(|k| k == "AIN"));
        assert_eq!(config.max_concurrent_files, 3);
        assert_eq!(config.output_format.extension(), "parquet");
    }
}

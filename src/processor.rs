//! Batch conversion of device-monitor logs.
//!
//! Resolves the inputs named on the command line (files, directories and
//! glob patterns), then converts each log independently on the blocking
//! pool with bounded concurrency. A failing file is reported and counted;
//! it never stops the other files.

use crate::config::ExtractorConfig;
use crate::constants::LOG_FILE_EXTENSION;
use crate::error::{Result, SensorLogError};
use crate::extractor::LogExtractor;
use crate::models::{FileReport, ProcessingStats};
use crate::writer::RecordWriter;

use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Where converted files are written
#[derive(Debug, Clone, Default)]
pub enum OutputTarget {
    /// Next to each input log
    #[default]
    AlongsideInput,
    /// `<dir>/<stem>.<ext>` for every input
    Directory(PathBuf),
    /// One explicit path; only valid for a single input
    File(PathBuf),
}

/// Converts a set of log files to tabular output
pub struct BatchProcessor {
    config: Arc<ExtractorConfig>,
    target: OutputTarget,
    show_progress: bool,
}

impl BatchProcessor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            target: OutputTarget::default(),
            show_progress: true,
        })
    }

    pub fn with_output_target(mut self, target: OutputTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Output path for one input, following the configured target
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let file_name = output_file_name(input, self.config.output_format.extension());
        match &self.target {
            OutputTarget::File(path) => path.clone(),
            OutputTarget::Directory(dir) => dir.join(file_name),
            OutputTarget::AlongsideInput => input.with_file_name(file_name),
        }
    }

    /// Pair every input with its output path.
    ///
    /// Fails before anything is written if two inputs would share an output
    /// or an output would overwrite its own input.
    pub fn plan_outputs(&self, inputs: &[PathBuf]) -> Result<Vec<(PathBuf, PathBuf)>> {
        if matches!(self.target, OutputTarget::File(_)) && inputs.len() > 1 {
            return Err(SensorLogError::Configuration {
                message: format!(
                    "An explicit output file needs exactly one input, got {}",
                    inputs.len()
                ),
            });
        }

        let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
        let mut plan = Vec::with_capacity(inputs.len());

        for input in inputs {
            let output = self.output_path_for(input);

            if output == *input {
                return Err(SensorLogError::Configuration {
                    message: format!(
                        "Output for {} would overwrite the input itself",
                        input.display()
                    ),
                });
            }
            if let Some(previous) = claimed.insert(output.clone(), input.as_path()) {
                return Err(SensorLogError::Configuration {
                    message: format!(
                        "{} and {} would both be written to {}",
                        previous.display(),
                        input.display(),
                        output.display()
                    ),
                });
            }

            plan.push((input.clone(), output));
        }

        Ok(plan)
    }

    /// Convert every input, returning aggregate statistics and one report
    /// per successfully converted file
    pub async fn process(&self, inputs: &[PathBuf]) -> Result<(ProcessingStats, Vec<FileReport>)> {
        let start_time = Instant::now();

        // Resolve every output up front so collisions fail before any write
        let plan = self.plan_outputs(inputs)?;

        if self.show_progress {
            println!("{}", "Converting sensor logs".bright_green().bold());
            println!(
                "  {} {}",
                "Files:".bright_cyan(),
                inputs.len().to_string().bright_white().bold()
            );
            println!(
                "  {} {:?}",
                "Format:".bright_cyan(),
                self.config.output_format
            );
        }

        let pb = if self.show_progress {
            create_progress_bar(inputs.len() as u64, "Converting logs")
        } else {
            ProgressBar::hidden()
        };

        let concurrent_limit = self.config.max_concurrent_files.max(1);
        debug!(
            "Converting {} files with up to {} at a time",
            inputs.len(),
            concurrent_limit
        );

        // Convert files concurrently; failures are counted, not propagated
        let (mut reports, failed) = stream::iter(plan)
            .map(|(input, output)| {
                let config = Arc::clone(&self.config);
                let pb = pb.clone();
                async move {
                    if let Some(file_name) = input.file_name() {
                        pb.set_message(format!("Converting: {}", file_name.to_string_lossy()));
                    }

                    let result = task::spawn_blocking({
                        let input = input.clone();
                        move || convert_file(&config, &input, output)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        Err(SensorLogError::ProcessingInterrupted {
                            reason: format!("Conversion task failed: {}", e),
                        })
                    });
                    pb.inc(1);

                    if let Err(e) = &result {
                        error!("Failed to convert {}: {}", input.display(), e);
                    }
                    result
                }
            })
            .buffer_unordered(concurrent_limit)
            .fold(
                (Vec::new(), 0usize),
                |(mut reports, failed), result| async move {
                    match result {
                        Ok(report) => {
                            reports.push(report);
                            (reports, failed)
                        }
                        Err(_) => (reports, failed + 1),
                    }
                },
            )
            .await;

        pb.finish_with_message("All logs converted");

        // Deterministic report order regardless of completion order

        reports.sort_by(|a, b| a.input_path.cmp(&b.input_path));

        let stats = ProcessingStats {
            files_processed: reports.len(),
            files_failed: failed,
            total_rows: reports.iter().map(|r| r.rows_written).sum(),
            processing_time_ms: start_time.elapsed().as_millis(),
        };

        if self.show_progress {
            print_summary(&stats, &reports);
        }
        info!(
            "Converted {} files ({} failed), {} rows",
            stats.files_processed, stats.files_failed, stats.total_rows
        );

        Ok((stats, reports))
    }
}

/// Extract one log and write it to `output`
pub fn convert_file(config: &ExtractorConfig, input: &Path, output: PathBuf) -> Result<FileReport> {
    let extractor = LogExtractor::new(config);
    let (stamp, extraction) = extractor.extract_file(input)?;

    let writer = RecordWriter::new(output, config);
    let rows_written = writer.write(&extraction.records)?;

    debug!(
        "{} (captured {} {}): {} records, {} rows written to {}",
        input.display(),
        stamp.date,
        stamp.capture_time,
        extraction.records.len(),
        rows_written,
        writer.output_path().display()
    );

    Ok(FileReport {
        input_path: input.to_path_buf(),
        output_path: writer.output_path().to_path_buf(),
        rows_written,
        stats: extraction.stats,
    })
}

/// `<stem>.<extension>` for an input log
fn output_file_name(input: &Path, extension: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("{}.{}", stem, extension)
}

/// Resolve files, directories and glob patterns into a list of log files.
///
/// Directories are walked recursively for `*.log`. Order follows the
/// arguments; duplicates are dropped.
pub fn discover_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        let mut found = if path.is_dir() {
            walk_log_files(path)
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else if is_glob_pattern(input) {
            expand_glob(input)?
        } else {
            return Err(SensorLogError::InputNotFound {
                path: path.to_path_buf(),
            });
        };

        if found.is_empty() {
            warn!("No log files found for input: {}", input);
        }
        found.sort();

        for file in found {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }

    if files.is_empty() {
        return Err(SensorLogError::NoInputFiles {
            pattern: inputs.join(" "),
        });
    }

    debug!("Discovered {} log files", files.len());
    Ok(files)
}

fn walk_log_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(LOG_FILE_EXTENSION))
        })
        .collect()
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| SensorLogError::Configuration {
        message: format!("Invalid glob pattern '{}': {}", pattern, e),
    })?;

    Ok(paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable glob match: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect())
}

fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    match ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => debug!("Falling back to default progress style: {}", e),
    }
    pb.set_message(message.to_string());
    pb
}

fn print_summary(stats: &ProcessingStats, reports: &[FileReport]) {
    println!("\n{}", "Conversion Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files converted:".bright_cyan(),
        stats.files_processed.to_string().bright_white()
    );
    if stats.files_failed > 0 {
        println!(
            "  {} {}",
            "Files failed:".bright_red(),
            stats.files_failed.to_string().bright_red().bold()
        );
    }
    println!(
        "  {} {}",
        "Total rows:".bright_cyan(),
        stats.total_rows.to_string().bright_white().bold()
    );

    let dropped: usize = reports.iter().map(|r| r.stats.fragments_dropped).sum();
    if dropped > 0 {
        println!(
            "  {} {}",
            "Readouts before first timestamp:".bright_yellow(),
            dropped.to_string().bright_yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::fs;
    use tempfile::TempDir;

    const LOG: &str = "10:00:00.000 >\nUS Raw:   100.0 mm\n10:00:01.000 >\nTemp:   21.0 °C\n";

    #[test]
    fn test_discover_walks_directories_for_logs() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("day1");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("mon-251006-101500.log"), LOG).unwrap();
        fs::write(temp_dir.path().join("mon-251007-101500.LOG"), LOG).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();

        let files = discover_inputs(&[temp_dir.path().to_string_lossy().into_owned()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() != "txt"));
    }

    #[test]
    fn test_discover_glob_and_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("mon-251006-101500.log");
        fs::write(&log, LOG).unwrap();

        let pattern = temp_dir.path().join("*.log").to_string_lossy().into_owned();
        let files = discover_inputs(&[pattern, log.to_string_lossy().into_owned()]).unwrap();
        assert_eq!(files, vec![log]);
    }

    #[test]
    fn test_discover_missing_path() {
        let err = discover_inputs(&["/nonexistent/mon-251006-101500.log".to_string()]).unwrap_err();
        assert!(matches!(err, SensorLogError::InputNotFound { .. }));
    }

    #[test]
    fn test_discover_empty_glob() {
        let temp_dir = TempDir::new().unwrap();
        let pattern = temp_dir.path().join("*.log").to_string_lossy().into_owned();
        assert!(matches!(
            discover_inputs(&[pattern]),
            Err(SensorLogError::NoInputFiles { .. })
        ));
    }

    #[test]
    fn test_output_paths() {
        let input = Path::new("/data/logs/mon-251006-101500.log");

        let processor = BatchProcessor::new(ExtractorConfig::default()).unwrap();
        assert_eq!(
            processor.output_path_for(input),
            PathBuf::from("/data/logs/mon-251006-101500.csv")
        );

        let config = ExtractorConfig::default().with_output_format(OutputFormat::Parquet);
        let processor = BatchProcessor::new(config)
            .unwrap()
            .with_output_target(OutputTarget::Directory(PathBuf::from("/out")));
        assert_eq!(
            processor.output_path_for(input),
            PathBuf::from("/out/mon-251006-101500.parquet")
        );
    }

    #[tokio::test]
    async fn test_failing_file_does_not_stop_batch() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("mon-251006-101500.log");
        let bad = temp_dir.path().join("no-stamp.log");
        fs::write(&good, LOG).unwrap();
        fs::write(&bad, LOG).unwrap();
        let out_dir = temp_dir.path().join("out");

        let processor = BatchProcessor::new(ExtractorConfig::default().with_max_concurrent_files(2))
            .unwrap()
            .with_output_target(OutputTarget::Directory(out_dir.clone()))
            .with_progress(false);

        let (stats, reports) = processor.process(&[good, bad]).await.unwrap();
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.total_rows, 2);
        assert_eq!(reports[0].output_path, out_dir.join("mon-251006-101500.csv"));
        assert!(reports[0].output_path.exists());
    }

    #[tokio::test]
    async fn test_colliding_outputs_are_rejected_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let (a, b) = (temp_dir.path().join("a"), temp_dir.path().join("b"));
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("mon-251006-101500.log"), LOG).unwrap();
        fs::write(b.join("mon-251006-101500.log"), LOG).unwrap();
        let out_dir = temp_dir.path().join("out");

        let inputs = discover_inputs(&[temp_dir.path().to_string_lossy().into_owned()]).unwrap();
        assert_eq!(inputs.len(), 2);

        let processor = BatchProcessor::new(ExtractorConfig::default())
            .unwrap()
            .with_output_target(OutputTarget::Directory(out_dir.clone()))
            .with_progress(false);

        assert!(matches!(
            processor.process(&inputs).await,
            Err(SensorLogError::Configuration { .. })
        ));
        assert!(!out_dir.exists());
    }

    #[tokio::test]
    async fn test_output_may_not_overwrite_input() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("mon-251006-101500.csv");
        fs::write(&input, LOG).unwrap();

        let processor = BatchProcessor::new(ExtractorConfig::default())
            .unwrap()
            .with_progress(false);

        assert!(matches!(
            processor.process(std::slice::from_ref(&input)).await,
            Err(SensorLogError::Configuration { .. })
        ));
        assert_eq!(fs::read_to_string(&input).unwrap(), LOG);
    }

    #[tokio::test]
    async fn test_explicit_output_needs_single_input() {
        let processor = BatchProcessor::new(ExtractorConfig::default())
            .unwrap()
            .with_output_target(OutputTarget::File(PathBuf::from("out.csv")))
            .with_progress(false);

        let inputs = vec![PathBuf::from("a.log"), PathBuf::from("b.log")];
        assert!(matches!(
            processor.process(&inputs).await,
            Err(SensorLogError::Configuration { .. })
        ));
    }
}

//! Single-pass extraction of records from one device-monitor log.
//!
//! Lines are read in file order, trimmed, classified and fed to a
//! [`RecordBuilder`]. Any fatal condition aborts the whole file; there is no
//! partial output.

use crate::builder::RecordBuilder;
use crate::classifier::{IgnoreReason, LineClassifier, LineKind};
use crate::config::ExtractorConfig;
use crate::error::{Result, SensorLogError};
use crate::models::{ExtractionStats, Record, SourceStamp};
use crate::source::parse_source_stamp;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Records and statistics produced from one log
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub stats: ExtractionStats,
}

/// Drives classification and record building over a line stream
#[derive(Debug, Clone, Default)]
pub struct LogExtractor {
    classifier: LineClassifier,
}

impl LogExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            classifier: LineClassifier::from_config(config),
        }
    }

    /// Extract a log file, taking the calendar date from its name
    pub fn extract_file(&self, path: &Path) -> Result<(SourceStamp, Extraction)> {
        if !path.exists() {
            return Err(SensorLogError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let stamp = parse_source_stamp(path)?;
        let file = File::open(path)?;
        let extraction = self
            .extract_reader(BufReader::new(file), stamp.date)
            .map_err(|e| e.in_file(path))?;

        debug!(
            "Extracted {} records from {} (captured at {})",
            extraction.records.len(),
            path.display(),
            stamp.capture_time
        );

        Ok((stamp, extraction))
    }

    /// Extract from any buffered reader; every record is stamped with `date`.
    ///
    /// `BufRead::lines` only yields complete lines, so a fragment is never
    /// classified before it has been read in full.
    pub fn extract_reader<R: BufRead>(&self, reader: R, date: NaiveDate) -> Result<Extraction> {
        let mut builder = RecordBuilder::new(date);
        let mut stats = ExtractionStats::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            self.process_line(&mut builder, &mut stats, line.trim(), index + 1)?;
        }

        Ok(Self::finish(builder, stats))
    }

    /// Extract from lines already held in memory
    pub fn extract_lines<'a, I>(&self, lines: I, date: NaiveDate) -> Result<Extraction>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut builder = RecordBuilder::new(date);
        let mut stats = ExtractionStats::default();

        for (index, line) in lines.into_iter().enumerate() {
            self.process_line(&mut builder, &mut stats, line.trim(), index + 1)?;
        }

        Ok(Self::finish(builder, stats))
    }

    fn finish(builder: RecordBuilder, mut stats: ExtractionStats) -> Extraction {
        let records = builder.finish();
        stats.records_emitted = records.len();
        stats.empty_records = records.iter().filter(|r| r.is_empty()).count();

        if stats.fragments_dropped > 0 {
            warn!(
                "{} readouts appeared before the first timestamp and were dropped",
                stats.fragments_dropped
            );
        }

        Extraction { records, stats }
    }

    fn process_line(
        &self,
        builder: &mut RecordBuilder,
        stats: &mut ExtractionStats,
        line: &str,
        line_number: usize,
    ) -> Result<()> {
        stats.total_lines += 1;

        let fragment = match self.classifier.classify(line, line_number)? {
            LineKind::Ignorable(reason) => {
                match reason {
                    IgnoreReason::Blank => stats.blank_lines += 1,
                    IgnoreReason::Separator => stats.separator_lines += 1,
                    IgnoreReason::ExcludedChannel => stats.excluded_lines += 1,
                }
                return Ok(());
            }
            LineKind::Timestamp { time, rest } => {
                stats.timestamp_lines += 1;
                builder.on_timestamp(time);
                if rest.is_empty() {
                    return Ok(());
                }
                rest
            }
            LineKind::Fragment(text) => {
                stats.fragment_lines += 1;
                text
            }
        };

        let outcome = builder.on_data_fragment(fragment, line_number)?;
        stats.fragments_dropped += outcome.dropped;
        stats.fields_written += outcome.written.len();
        stats.fields_overwritten += outcome.overwritten.len();

        if !outcome.overwritten.is_empty() {
            debug!(
                "Line {}: overwrote {:?} on the current record",
                line_number, outcome.overwritten
            );
        }

        Ok(())
    }
}

//! Line classification for device-monitor logs.
//!
//! Every trimmed input line is sorted into one of four kinds, checked in
//! this order: separator, excluded channel, timestamp marker, data
//! fragment. Classification has no side effects.
//!
//! Exclusion is line-granular: a line that merely mentions an excluded
//! channel keyword is dropped in full, even if it also carries a wanted
//! field.

use crate::config::ExtractorConfig;
use crate::constants::{CLOCK_TIME_FORMAT, TIMESTAMP_PATTERN};
use crate::error::{Result, SensorLogError};
use chrono::NaiveTime;
use regex::Regex;
use std::sync::LazyLock;

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TIMESTAMP_PATTERN).expect("Invalid timestamp regex"));

/// Why a line carries nothing for the record builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Blank,
    Separator,
    ExcludedChannel,
}

/// Classification of one log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Carries no data and must not affect builder state
    Ignorable(IgnoreReason),
    /// Opens a new record at the given time of day; `rest` is whatever
    /// follows the `>` delimiter
    Timestamp { time: NaiveTime, rest: &'a str },
    /// Free text to be matched against the field patterns
    Fragment(&'a str),
}

/// Classifies trimmed log lines
#[derive(Debug, Clone)]
pub struct LineClassifier {
    separator: String,
    excluded_channels: Vec<String>,
}

impl LineClassifier {
    pub fn new(separator: impl Into<String>, excluded_channels: Vec<String>) -> Self {
        Self {
            separator: separator.into(),
            excluded_channels,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.separator.clone(), config.excluded_channels.clone())
    }

    /// Classify a single line; `line_number` is only used for error context
    pub fn classify<'a>(&self, line: &'a str, line_number: usize) -> Result<LineKind<'a>> {
        if line.is_empty() {
            return Ok(LineKind::Ignorable(IgnoreReason::Blank));
        }

        if line.contains(self.separator.as_str()) {
            return Ok(LineKind::Ignorable(IgnoreReason::Separator));
        }

        if self.mentions_excluded_channel(line) {
            return Ok(LineKind::Ignorable(IgnoreReason::ExcludedChannel));
        }

        if let Some(captures) = TIMESTAMP_RE.captures(line) {
            let clock = &captures[1];
            let rest = line[captures[0].len()..].trim();
            let time = NaiveTime::parse_from_str(clock, CLOCK_TIME_FORMAT).map_err(|source| {
                SensorLogError::InvalidClockTime {
                    line_number,
                    line: line.to_string(),
                    source,
                }
            })?;
            return Ok(LineKind::Timestamp { time, rest });
        }

        Ok(LineKind::Fragment(line))
    }

    fn mentions_excluded_channel(&self, line: &str) -> bool {
        self.excluded_channels
            .iter()
            .any(|keyword| line.contains(keyword.as_str()))
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}

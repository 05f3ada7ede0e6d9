//! Field patterns for sensor readouts.
//!
//! Each channel is one row of [`FIELD_TABLE`]: the field it fills, the label
//! that introduces it and the unit that closes it. Patterns are anchored on
//! the label so numerically similar channels never cross-match, and each
//! searches the whole line independently of field order.

use crate::error::{Result, SensorLogError};
use crate::models::Field;
use regex::Regex;
use std::sync::LazyLock;

/// (field, label, unit) for every extracted channel
pub const FIELD_TABLE: &[(Field, &str, &str)] = &[
    (Field::UsRaw, "US Raw", "mm"),
    (Field::TimeOfFlight, "Time of Flight", "ns"),
    (Field::Temp, "Temp", "°C"),
    (Field::Hum, "Hum", "%"),
    (Field::Pres, "Pres", "kPa"),
];

static FIELD_PATTERNS: LazyLock<Vec<FieldPattern>> = LazyLock::new(|| {
    FIELD_TABLE
        .iter()
        .map(|&(field, label, unit)| FieldPattern::new(field, label, unit))
        .collect()
});

/// Compiled matcher for one `Label: <number> <unit>` readout
#[derive(Debug)]
pub struct FieldPattern {
    pub field: Field,
    pub label: &'static str,
    pub unit: &'static str,
    regex: Regex,
}

impl FieldPattern {
    fn new(field: Field, label: &'static str, unit: &'static str) -> Self {
        let pattern = format!(
            r"\b{}:\s+(\S+)\s+{}",
            regex::escape(label),
            regex::escape(unit)
        );
        let regex = Regex::new(&pattern).expect("Invalid field pattern");
        Self {
            field,
            label,
            unit,
            regex,
        }
    }

    /// Raw captured value tokens, in line order
    pub fn captures<'a>(&self, text: &'a str) -> impl Iterator<Item = &'a str> {
        self.regex
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
    }
}

/// The compiled pattern table
pub fn field_patterns() -> &'static [FieldPattern] {
    &FIELD_PATTERNS
}

/// Extract every readout in `text`.
///
/// Results are grouped by field in table order; repeated readouts of one
/// field keep their line order so a later write overrides an earlier one.
/// A matched token that is not a finite number is an error for the line.
pub fn extract_fields(text: &str, line_number: usize) -> Result<Vec<(Field, f64)>> {
    let mut values = Vec::new();

    for pattern in field_patterns() {
        for token in pattern.captures(text) {
            let value = parse_value(token).ok_or_else(|| SensorLogError::MalformedField {
                line_number,
                field: pattern.field.column_name(),
                value: token.to_string(),
                line: text.to_string(),
            })?;
            values.push((pattern.field, value));
        }
    }

    Ok(values)
}

fn parse_value(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_readouts() {
        assert_eq!(
            extract_fields("US Raw:   123.45 mm", 1).unwrap(),
            vec![(Field::UsRaw, 123.45)]
        );
        assert_eq!(
            extract_fields("Time of Flight:   720.5 ns", 1).unwrap(),
            vec![(Field::TimeOfFlight, 720.5)]
        );
        assert_eq!(
            extract_fields("Temp:   21.30 °C", 1).unwrap(),
            vec![(Field::Temp, 21.30)]
        );
        assert_eq!(
            extract_fields("Hum:   55.20 %", 1).unwrap(),
            vec![(Field::Hum, 55.20)]
        );
        assert_eq!(
            extract_fields("Pres:   101.32 kPa", 1).unwrap(),
            vec![(Field::Pres, 101.32)]
        );
    }

    #[test]
    fn test_concatenated_channels_in_any_order() {
        let forward = extract_fields("US Raw:   123.45 mm   Temp:   21.30 °C", 1).unwrap();
        let reverse = extract_fields("Temp:   21.30 °C   US Raw:   123.45 mm", 1).unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(forward, vec![(Field::UsRaw, 123.45), (Field::Temp, 21.30)]);
    }

    #[test]
    fn test_unit_must_match() {
        assert!(extract_fields("Temp:   21.30 K", 1).unwrap().is_empty());
        assert!(extract_fields("Pres:   101.3 hPa", 1).unwrap().is_empty());
    }

    #[test]
    fn test_label_is_anchored() {
        assert!(extract_fields("AirTemp:   21.30 °C", 1).unwrap().is_empty());
        assert_eq!(
            extract_fields("Pres:   99.8 kPa", 1).unwrap(),
            vec![(Field::Pres, 99.8)]
        );
    }

    #[test]
    fn test_unlabelled_text_yields_nothing() {
        assert!(extract_fields("Sensor boot complete", 1).unwrap().is_empty());
        assert!(extract_fields("", 1).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_number_is_error() {
        let err = extract_fields("Pres:   abc kPa", 9).unwrap_err();
        match err {
            SensorLogError::MalformedField {
                line_number,
                field,
                value,
                line,
            } => {
                assert_eq!(line_number, 9);
                assert_eq!(field, "pres");
                assert_eq!(value, "abc");
                assert_eq!(line, "Pres:   abc kPa");
            }
            other => panic!("Expected MalformedField, got {other:?}"),
        }

        assert!(extract_fields("US Raw:   12.3.4 mm", 1).is_err());
        assert!(extract_fields("Hum:   NaN %", 1).is_err());
    }

    #[test]
    fn test_repeated_readout_keeps_line_order() {
        assert_eq!(
            extract_fields("Hum:   40.0 %   Hum:   41.5 %", 1).unwrap(),
            vec![(Field::Hum, 40.0), (Field::Hum, 41.5)]
        );
    }

    #[test]
    fn test_table_covers_every_field() {
        let fields: Vec<_> = FIELD_TABLE.iter().map(|(f, _, _)| *f).collect();
        assert_eq!(fields, Field::ALL.to_vec());
        assert_eq!(field_patterns().len(), FIELD_TABLE.len());
    }
}

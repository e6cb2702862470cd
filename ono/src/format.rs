//! Document-scoped value formatters.
//!
//! A [`crate::Document`] carries one [`NumberFormat`] and one [`DateFormat`],
//! fixed at construction time through [`crate::ParseOptions`] and shared by
//! every element's `number_value()`/`date_value()` accessor. Both are plain
//! data and safe for concurrent read use.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Locale-aware parser for decimal-style numeric strings.
///
/// The default reads `.` as the decimal separator and tolerates `,` as a
/// grouping separator (`"1,234.5"` -> `1234.5`). European-style content can
/// use `NumberFormat::new(',', Some('.'))`.
#[derive(Debug, Clone)]
pub struct NumberFormat {
    decimal_separator: char,
    grouping_separator: Option<char>,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            decimal_separator: '.',
            grouping_separator: Some(','),
        }
    }
}

impl NumberFormat {
    /// Creates a format with explicit separators.
    pub fn new(decimal_separator: char, grouping_separator: Option<char>) -> Self {
        NumberFormat {
            decimal_separator,
            grouping_separator,
        }
    }

    /// Parses `text` as a number, returning `None` for blank or malformed
    /// input. Surrounding whitespace is ignored.
    pub fn parse(&self, text: &str) -> Option<f64> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let mut normalized = String::with_capacity(trimmed.len());
        for c in trimmed.chars() {
            if Some(c) == self.grouping_separator {
                continue;
            }
            if c == self.decimal_separator {
                normalized.push('.');
            } else {
                normalized.push(c);
            }
        }
        normalized.parse().ok()
    }
}

/// Parser for date-valued content.
///
/// The default accepts ISO-8601 / RFC 3339 timestamps, falling back to a
/// bare `YYYY-MM-DD` date read as UTC midnight. A fixed `chrono` format
/// string can be supplied with [`DateFormat::custom`].
#[derive(Debug, Clone, Default)]
pub struct DateFormat {
    /// `None` means ISO-8601.
    format: Option<String>,
}

impl DateFormat {
    /// The default ISO-8601 format.
    pub fn iso8601() -> Self {
        DateFormat { format: None }
    }

    /// A format parsing with the given `chrono` format string. Formats
    /// without an offset are read as UTC.
    pub fn custom(format: impl Into<String>) -> Self {
        DateFormat {
            format: Some(format.into()),
        }
    }

    /// Parses `text` as a timestamp, returning `None` for blank or
    /// malformed input.
    pub fn parse(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        match &self.format {
            None => DateTime::parse_from_rfc3339(trimmed).ok().or_else(|| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc().fixed_offset())
            }),
            Some(format) => DateTime::parse_from_str(trimmed, format).ok().or_else(|| {
                NaiveDateTime::parse_from_str(trimmed, format)
                    .ok()
                    .map(|dt| dt.and_utc().fixed_offset())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_default_number_format() {
        let format = NumberFormat::default();
        assert_eq!(format.parse("42.5"), Some(42.5));
        assert_eq!(format.parse("  -7 "), Some(-7.0));
        assert_eq!(format.parse("1,234.5"), Some(1234.5));
        assert_eq!(format.parse("abc"), None);
        assert_eq!(format.parse(""), None);
        assert_eq!(format.parse("   "), None);
    }

    #[test]
    fn test_european_number_format() {
        let format = NumberFormat::new(',', Some('.'));
        assert_eq!(format.parse("1.234,5"), Some(1234.5));
        assert_eq!(format.parse("42,5"), Some(42.5));
    }

    #[test]
    fn test_iso8601_date() {
        let format = DateFormat::default();
        let parsed = format.parse("2014-03-01T12:00:00Z").expect("should parse");
        assert_eq!(parsed.hour(), 12);
        assert_eq!(parsed.to_rfc3339(), "2014-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_date_only_fallback() {
        let format = DateFormat::default();
        let parsed = format.parse("2014-03-01").expect("should parse");
        assert_eq!(parsed.to_rfc3339(), "2014-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_malformed_date_is_none() {
        let format = DateFormat::default();
        assert!(format.parse("not a date").is_none());
        assert!(format.parse("").is_none());
    }

    #[test]
    fn test_custom_date_format() {
        let format = DateFormat::custom("%d/%m/%Y %H:%M");
        let parsed = format.parse("01/03/2014 12:30").expect("should parse");
        assert_eq!(parsed.to_rfc3339(), "2014-03-01T12:30:00+00:00");
        assert!(format.parse("2014-03-01").is_none());
    }
}

//! Date expressions
//!
//! A date filter is an operator followed by a date, e.g. `>= 02-jan-2020` or
//! `=2020-03-09T09:50:51.500Z`. The date side accepts RFC3339 and a handful of
//! human-readable forms; the value it is compared with is always RFC3339.

use super::error::FilterError;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Date-time layouts tried after RFC3339, interpreted as UTC
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts, interpreted as midnight UTC
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y/%m/%d",
    "%m/%d/%Y",
];

/// Comparison operator of a date expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOperator {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl DateOperator {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "=" | "==" => Some(DateOperator::Equal),
            ">" => Some(DateOperator::Greater),
            ">=" => Some(DateOperator::GreaterOrEqual),
            "<" => Some(DateOperator::Less),
            "<=" => Some(DateOperator::LessOrEqual),
            _ => None,
        }
    }

    fn holds(self, got: &DateTime<Utc>, wanted: &DateTime<Utc>) -> bool {
        match self {
            DateOperator::Equal => got == wanted,
            DateOperator::Greater => got > wanted,
            DateOperator::GreaterOrEqual => got >= wanted,
            DateOperator::Less => got < wanted,
            DateOperator::LessOrEqual => got <= wanted,
        }
    }
}

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([<>=]+)\s*(.*?)\s*$").expect("static date expression regex")
    })
}

fn ordinal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("static ordinal regex")
    })
}

/// Split an expression into operator and date text.
/// Whitespace between the operator and the date is not significant.
pub fn parse_date_expression(expression: &str) -> Result<(DateOperator, String)> {
    let invalid = || FilterError::InvalidDateExpression(expression.to_string());

    let caps = expression_regex().captures(expression).ok_or_else(invalid)?;
    let operator = DateOperator::parse(&caps[1]).ok_or_else(invalid)?;
    let date = caps[2].to_string();
    if date.is_empty() {
        return Err(invalid().into());
    }

    Ok((operator, date))
}

/// Parse a date in RFC3339 or one of the loose human-readable forms
pub fn parse_loose_date(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let normalized = ordinal_regex().replace_all(trimmed, "$1");
    let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&normalized, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&dt));
            }
        }
    }

    Err(FilterError::DateParse {
        input: input.to_string(),
        reason: "unrecognized date format".to_string(),
    }
    .into())
}

/// Parse a strict RFC3339 timestamp
pub fn parse_rfc3339(input: &str) -> Result<DateTime<Utc>> {
    if input.is_empty() {
        return Err(FilterError::DateParse {
            input: String::new(),
            reason: "date to compare is empty".to_string(),
        }
        .into());
    }

    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            FilterError::DateParse {
                input: input.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

/// Check whether `got` (RFC3339) satisfies the date expression `wanted`
pub fn compare_date(wanted: &str, got: &str) -> Result<bool> {
    let (operator, date) = parse_date_expression(wanted)?;
    let wanted_date = parse_loose_date(&date)?;
    let got_date = parse_rfc3339(got)?;

    Ok(operator.holds(&got_date, &wanted_date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_date_table() {
        let cases = [
            ("=2020-03-09T09:50:51.500Z", "2020-03-09T09:50:51.500Z", true),
            (">2020-03-09T09:50:51.500Z", "2020-03-09T09:50:51.500Z", false),
            (">2020-03-09T09:50:50.500Z", "2020-03-10T09:50:51.500Z", true),
            ("> 2020-03-09T09:50:50.500Z", "2020-03-10T09:50:51.500Z", true),
            (">=2020-03-09T09:50:51.500Z", "2020-03-09T09:50:51.500Z", true),
            ("<2020-03-09T09:50:51.500Z", "2020-03-09T09:50:51.500Z", false),
            ("<=2020-03-09T09:50:51.500Z", "2020-03-09T09:50:51.500Z", true),
            ("<= 02-feb-2020", "2020-04-08T00:00:01.0Z", false),
            (">= 02-jan-2020", "2020-04-08T00:00:01.0Z", true),
            (">= January 10th, 2020", "2020-01-10T00:00:00Z", true),
            ("< January 10th, 2020", "2020-01-10T00:00:00Z", false),
            ("= 01-mar-2020", "2020-03-01T00:00:00Z", true),
            ("==2020-03-01", "2020-03-01T00:00:00+00:00", true),
            ("<2020-03-10", "2020-03-09T23:59:59Z", true),
        ];

        for (wanted, got, expected) in cases {
            let result = compare_date(wanted, got)
                .unwrap_or_else(|e| panic!("compare_date({}, {}) failed: {}", wanted, got, e));
            assert_eq!(result, expected, "compare_date({}, {})", wanted, got);
        }
    }

    #[test]
    fn test_space_after_operator_is_not_significant() {
        let got = "2020-03-10T09:50:51.500Z";
        for op in ["=", ">", ">=", "<", "<="] {
            let tight = compare_date(&format!("{}2020-03-09T09:50:51.500Z", op), got).unwrap();
            let spaced = compare_date(&format!("{} 2020-03-09T09:50:51.500Z", op), got).unwrap();
            assert_eq!(tight, spaced, "operator {}", op);
        }
    }

    #[test]
    fn test_timezone_offsets_are_honored() {
        assert!(compare_date("=2020-03-09T10:00:00+01:00", "2020-03-09T09:00:00Z").unwrap());
    }

    #[test]
    fn test_invalid_expressions() {
        for wanted in ["2020-01-01", "=>2020-01-01", "<>2020-01-01", ">", "  "] {
            let err = compare_date(wanted, "2020-01-01T00:00:00Z").unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<FilterError>(),
                    Some(FilterError::InvalidDateExpression(_))
                ),
                "{} should be rejected, got {}",
                wanted,
                err
            );
        }
    }

    #[test]
    fn test_unparsable_dates() {
        let err = compare_date(">sometime soon", "2020-01-01T00:00:00Z").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FilterError>(),
            Some(FilterError::DateParse { .. })
        ));

        let err = compare_date(">2020-01-01", "01-jan-2020").unwrap_err();
        assert!(err.to_string().contains("error parsing date '01-jan-2020'"));

        let err = compare_date(">2020-01-01", "").unwrap_err();
        assert!(err.to_string().contains("date to compare is empty"));
    }

    #[test]
    fn test_loose_formats_agree_with_rfc3339() {
        let expected = parse_rfc3339("2020-01-10T00:00:00Z").unwrap();
        for input in [
            "2020-01-10",
            "10-jan-2020",
            "10-Jan-2020",
            "10-January-2020",
            "January 10th, 2020",
            "Jan 10, 2020",
            "10 January 2020",
            "2020/01/10",
            "01/10/2020",
        ] {
            assert_eq!(parse_loose_date(input).unwrap(), expected, "{}", input);
        }
    }
}

//! Raw-input normalization shared by every fact constructor.
//!
//! Adapters hand over whatever the source produced (floats, strings, naive or
//! offset timestamps). These helpers turn that into the canonical forms the
//! domain stores: trimmed uppercase identifiers, `Decimal` numerics and UTC
//! timestamps.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::ValidationError;

/// A numeric field as delivered by a source, before decimal normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum DecimalInput {
    Decimal(Decimal),
    Float(f64),
    Int(i64),
    Text(String),
}

impl From<Decimal> for DecimalInput {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<f64> for DecimalInput {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for DecimalInput {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for DecimalInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DecimalInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A timestamp as delivered by a source, before UTC normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampInput {
    Utc(DateTime<Utc>),
    Offset(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
    Text(String),
}

impl From<DateTime<Utc>> for TimestampInput {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Utc(value)
    }
}

impl From<DateTime<FixedOffset>> for TimestampInput {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Offset(value)
    }
}

impl From<NaiveDateTime> for TimestampInput {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl From<&str> for TimestampInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TimestampInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Required resolution of a fact timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPrecision {
    /// Seconds and sub-seconds must be zero.
    #[default]
    Minute,
    /// Sub-seconds must be zero.
    Second,
    /// Any resolution is accepted.
    Any,
}

impl TimestampPrecision {
    pub fn label(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Any => "any",
        }
    }

    /// Reject timestamps finer than this precision.
    pub fn check(self, field: &'static str, ts: DateTime<Utc>) -> Result<(), ValidationError> {
        let ok = match self {
            Self::Minute => ts.second() == 0 && ts.nanosecond() == 0,
            Self::Second => ts.nanosecond() == 0,
            Self::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(ValidationError::Precision {
                field,
                precision: self.label(),
                raw: ts.to_rfc3339(),
            })
        }
    }
}

/// Trim and uppercase an identifier, rejecting blank input.
pub fn normalize_identity(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(trimmed.to_uppercase())
}

/// Convert any supported numeric input into a finite `Decimal`.
pub fn to_decimal(field: &'static str, input: &DecimalInput) -> Result<Decimal, ValidationError> {
    match input {
        DecimalInput::Decimal(d) => Ok(*d),
        DecimalInput::Int(i) => Ok(Decimal::from(*i)),
        DecimalInput::Float(f) => {
            if !f.is_finite() {
                return Err(ValidationError::NonFinite {
                    field,
                    raw: f.to_string(),
                });
            }
            // Go through the shortest round-trip text so 0.1 stays 0.1.
            let text = f.to_string();
            let d = Decimal::from_str(&text).map_err(|_| ValidationError::NotDecimal {
                field,
                raw: text.clone(),
            })?;
            ensure_exact(field, &text, d)
        }
        DecimalInput::Text(s) => parse_decimal_text(field, s),
    }
}

fn parse_decimal_text(field: &'static str, raw: &str) -> Result<Decimal, ValidationError> {
    let s = raw.trim();
    let lowered = s.to_ascii_lowercase();
    if matches!(
        lowered.trim_start_matches(['+', '-']),
        "nan" | "inf" | "infinity"
    ) {
        return Err(ValidationError::NonFinite {
            field,
            raw: raw.to_string(),
        });
    }
    let not_decimal = || ValidationError::NotDecimal {
        field,
        raw: raw.to_string(),
    };
    if lowered.contains('e') {
        let d = Decimal::from_scientific(s).map_err(|_| not_decimal())?;
        // Scientific mantissas are not compared digit by digit; a nonzero
        // mantissa must still give a nonzero value.
        let mantissa = lowered.split('e').next().unwrap_or("");
        if d.is_zero() && mantissa.chars().any(|c| matches!(c, '1'..='9')) {
            return Err(ValidationError::Inexact {
                field,
                raw: raw.to_string(),
            });
        }
        return Ok(d);
    }
    let d = Decimal::from_str(s).map_err(|_| not_decimal())?;
    ensure_exact(field, s, d)
}

/// Reject a parse that dropped digits: `Decimal` holds at most 28 fractional
/// digits and rounds anything beyond.
fn ensure_exact(field: &'static str, text: &str, d: Decimal) -> Result<Decimal, ValidationError> {
    if canonical_digits(text) == canonical_digits(&d.to_string()) {
        Ok(d)
    } else {
        Err(ValidationError::Inexact {
            field,
            raw: text.to_string(),
        })
    }
}

/// Sign, integer digits and fractional digits of a plain decimal literal,
/// without leading or trailing zeros. Zero has no sign.
fn canonical_digits(text: &str) -> (bool, String, String) {
    let text = text.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits = |part: &str| part.chars().filter(|&c| c != '_').collect::<String>();
    let int = digits(int).trim_start_matches('0').to_string();
    let frac = digits(frac).trim_end_matches('0').to_string();
    let negative = negative && !(int.is_empty() && frac.is_empty());
    (negative, int, frac)
}

/// Convert a timestamp input to UTC, rejecting anything without an offset.
pub fn to_utc(field: &'static str, input: &TimestampInput) -> Result<DateTime<Utc>, ValidationError> {
    match input {
        TimestampInput::Utc(ts) => Ok(*ts),
        TimestampInput::Offset(ts) => Ok(ts.with_timezone(&Utc)),
        TimestampInput::Naive(ts) => Err(ValidationError::NaiveTimestamp {
            field,
            raw: ts.to_string(),
        }),
        TimestampInput::Text(s) => parse_timestamp_text(field, s),
    }
}

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_timestamp_text(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let s = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, fmt) {
            return Ok(ts.with_timezone(&Utc));
        }
    }
    if NAIVE_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
    {
        return Err(ValidationError::NaiveTimestamp {
            field,
            raw: raw.to_string(),
        });
    }
    Err(ValidationError::BadTimestamp {
        field,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn float_goes_through_shortest_text() {
        let d = to_decimal("close", &DecimalInput::Float(0.1)).unwrap();
        assert_eq!(d, dec!(0.1));
    }

    #[test]
    fn nan_and_infinity_are_rejected() {
        assert!(matches!(
            to_decimal("value", &DecimalInput::Float(f64::NAN)),
            Err(ValidationError::NonFinite { .. })
        ));
        assert!(matches!(
            to_decimal("value", &"-Infinity".into()),
            Err(ValidationError::NonFinite { .. })
        ));
    }

    #[test]
    fn garbage_text_is_not_decimal() {
        let err = to_decimal("close", &"12abc".into()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotDecimal {
                field: "close",
                raw: "12abc".into()
            }
        );
    }

    #[test]
    fn scientific_text_is_accepted() {
        assert_eq!(to_decimal("value", &"1.5e2".into()).unwrap(), dec!(150));
    }

    #[test]
    fn digits_beyond_decimal_scale_are_rejected() {
        let err = to_decimal("value", &"0.0000000000000000000000000000001".into()).unwrap_err();
        assert!(matches!(err, ValidationError::Inexact { field: "value", .. }));

        for tiny in [1e-30, 5e-324] {
            assert!(
                matches!(
                    to_decimal("value", &DecimalInput::Float(tiny)),
                    Err(ValidationError::Inexact { .. } | ValidationError::NotDecimal { .. })
                ),
                "{tiny}"
            );
        }

        assert!(matches!(
            to_decimal("value", &"1e-40".into()),
            Err(ValidationError::Inexact { .. } | ValidationError::NotDecimal { .. })
        ));
    }

    #[test]
    fn padded_text_is_still_exact() {
        assert_eq!(to_decimal("v", &"+007.2500".into()).unwrap(), dec!(7.25));
        assert_eq!(to_decimal("v", &"-0.000".into()).unwrap(), dec!(0));
        assert_eq!(
            to_decimal("v", &"0.0000000000000000000000000001".into()).unwrap(),
            dec!(0.0000000000000000000000000001)
        );
        assert_eq!(to_decimal("v", &DecimalInput::Float(-2.5)).unwrap(), dec!(-2.5));
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let ts = to_utc("ts", &"2024-03-01T09:30:00-03:00".into()).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());

        let ts = to_utc("ts", &"2024-03-01 12:30:00+00:00".into()).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn naive_timestamps_are_rejected() {
        let err = to_utc("ts", &"2024-03-01T12:30:00".into()).unwrap_err();
        assert!(matches!(err, ValidationError::NaiveTimestamp { .. }));

        let naive = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .unwrap()
            .naive_utc();
        assert!(to_utc("ts", &naive.into()).is_err());
    }

    #[test]
    fn minute_precision_rejects_seconds() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 15).unwrap();
        assert!(TimestampPrecision::Minute.check("ts", ts).is_err());
        assert!(TimestampPrecision::Second.check("ts", ts).is_ok());
        assert!(TimestampPrecision::Any.check("ts", ts).is_ok());
    }
}

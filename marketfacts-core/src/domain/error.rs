use rust_decimal::Decimal;
use thiserror::Error;

/// A fact or entity field violated a domain invariant at construction.
///
/// Every variant names the offending field and the rule it broke, so the
/// message can be surfaced to a user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is not a valid decimal: {raw:?}")]
    NotDecimal { field: &'static str, raw: String },

    #[error("{field} {raw:?} cannot be held exactly as a decimal")]
    Inexact { field: &'static str, raw: String },

    #[error("{field} must be finite, got {raw}")]
    NonFinite { field: &'static str, raw: String },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: String },

    #[error("high below low: {high} < {low}")]
    HighBelowLow { high: Decimal, low: Decimal },

    #[error("{field} below low: {value} < {low}")]
    BelowLow {
        field: &'static str,
        value: Decimal,
        low: Decimal,
    },

    #[error("{field} above high: {value} > {high}")]
    AboveHigh {
        field: &'static str,
        value: Decimal,
        high: Decimal,
    },

    #[error("{field} must carry a UTC offset (got naive timestamp {raw})")]
    NaiveTimestamp { field: &'static str, raw: String },

    #[error("{field} is not a valid timestamp: {raw:?}")]
    BadTimestamp { field: &'static str, raw: String },

    #[error("{field} must have {precision} precision, got {raw}")]
    Precision {
        field: &'static str,
        precision: &'static str,
        raw: String,
    },

    #[error("{field} {value:?} does not match {rule}")]
    Pattern {
        field: &'static str,
        value: String,
        rule: &'static str,
    },

    #[error("unknown interval {0:?} (expected one of 1min, 5min, 15min, 30min, 1h, 1d, 1wk, 1mo)")]
    UnknownInterval(String),
}

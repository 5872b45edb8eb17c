//! PriceBarFact — the fundamental market data unit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::ValidationError;
use super::input::{
    normalize_identity, to_decimal, to_utc, DecimalInput, TimestampInput, TimestampPrecision,
};
use super::interval::Interval;

/// Raw OHLCV row from a source, before validation.
///
/// Only `close` is mandatory; sources routinely omit open/high/low on
/// illiquid days and volume on indices.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPriceBar {
    pub code: String,
    pub interval: String,
    pub ts: TimestampInput,
    pub open: Option<DecimalInput>,
    pub high: Option<DecimalInput>,
    pub low: Option<DecimalInput>,
    pub close: DecimalInput,
    pub volume: Option<i64>,
}

impl RawPriceBar {
    pub fn new(
        code: impl Into<String>,
        interval: impl Into<String>,
        ts: impl Into<TimestampInput>,
        close: impl Into<DecimalInput>,
    ) -> Self {
        Self {
            code: code.into(),
            interval: interval.into(),
            ts: ts.into(),
            open: None,
            high: None,
            low: None,
            close: close.into(),
            volume: None,
        }
    }

    pub fn open(mut self, open: impl Into<DecimalInput>) -> Self {
        self.open = Some(open.into());
        self
    }

    pub fn high(mut self, high: impl Into<DecimalInput>) -> Self {
        self.high = Some(high.into());
        self
    }

    pub fn low(mut self, low: impl Into<DecimalInput>) -> Self {
        self.low = Some(low.into());
        self
    }

    pub fn volume(mut self, volume: i64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Validate with the default minute precision.
    pub fn build(self) -> Result<PriceBarFact, ValidationError> {
        PriceBarFact::new(self)
    }
}

/// One validated OHLCV observation for a single code and interval.
///
/// Immutable once built: a correction means constructing a new fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceBarFact {
    code: String,
    interval: Interval,
    ts: DateTime<Utc>,
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Decimal,
    volume: Option<u64>,
}

impl PriceBarFact {
    /// Validate a raw row requiring minute-precision timestamps.
    pub fn new(raw: RawPriceBar) -> Result<Self, ValidationError> {
        Self::with_precision(raw, TimestampPrecision::Minute)
    }

    /// Validate a raw row against the given timestamp precision.
    ///
    /// Checks short-circuit in a fixed order: identity, non-negative scalars
    /// (close, volume, then open/high/low, each converted just before its
    /// check), OHLC range, open within range, timezone, precision.
    pub fn with_precision(
        raw: RawPriceBar,
        precision: TimestampPrecision,
    ) -> Result<Self, ValidationError> {
        let code = normalize_identity("code", &raw.code)?;
        let interval = Interval::parse(&raw.interval)?;

        let close = to_decimal("close", &raw.close)?;
        check_non_negative("close", close)?;
        let volume = match raw.volume {
            Some(v) if v < 0 => {
                return Err(ValidationError::Negative {
                    field: "volume",
                    value: v.to_string(),
                })
            }
            Some(v) => Some(v as u64),
            None => None,
        };
        let open = optional_price("open", raw.open.as_ref())?;
        let high = optional_price("high", raw.high.as_ref())?;
        let low = optional_price("low", raw.low.as_ref())?;

        if let (Some(h), Some(l)) = (high, low) {
            if h < l {
                return Err(ValidationError::HighBelowLow { high: h, low: l });
            }
        }
        check_within("close", close, low, high)?;
        if let Some(o) = open {
            check_within("open", o, low, high)?;
        }

        let ts = to_utc("ts", &raw.ts)?;
        precision.check("ts", ts)?;

        Ok(Self {
            code,
            interval,
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    pub fn open(&self) -> Option<Decimal> {
        self.open
    }

    pub fn high(&self) -> Option<Decimal> {
        self.high
    }

    pub fn low(&self) -> Option<Decimal> {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn volume(&self) -> Option<u64> {
        self.volume
    }

    /// True when all four prices are present.
    pub fn is_complete(&self) -> bool {
        self.open.is_some() && self.high.is_some() && self.low.is_some()
    }
}

/// Convert an optional price and reject it if negative.
fn optional_price(
    field: &'static str,
    input: Option<&DecimalInput>,
) -> Result<Option<Decimal>, ValidationError> {
    let Some(input) = input else {
        return Ok(None);
    };
    let value = to_decimal(field, input)?;
    check_non_negative(field, value)?;
    Ok(Some(value))
}

fn check_non_negative(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_within(
    field: &'static str,
    value: Decimal,
    low: Option<Decimal>,
    high: Option<Decimal>,
) -> Result<(), ValidationError> {
    if let Some(l) = low {
        if value < l {
            return Err(ValidationError::BelowLow {
                field,
                value,
                low: l,
            });
        }
    }
    if let Some(h) = high {
        if value > h {
            return Err(ValidationError::AboveHigh {
                field,
                value,
                high: h,
            });
        }
    }
    Ok(())
}

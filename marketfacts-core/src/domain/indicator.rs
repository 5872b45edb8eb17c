//! IndicatorFact — one scalar observation of a named indicator.
//!
//! Covers both macroeconomic series (entity = country code, e.g. `BR` /
//! `SELIC`) and asset-level metrics (entity = asset code, e.g. `PETR4` /
//! `ROIC`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::ValidationError;
use super::input::{
    normalize_identity, to_decimal, to_utc, DecimalInput, TimestampInput, TimestampPrecision,
};

/// Indicator names are restricted to this alphabet after uppercasing.
pub const NAME_RULE: &str = "[A-Z0-9_.-]+";

/// Raw indicator observation from a source, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawIndicator {
    pub entity: String,
    pub ts: TimestampInput,
    pub name: String,
    pub value: DecimalInput,
}

impl RawIndicator {
    pub fn new(
        entity: impl Into<String>,
        ts: impl Into<TimestampInput>,
        name: impl Into<String>,
        value: impl Into<DecimalInput>,
    ) -> Self {
        Self {
            entity: entity.into(),
            ts: ts.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn build(self) -> Result<IndicatorFact, ValidationError> {
        IndicatorFact::new(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorFact {
    entity: String,
    ts: DateTime<Utc>,
    name: String,
    value: Decimal,
}

impl IndicatorFact {
    /// Validate a raw observation.
    ///
    /// Order: entity and name presence, timezone, minute precision, value
    /// finiteness, name pattern.
    pub fn new(raw: RawIndicator) -> Result<Self, ValidationError> {
        let entity = normalize_identity("entity", &raw.entity)?;
        let name = normalize_identity("name", &raw.name)?;

        let ts = to_utc("ts", &raw.ts)?;
        TimestampPrecision::Minute.check("ts", ts)?;

        let value = to_decimal("value", &raw.value)?;

        if !is_valid_name(&name) {
            return Err(ValidationError::Pattern {
                field: "name",
                value: raw.name,
                rule: NAME_RULE,
            });
        }

        Ok(Self {
            entity,
            ts,
            name,
            value,
        })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Decimal {
        self.value
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
}

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ValidationError;
use super::indicator::IndicatorFact;
use super::input::normalize_identity;
use super::listing::{validate_currency, Listing};
use super::price::PriceBarFact;

const COUNTRY_RULE: &str = "two ASCII letters (ISO 3166-1 alpha-2)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EconomicUnitType {
    Sovereign,
    Corporate,
    Supranational,
    Other,
}

/// Aggregate root for an economic unit: a country, a corporation or a
/// supranational body. Identity is `(code, unit_type)`.
///
/// Units that issue tradable instruments may also carry listings and price
/// series. Collections are shared immutable slices; cloning a unit aliases the
/// same facts.
#[derive(Debug, Clone, PartialEq)]
pub struct EconomicUnit {
    code: String,
    unit_type: EconomicUnitType,
    name: Option<String>,
    currency: Option<String>,
    indicators: Arc<[IndicatorFact]>,
    listings: Arc<[Listing]>,
    prices: Arc<[PriceBarFact]>,
}

impl EconomicUnit {
    pub fn new(code: &str, unit_type: EconomicUnitType) -> Result<Self, ValidationError> {
        Ok(Self {
            code: normalize_identity("code", code)?,
            unit_type,
            name: None,
            currency: None,
            indicators: Arc::from(Vec::new()),
            listings: Arc::from(Vec::new()),
            prices: Arc::from(Vec::new()),
        })
    }

    /// A sovereign unit keyed by its ISO 3166-1 alpha-2 code.
    pub fn country(iso_code: &str) -> Result<Self, ValidationError> {
        let code = validate_country_code("code", iso_code)?;
        Self::new(&code, EconomicUnitType::Sovereign)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Result<Self, ValidationError> {
        self.currency = Some(validate_currency("currency", currency)?);
        Ok(self)
    }

    pub fn with_indicators(mut self, indicators: impl Into<Arc<[IndicatorFact]>>) -> Self {
        self.indicators = indicators.into();
        self
    }

    pub fn with_listings(mut self, listings: impl Into<Arc<[Listing]>>) -> Self {
        self.listings = listings.into();
        self
    }

    pub fn with_prices(mut self, prices: impl Into<Arc<[PriceBarFact]>>) -> Self {
        self.prices = prices.into();
        self
    }

    pub fn identity(&self) -> (&str, EconomicUnitType) {
        (&self.code, self.unit_type)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn unit_type(&self) -> EconomicUnitType {
        self.unit_type
    }

    pub fn is_country(&self) -> bool {
        self.unit_type == EconomicUnitType::Sovereign
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn indicators(&self) -> &[IndicatorFact] {
        &self.indicators
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn prices(&self) -> &[PriceBarFact] {
        &self.prices
    }

    /// Observations of one indicator, in stored order.
    pub fn indicator_series<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a IndicatorFact> + 'a {
        let wanted = name.trim().to_uppercase();
        self.indicators.iter().filter(move |f| f.name() == wanted)
    }
}

/// Trim, uppercase and check a two-letter country code.
pub fn validate_country_code(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let code = normalize_identity(field, raw)?;
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(ValidationError::Pattern {
            field,
            value: raw.to_string(),
            rule: COUNTRY_RULE,
        })
    }
}

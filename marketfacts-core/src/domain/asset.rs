//! Asset aggregate root.

use std::sync::Arc;

use super::economic_unit::validate_country_code;
use super::error::ValidationError;
use super::indicator::IndicatorFact;
use super::input::normalize_identity;
use super::listing::{validate_currency, Listing};
use super::price::PriceBarFact;

/// A tradable asset and the facts collected for it.
///
/// Identity is `(code, exchange)`. Facts are kept in the order they were
/// supplied; callers that need time ordering sort before assembling.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    code: String,
    exchange: Option<String>,
    name: Option<String>,
    currency: Option<String>,
    country_code: Option<String>,
    listings: Arc<[Listing]>,
    prices: Arc<[PriceBarFact]>,
    indicators: Arc<[IndicatorFact]>,
}

impl Asset {
    pub fn new(code: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            code: normalize_identity("code", code)?,
            exchange: None,
            name: None,
            currency: None,
            country_code: None,
            listings: Arc::from(Vec::new()),
            prices: Arc::from(Vec::new()),
            indicators: Arc::from(Vec::new()),
        })
    }

    pub fn with_exchange(mut self, exchange: &str) -> Result<Self, ValidationError> {
        self.exchange = Some(normalize_identity("exchange", exchange)?);
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Result<Self, ValidationError> {
        self.currency = Some(validate_currency("currency", currency)?);
        Ok(self)
    }

    pub fn with_country(mut self, country_code: &str) -> Result<Self, ValidationError> {
        self.country_code = Some(validate_country_code("country_code", country_code)?);
        Ok(self)
    }

    pub fn with_listings(mut self, listings: impl Into<Arc<[Listing]>>) -> Self {
        self.listings = listings.into();
        self
    }

    pub fn with_prices(mut self, prices: impl Into<Arc<[PriceBarFact]>>) -> Self {
        self.prices = prices.into();
        self
    }

    pub fn with_indicators(mut self, indicators: impl Into<Arc<[IndicatorFact]>>) -> Self {
        self.indicators = indicators.into();
        self
    }

    pub fn identity(&self) -> (&str, Option<&str>) {
        (&self.code, self.exchange.as_deref())
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn exchange(&self) -> Option<&str> {
        self.exchange.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn prices(&self) -> &[PriceBarFact] {
        &self.prices
    }

    pub fn indicators(&self) -> &[IndicatorFact] {
        &self.indicators
    }

    /// Shared handle to the price series, for handing to another owner
    /// without copying.
    pub fn price_series(&self) -> Arc<[PriceBarFact]> {
        Arc::clone(&self.prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::RawPriceBar;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(day_offset: i64) -> PriceBarFact {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RawPriceBar::new("PETR4", "1d", t0 + Duration::days(day_offset), 30i64)
            .build()
            .unwrap()
    }

    #[test]
    fn identity_fields_are_normalized() {
        let asset = Asset::new(" petr4 ")
            .unwrap()
            .with_exchange("b3")
            .unwrap()
            .with_currency("brl")
            .unwrap()
            .with_country("br")
            .unwrap()
            .with_name("Petrobras PN");
        assert_eq!(asset.identity(), ("PETR4", Some("B3")));
        assert_eq!(asset.currency(), Some("BRL"));
        assert_eq!(asset.country_code(), Some("BR"));
        assert_eq!(asset.name(), Some("Petrobras PN"));
    }

    #[test]
    fn invalid_identity_fields_are_rejected() {
        assert_eq!(
            Asset::new("").unwrap_err(),
            ValidationError::Empty { field: "code" }
        );
        let asset = Asset::new("AAPL").unwrap();
        assert!(asset.clone().with_currency("dollars").is_err());
        assert!(asset.clone().with_country("USA").is_err());
        assert!(asset.with_exchange("  ").is_err());
    }

    #[test]
    fn prices_are_not_reordered() {
        let asset = Asset::new("PETR4")
            .unwrap()
            .with_prices(vec![bar(2), bar(0), bar(1)]);
        let days: Vec<_> = asset.prices().iter().map(|b| b.ts()).collect();
        assert_eq!(days, vec![bar(2).ts(), bar(0).ts(), bar(1).ts()]);
    }

    #[test]
    fn clones_alias_the_same_facts() {
        let asset = Asset::new("PETR4").unwrap().with_prices(vec![bar(0)]);
        let copy = asset.clone();
        assert!(Arc::ptr_eq(&asset.price_series(), &copy.price_series()));
        assert!(asset.listings().is_empty());
        assert!(asset.indicators().is_empty());
    }
}

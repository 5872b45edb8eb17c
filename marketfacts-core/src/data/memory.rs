//! In-memory repository over preloaded facts.

use std::collections::{BTreeMap, BTreeSet};

use super::repository::{
    EconomicUnitReadRepository, IndicatorQuery, IndicatorReadRepository, IndicatorStream,
    ListingPriceQuery, ListingPriceReadRepository, ListingReadRepository, ListingStream,
    PriceQuery, PriceReadRepository, PriceStream, RepositoryError,
};
use crate::domain::{EconomicUnit, IndicatorFact, Listing, PriceBarFact};

/// Serves every read contract from owned vectors.
///
/// Fact results are filtered by the query and stably sorted by timestamp, so
/// facts sharing a timestamp keep their load order. Listing prices are the
/// price facts whose code is the listing symbol. Codes and symbols marked with
/// [`with_outage`](Self::with_outage) answer with `SourceUnavailable`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    name: String,
    prices: Vec<PriceBarFact>,
    indicators: Vec<IndicatorFact>,
    units: Vec<EconomicUnit>,
    listings: BTreeMap<String, Vec<Listing>>,
    outages: BTreeSet<String>,
}

impl InMemoryRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_prices(mut self, prices: impl IntoIterator<Item = PriceBarFact>) -> Self {
        self.prices.extend(prices);
        self
    }

    pub fn with_indicators(mut self, indicators: impl IntoIterator<Item = IndicatorFact>) -> Self {
        self.indicators.extend(indicators);
        self
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = EconomicUnit>) -> Self {
        self.units.extend(units);
        self
    }

    /// Listings served for the unit with `unit_code`, in the given order.
    pub fn with_listings(
        mut self,
        unit_code: &str,
        listings: impl IntoIterator<Item = Listing>,
    ) -> Self {
        self.listings
            .entry(unit_code.trim().to_uppercase())
            .or_default()
            .extend(listings);
        self
    }

    pub fn with_outage(mut self, identity: &str) -> Self {
        self.outages.insert(identity.trim().to_uppercase());
        self
    }

    /// Number of price and indicator facts held.
    pub fn len(&self) -> usize {
        self.prices.len() + self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_outage(&self, identity: &str) -> Result<(), RepositoryError> {
        if self.outages.contains(identity) {
            return Err(RepositoryError::SourceUnavailable {
                source_name: self.name.clone(),
                reason: format!("{identity} is unreachable"),
            });
        }
        Ok(())
    }
}

impl PriceReadRepository for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_prices<'a>(&'a self, query: &PriceQuery) -> Result<PriceStream<'a>, RepositoryError> {
        self.check_outage(query.code())?;
        let mut hits: Vec<&PriceBarFact> = self.prices.iter().filter(|b| query.matches(b)).collect();
        hits.sort_by_key(|b| b.ts());
        Ok(Box::new(hits.into_iter().cloned().map(Ok)))
    }
}

impl IndicatorReadRepository for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_indicator<'a>(
        &'a self,
        query: &IndicatorQuery,
    ) -> Result<IndicatorStream<'a>, RepositoryError> {
        self.check_outage(query.entity())?;
        let mut hits: Vec<&IndicatorFact> =
            self.indicators.iter().filter(|f| query.matches(f)).collect();
        hits.sort_by_key(|f| f.ts());
        Ok(Box::new(hits.into_iter().cloned().map(Ok)))
    }
}

impl EconomicUnitReadRepository for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_by_code(&self, code: &str) -> Result<Option<EconomicUnit>, RepositoryError> {
        let code = code.trim().to_uppercase();
        self.check_outage(&code)?;
        Ok(self.units.iter().find(|u| u.code() == code).cloned())
    }

    fn list_all(&self) -> Result<Vec<EconomicUnit>, RepositoryError> {
        Ok(self.units.clone())
    }
}

impl ListingReadRepository for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_listings<'a>(&'a self, unit: &EconomicUnit) -> Result<ListingStream<'a>, RepositoryError> {
        self.check_outage(unit.code())?;
        let listings = self.listings.get(unit.code()).map_or(&[][..], Vec::as_slice);
        Ok(Box::new(listings.iter().cloned().map(Ok)))
    }
}

impl ListingPriceReadRepository for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_listing_prices<'a>(
        &'a self,
        query: &ListingPriceQuery,
    ) -> Result<PriceStream<'a>, RepositoryError> {
        self.check_outage(query.listing().symbol())?;
        let mut hits: Vec<&PriceBarFact> = self.prices.iter().filter(|b| query.matches(b)).collect();
        hits.sort_by_key(|b| b.ts());
        Ok(Box::new(hits.into_iter().cloned().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repository::TimeWindow;
    use crate::domain::{EconomicUnitType, InstrumentType, Interval, RawIndicator, RawPriceBar};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn t(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn bar(code: &str, day: i64, close: i64) -> PriceBarFact {
        RawPriceBar::new(code, "1d", t(day), close).build().unwrap()
    }

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new("fixture")
            .with_prices([bar("AAPL", 3, 3), bar("MSFT", 1, 9), bar("AAPL", 1, 1), bar("AAPL", 2, 2)])
            .with_indicators([
                RawIndicator::new("BR", t(2), "SELIC", 11i64).build().unwrap(),
                RawIndicator::new("BR", t(1), "SELIC", 12i64).build().unwrap(),
                RawIndicator::new("BR", t(1), "IPCA", 4i64).build().unwrap(),
            ])
    }

    #[test]
    fn prices_are_filtered_and_ascending() {
        let repo = repo();
        let q = PriceQuery::new("aapl", Interval::Day1, TimeWindow::since(t(2))).unwrap();
        let closes: Vec<_> = repo
            .get_prices(&q)
            .unwrap()
            .map(|r| r.unwrap().close())
            .collect();
        assert_eq!(closes, vec![dec!(2), dec!(3)]);
    }

    #[test]
    fn other_intervals_are_excluded() {
        let repo = repo();
        let q = PriceQuery::new("AAPL", Interval::Hour1, TimeWindow::since(t(0))).unwrap();
        assert_eq!(repo.get_prices(&q).unwrap().count(), 0);
    }

    #[test]
    fn indicators_are_filtered_by_name() {
        let repo = repo();
        let q = IndicatorQuery::new("br", "selic", TimeWindow::since(t(0))).unwrap();
        let days: Vec<_> = repo
            .get_indicator(&q)
            .unwrap()
            .map(|r| r.unwrap().ts())
            .collect();
        assert_eq!(days, vec![t(1), t(2)]);
    }

    #[test]
    fn outage_surfaces_as_source_unavailable() {
        let repo = repo().with_outage("msft");
        let q = PriceQuery::new("MSFT", Interval::Day1, TimeWindow::since(t(0))).unwrap();
        assert!(matches!(
            repo.get_prices(&q),
            Err(RepositoryError::SourceUnavailable { .. })
        ));
    }

    fn listing(symbol: &str) -> Listing {
        Listing::new(symbol, "B3", "BRL", Some(InstrumentType::Equity)).unwrap()
    }

    #[test]
    fn units_are_found_by_normalized_code() {
        let repo = InMemoryRepository::new("fixture").with_units([
            EconomicUnit::country("BR").unwrap(),
            EconomicUnit::new("PETR", EconomicUnitType::Corporate).unwrap(),
        ]);
        let petr = repo.get_by_code(" petr ").unwrap().unwrap();
        assert_eq!(petr.unit_type(), EconomicUnitType::Corporate);
        assert_eq!(repo.get_by_code("VALE").unwrap(), None);
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }

    #[test]
    fn listings_keep_registration_order() {
        let repo = InMemoryRepository::new("fixture")
            .with_listings("petr", [listing("PETR4"), listing("PETR3")]);
        let unit = EconomicUnit::new("PETR", EconomicUnitType::Corporate).unwrap();

        let symbols: Vec<_> = repo
            .get_listings(&unit)
            .unwrap()
            .map(|l| l.unwrap().symbol().to_string())
            .collect();
        assert_eq!(symbols, vec!["PETR4", "PETR3"]);

        let other = EconomicUnit::country("BR").unwrap();
        assert_eq!(repo.get_listings(&other).unwrap().count(), 0);
    }

    #[test]
    fn listing_prices_follow_the_symbol() {
        let repo = InMemoryRepository::new("fixture")
            .with_prices([bar("PETR4", 2, 31), bar("PETR3", 1, 29), bar("PETR4", 1, 30)]);
        let q = ListingPriceQuery::new(listing("PETR4"), Interval::Day1, TimeWindow::since(t(0)));
        let closes: Vec<_> = repo
            .get_listing_prices(&q)
            .unwrap()
            .map(|r| r.unwrap().close())
            .collect();
        assert_eq!(closes, vec![dec!(30), dec!(31)]);
    }
}

use marketfacts_core::data::{
    IndicatorQuery, IndicatorReadRepository, ListingPriceQuery, ListingPriceReadRepository,
    ListingReadRepository, RepositoryError, TimeWindow,
};
use marketfacts_core::domain::{EconomicUnit, IndicatorFact, Interval, Listing, PriceBarFact};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{ConsistencyError, UseCaseError};

/// Fetch a set of named indicators for one economic unit and attach them.
///
/// Series are fetched in the order the names are given, each sorted by
/// timestamp, and concatenated. Every observation must belong to the unit's
/// code and the requested name.
pub struct BuildEconomicUnitWithIndicators {
    repo: Arc<dyn IndicatorReadRepository>,
}

impl BuildEconomicUnitWithIndicators {
    pub fn new(repo: Arc<dyn IndicatorReadRepository>) -> Self {
        Self { repo }
    }

    pub fn execute(
        &self,
        unit: EconomicUnit,
        names: &[&str],
        window: TimeWindow,
    ) -> Result<EconomicUnit, UseCaseError> {
        let mut indicators: Vec<IndicatorFact> = Vec::new();

        for name in names {
            let query = IndicatorQuery::new(unit.code(), name, window)?;
            let mut series = self
                .repo
                .get_indicator(&query)?
                .collect::<Result<Vec<_>, RepositoryError>>()?;
            series.sort_by_key(|f| f.ts());

            for fact in &series {
                ConsistencyError::check("entity", query.entity(), fact.entity())?;
                ConsistencyError::check("name", query.name(), fact.name())?;
            }

            if series.is_empty() {
                warn!(source = self.repo.name(), entity = query.entity(), name = query.name(), "no observations returned");
            } else {
                debug!(source = self.repo.name(), entity = query.entity(), name = query.name(), rows = series.len(), "fetched indicator");
            }
            indicators.extend(series);
        }

        Ok(unit.with_indicators(indicators))
    }
}

/// Attach a unit's listings and, per listing, its prices.
///
/// Listings keep the source's order. Each listing's prices are sorted by
/// timestamp and appended after the previous listing's, so the unit's price
/// series is grouped by listing. With identity checks on (the default), a
/// fact whose code is not the listing symbol, or whose interval differs,
/// aborts the call.
pub struct BuildEconomicUnitWithListings {
    listings: Arc<dyn ListingReadRepository>,
    prices: Arc<dyn ListingPriceReadRepository>,
    verify_identity: bool,
}

impl BuildEconomicUnitWithListings {
    pub fn new(
        listings: Arc<dyn ListingReadRepository>,
        prices: Arc<dyn ListingPriceReadRepository>,
    ) -> Self {
        Self {
            listings,
            prices,
            verify_identity: true,
        }
    }

    pub fn verify_identity(mut self, verify: bool) -> Self {
        self.verify_identity = verify;
        self
    }

    pub fn execute(
        &self,
        unit: EconomicUnit,
        interval: Interval,
        window: TimeWindow,
    ) -> Result<EconomicUnit, UseCaseError> {
        let listings = self
            .listings
            .get_listings(&unit)?
            .collect::<Result<Vec<Listing>, RepositoryError>>()?;
        if listings.is_empty() {
            warn!(source = self.listings.name(), code = unit.code(), "no listings returned");
        }

        let mut prices: Vec<PriceBarFact> = Vec::new();
        for listing in &listings {
            let query = ListingPriceQuery::new(listing.clone(), interval, window);
            let mut series = self
                .prices
                .get_listing_prices(&query)?
                .collect::<Result<Vec<_>, RepositoryError>>()?;
            series.sort_by_key(|b| b.ts());

            if self.verify_identity {
                for bar in &series {
                    ConsistencyError::check("code", listing.symbol(), bar.code())?;
                    ConsistencyError::check("interval", interval.label(), bar.interval().label())?;
                }
            }
            debug!(source = self.prices.name(), symbol = listing.symbol(), rows = series.len(), "fetched listing prices");
            prices.extend(series);
        }

        Ok(unit.with_listings(listings).with_prices(prices))
    }
}

//! Read-repository contracts for price and indicator facts, economic units
//! and their listings.
//!
//! Sources (flat files, HTTP adapters, in-memory fixtures) implement these
//! traits so use cases can be composed against any of them. Implementations
//! must uphold the ordering and filtering guarantees documented on each
//! method; use cases rely on them.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{EconomicUnit, IndicatorFact, Interval, Listing, PriceBarFact, ValidationError};

/// The caller asked for something no source can answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("window start {start} is after end {end}")]
    StartAfterEnd {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("query {field} must not be empty")]
    EmptyIdentity { field: &'static str },

    #[error("source '{source_name}' does not serve '{identity}'")]
    UnsupportedIdentity {
        source_name: String,
        identity: String,
    },
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("source '{source_name}' returned an invalid fact: {error}")]
    Validation {
        source_name: String,
        error: ValidationError,
    },
}

/// Closed-start time window. `end = None` runs through the latest fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self, QueryError> {
        if let Some(end) = end {
            if start > end {
                return Err(QueryError::StartAfterEnd { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// Everything from `start` onwards.
    pub fn since(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Both bounds inclusive.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && self.end.map_or(true, |end| ts <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    code: String,
    interval: Interval,
    window: TimeWindow,
}

impl PriceQuery {
    pub fn new(code: &str, interval: Interval, window: TimeWindow) -> Result<Self, QueryError> {
        Ok(Self {
            code: query_identity("code", code)?,
            interval,
            window,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Whether a fact satisfies this query's identity, interval and window.
    pub fn matches(&self, fact: &PriceBarFact) -> bool {
        fact.code() == self.code
            && fact.interval() == self.interval
            && self.window.contains(fact.ts())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorQuery {
    entity: String,
    name: String,
    window: TimeWindow,
}

impl IndicatorQuery {
    pub fn new(entity: &str, name: &str, window: TimeWindow) -> Result<Self, QueryError> {
        Ok(Self {
            entity: query_identity("entity", entity)?,
            name: query_identity("name", name)?,
            window,
        })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn matches(&self, fact: &IndicatorFact) -> bool {
        fact.entity() == self.entity && fact.name() == self.name && self.window.contains(fact.ts())
    }
}

/// Prices of one listing, matched on its symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPriceQuery {
    listing: Listing,
    interval: Interval,
    window: TimeWindow,
}

impl ListingPriceQuery {
    pub fn new(listing: Listing, interval: Interval, window: TimeWindow) -> Self {
        Self {
            listing,
            interval,
            window,
        }
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn matches(&self, fact: &PriceBarFact) -> bool {
        fact.code() == self.listing.symbol()
            && fact.interval() == self.interval
            && self.window.contains(fact.ts())
    }
}

fn query_identity(field: &'static str, raw: &str) -> Result<String, QueryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QueryError::EmptyIdentity { field });
    }
    Ok(trimmed.to_uppercase())
}

pub type PriceStream<'a> = Box<dyn Iterator<Item = Result<PriceBarFact, RepositoryError>> + 'a>;
pub type IndicatorStream<'a> =
    Box<dyn Iterator<Item = Result<IndicatorFact, RepositoryError>> + 'a>;

pub type ListingStream<'a> = Box<dyn Iterator<Item = Result<Listing, RepositoryError>> + 'a>;

/// Source of price bars.
///
/// Implementations yield facts with ascending timestamps, restricted to the
/// query's code, interval and window. An empty stream is a valid answer.
/// Transport failures surface as [`RepositoryError::SourceUnavailable`] and
/// are never retried here.
pub trait PriceReadRepository: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    fn get_prices<'a>(&'a self, query: &PriceQuery) -> Result<PriceStream<'a>, RepositoryError>;
}

/// Source of indicator observations. Same guarantees as [`PriceReadRepository`].
pub trait IndicatorReadRepository: Send + Sync {
    fn name(&self) -> &str;

    fn get_indicator<'a>(
        &'a self,
        query: &IndicatorQuery,
    ) -> Result<IndicatorStream<'a>, RepositoryError>;
}

/// Lookup of known economic units.
pub trait EconomicUnitReadRepository: Send + Sync {
    fn name(&self) -> &str;

    /// The unit with this code, `None` when the source does not know it.
    fn get_by_code(&self, code: &str) -> Result<Option<EconomicUnit>, RepositoryError>;

    fn list_all(&self) -> Result<Vec<EconomicUnit>, RepositoryError>;
}

/// Source of the listings an economic unit trades under.
///
/// Listings come back in the source's order; they carry no timestamp. An
/// empty stream means the unit has no tradable instruments.
pub trait ListingReadRepository: Send + Sync {
    fn name(&self) -> &str;

    fn get_listings<'a>(&'a self, unit: &EconomicUnit) -> Result<ListingStream<'a>, RepositoryError>;
}

/// Source of price bars keyed by listing. Same guarantees as
/// [`PriceReadRepository`], with every fact's code equal to the listing symbol.
pub trait ListingPriceReadRepository: Send + Sync {
    fn name(&self) -> &str;

    fn get_listing_prices<'a>(
        &'a self,
        query: &ListingPriceQuery,
    ) -> Result<PriceStream<'a>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstrumentType, RawPriceBar};
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        let err = TimeWindow::new(day(5), Some(day(4))).unwrap_err();
        assert_eq!(
            err,
            QueryError::StartAfterEnd {
                start: day(5),
                end: day(4)
            }
        );
        assert!(TimeWindow::new(day(5), Some(day(5))).is_ok());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = TimeWindow::new(day(2), Some(day(4))).unwrap();
        assert!(!w.contains(day(1)));
        assert!(w.contains(day(2)));
        assert!(w.contains(day(4)));
        assert!(!w.contains(day(5)));
    }

    #[test]
    fn open_window_has_no_upper_bound() {
        let w = TimeWindow::since(day(2));
        assert!(w.contains(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()));
        assert!(!w.contains(day(1)));
    }

    #[test]
    fn queries_normalize_identity() {
        let q = PriceQuery::new(" aapl", Interval::Day1, TimeWindow::since(day(1))).unwrap();
        assert_eq!(q.code(), "AAPL");

        let err = IndicatorQuery::new("BR", " ", TimeWindow::since(day(1))).unwrap_err();
        assert_eq!(err, QueryError::EmptyIdentity { field: "name" });
    }

    #[test]
    fn listing_query_matches_on_symbol() {
        let listing = Listing::new("brl/usd", "FX", "USD", Some(InstrumentType::Fx)).unwrap();
        let q = ListingPriceQuery::new(listing, Interval::Day1, TimeWindow::since(day(2)));
        let bar = |code: &str, d: u32| RawPriceBar::new(code, "1d", day(d), "0.2").build().unwrap();
        let (fx, early, other) = (bar("BRL/USD", 3), bar("BRL/USD", 1), bar("EUR/USD", 3));
        assert!(q.matches(&fx));
        assert!(!q.matches(&early));
        assert!(!q.matches(&other));
    }

    #[test]
    fn query_error_converts_into_repository_error() {
        let err: RepositoryError = QueryError::EmptyIdentity { field: "code" }.into();
        assert!(matches!(err, RepositoryError::Query(_)));
    }
}

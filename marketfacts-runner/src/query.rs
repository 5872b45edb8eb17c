//! Caller-facing query DTO.

use chrono::{DateTime, Utc};
use marketfacts_core::data::{PriceQuery, QueryError, TimeWindow};
use marketfacts_core::domain::Interval;
use serde::{Deserialize, Serialize};

/// Prices for one or more identities over one interval and window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricesQuery {
    pub identities: Vec<String>,
    pub interval: Interval,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl PricesQuery {
    pub fn new(
        identities: impl IntoIterator<Item = impl Into<String>>,
        interval: Interval,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            identities: identities.into_iter().map(Into::into).collect(),
            interval,
            start,
            end,
        }
    }

    pub fn single(
        identity: impl Into<String>,
        interval: Interval,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        Self::new([identity.into()], interval, start, end)
    }

    pub fn window(&self) -> Result<TimeWindow, QueryError> {
        TimeWindow::new(self.start, self.end)
    }

    /// Repository query for one identity of this DTO.
    pub fn price_query(&self, identity: &str) -> Result<PriceQuery, QueryError> {
        PriceQuery::new(identity, self.interval, self.window()?)
    }

    /// Repository queries in input order. Fails on the first bad identity.
    pub fn price_queries(&self) -> Result<Vec<PriceQuery>, QueryError> {
        let window = self.window()?;
        self.identities
            .iter()
            .map(|id| PriceQuery::new(id, self.interval, window))
            .collect()
    }
}

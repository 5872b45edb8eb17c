use marketfacts_core::data::{PriceQuery, PriceReadRepository, RepositoryError};
use marketfacts_core::domain::PriceBarFact;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{fetch_sorted, UseCaseError};
use crate::config::FailurePolicy;
use crate::query::PricesQuery;

/// Materialize one repository query, as the repository ordered it.
pub struct GetPrices {
    repo: Arc<dyn PriceReadRepository>,
}

impl GetPrices {
    pub fn new(repo: Arc<dyn PriceReadRepository>) -> Self {
        Self { repo }
    }

    pub fn execute(&self, query: &PriceQuery) -> Result<Vec<PriceBarFact>, UseCaseError> {
        let bars = self
            .repo
            .get_prices(query)?
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        debug!(source = self.repo.name(), code = query.code(), rows = bars.len(), "fetched prices");
        Ok(bars)
    }
}

/// An identity left out of a [`MultiFetch`] under `SkipAndLog`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedIdentity {
    pub identity: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiFetch {
    /// Per-identity series, concatenated in request order.
    pub prices: Vec<PriceBarFact>,
    pub skipped: Vec<SkippedIdentity>,
}

impl MultiFetch {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Fetch several identities one after another and concatenate the results.
///
/// Each identity's series is ascending; there is no global re-sort, so the
/// output follows the request's identity order. A bad window fails the whole
/// call. Per-identity query and repository failures follow the configured
/// [`FailurePolicy`]. A consistency violation is always fatal.
pub struct GetPricesMultipleIdentities {
    repo: Arc<dyn PriceReadRepository>,
    policy: FailurePolicy,
    verify_identity: bool,
}

impl GetPricesMultipleIdentities {
    pub fn new(repo: Arc<dyn PriceReadRepository>) -> Self {
        Self {
            repo,
            policy: FailurePolicy::default(),
            verify_identity: true,
        }
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn verify_identity(mut self, verify: bool) -> Self {
        self.verify_identity = verify;
        self
    }

    pub fn execute(&self, query: &PricesQuery) -> Result<MultiFetch, UseCaseError> {
        let window = query.window()?;
        let mut out = MultiFetch::default();

        for identity in &query.identities {
            let fetched = PriceQuery::new(identity, query.interval, window)
                .map_err(UseCaseError::from)
                .and_then(|q| fetch_sorted(self.repo.as_ref(), &q, self.verify_identity));

            match fetched {
                Ok(bars) => {
                    debug!(source = self.repo.name(), code = %identity, rows = bars.len(), "fetched prices");
                    out.prices.extend(bars);
                }
                Err(e @ UseCaseError::Consistency(_)) => return Err(e),
                Err(e) => match self.policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::SkipAndLog => {
                        warn!(source = self.repo.name(), code = %identity, error = %e, "skipping identity");
                        out.skipped.push(SkippedIdentity {
                            identity: identity.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok(out)
    }
}

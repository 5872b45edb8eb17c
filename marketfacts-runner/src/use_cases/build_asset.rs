use marketfacts_core::data::{PriceQuery, PriceReadRepository};
use marketfacts_core::domain::Asset;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{fetch_sorted, ConsistencyError, UseCaseError};

/// Fetch one identity's prices and assemble an [`Asset`] holding them in
/// ascending timestamp order.
///
/// Facts sharing a timestamp keep their fetch order. With identity checks on
/// (the default), the first fact whose code or interval differs from the
/// query aborts the call with a `ConsistencyError`.
pub struct BuildAssetWithPrices {
    repo: Arc<dyn PriceReadRepository>,
    verify_identity: bool,
}

impl BuildAssetWithPrices {
    pub fn new(repo: Arc<dyn PriceReadRepository>) -> Self {
        Self {
            repo,
            verify_identity: true,
        }
    }

    pub fn verify_identity(mut self, verify: bool) -> Self {
        self.verify_identity = verify;
        self
    }

    pub fn execute(&self, query: &PriceQuery) -> Result<Asset, UseCaseError> {
        self.execute_into(Asset::new(query.code())?, query)
    }

    /// Attach prices to an asset that already carries its descriptive fields.
    pub fn execute_into(&self, asset: Asset, query: &PriceQuery) -> Result<Asset, UseCaseError> {
        ConsistencyError::check("code", asset.code(), query.code())?;
        let bars = fetch_sorted(self.repo.as_ref(), query, self.verify_identity)?;
        if bars.is_empty() {
            warn!(
                source = self.repo.name(),
                code = query.code(),
                interval = %query.interval(),
                "no prices returned"
            );
        } else {
            debug!(
                source = self.repo.name(),
                code = query.code(),
                rows = bars.len(),
                "built asset prices"
            );
        }
        Ok(asset.with_prices(bars))
    }
}

//! Use-case orchestrators: repository calls composed into sorted,
//! identity-checked results and assembled aggregates.
//!
//! Every orchestrator is stateless. Repositories are called sequentially and
//! never retried; one call either returns a complete result or an error.

pub mod build_asset;
pub mod build_economic_unit;
pub mod get_prices;

pub use build_asset::BuildAssetWithPrices;
pub use build_economic_unit::{BuildEconomicUnitWithIndicators, BuildEconomicUnitWithListings};
pub use get_prices::{GetPrices, GetPricesMultipleIdentities, MultiFetch, SkippedIdentity};

use marketfacts_core::data::{PriceQuery, PriceReadRepository, QueryError, RepositoryError};
use marketfacts_core::domain::{PriceBarFact, ValidationError};
use thiserror::Error;

/// A fetched fact belongs to a different identity than the one requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} mismatch: expected {expected}, found {found}")]
pub struct ConsistencyError {
    pub field: &'static str,
    pub expected: String,
    pub found: String,
}

impl ConsistencyError {
    /// `Err` unless `found == expected`.
    pub fn check(field: &'static str, expected: &str, found: &str) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(Self {
                field,
                expected: expected.to_string(),
                found: found.to_string(),
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Drain a price stream, stable-sort by timestamp and, when asked, check each
/// fact against the query's code and interval.
pub(crate) fn fetch_sorted(
    repo: &dyn PriceReadRepository,
    query: &PriceQuery,
    verify_identity: bool,
) -> Result<Vec<PriceBarFact>, UseCaseError> {
    let mut bars = repo
        .get_prices(query)?
        .collect::<Result<Vec<_>, RepositoryError>>()?;
    bars.sort_by_key(|b| b.ts());

    if verify_identity {
        for bar in &bars {
            ConsistencyError::check("code", query.code(), bar.code())?;
            ConsistencyError::check("interval", query.interval().label(), bar.interval().label())?;
        }
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_error_names_both_identities() {
        let err = ConsistencyError::check("code", "AAPL", "MSFT").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("AAPL") && msg.contains("MSFT"), "{msg}");
        assert!(ConsistencyError::check("code", "AAPL", "AAPL").is_ok());
    }

    #[test]
    fn use_case_error_keeps_message_transparent() {
        let err: UseCaseError = ConsistencyError::check("code", "AAPL", "MSFT")
            .unwrap_err()
            .into();
        assert_eq!(err.to_string(), "code mismatch: expected AAPL, found MSFT");
    }
}

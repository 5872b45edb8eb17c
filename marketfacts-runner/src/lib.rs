//! marketfacts runner: composition over `marketfacts-core`.
//!
//! - TOML configuration passed explicitly into adapters
//! - Source registry resolving configured sources to repositories
//! - Use-case orchestrators assembling sorted, identity-checked aggregates
//! - Best-effort pipeline with per-stage outcomes

pub mod config;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod use_cases;

pub use config::{ConfigError, FailurePolicy, RunnerConfig, SourceConfig};
pub use pipeline::{
    Dataset, IndicatorDataset, PipelineDataset, PipelineError, PipelineReport, PriceDataset,
    StageOutcome, StageReport,
};
pub use query::PricesQuery;
pub use registry::{RegistryError, ResolvedSources, SourceFactory, SourceRegistry};
pub use use_cases::{
    BuildAssetWithPrices, BuildEconomicUnitWithIndicators, BuildEconomicUnitWithListings,
    ConsistencyError, GetPrices, GetPricesMultipleIdentities, MultiFetch, SkippedIdentity,
    UseCaseError,
};

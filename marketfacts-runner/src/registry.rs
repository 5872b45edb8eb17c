//! Source registry: maps a configured source `kind` to a factory and resolves
//! every configured source once, at composition time.

use marketfacts_core::data::{CsvFactStore, PriceReadRepository};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::{RunnerConfig, SourceConfig};

/// Kind registered by [`SourceRegistry::with_defaults`].
pub const LOCAL_CSV: &str = "local_csv";

/// Id given to the implicit source when the config lists none.
pub const DEFAULT_SOURCE_ID: &str = "local";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown source kind: {0}")]
    UnknownKind(String),

    #[error("unknown source id: {0}")]
    UnknownSource(String),

    #[error("source kind '{0}' is already registered")]
    DuplicateKind(String),

    #[error("failed to build source '{id}': {reason}")]
    Build { id: String, reason: String },
}

pub type SourceFactory = Box<
    dyn Fn(&SourceConfig, &RunnerConfig) -> Result<Arc<dyn PriceReadRepository>, RegistryError>
        + Send
        + Sync,
>;

pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SourceRegistry {
    /// A registry with no kinds.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with the built-in `local_csv` kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.factories.insert(
            LOCAL_CSV.to_string(),
            Box::new(|source: &SourceConfig, config: &RunnerConfig| {
                let dir = source.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());
                let store = CsvFactStore::new(dir).with_precision(config.precision);
                Ok(Arc::new(store) as Arc<dyn PriceReadRepository>)
            }),
        );
        registry
    }

    pub fn register(&mut self, kind: &str, factory: SourceFactory) -> Result<(), RegistryError> {
        if self.factories.contains_key(kind) {
            return Err(RegistryError::DuplicateKind(kind.to_string()));
        }
        self.factories.insert(kind.to_string(), factory);
        Ok(())
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        source: &SourceConfig,
        config: &RunnerConfig,
    ) -> Result<Arc<dyn PriceReadRepository>, RegistryError> {
        let factory = self
            .factories
            .get(source.kind.as_str())
            .ok_or_else(|| RegistryError::UnknownKind(source.kind.clone()))?;
        let repo = factory(source, config)?;
        debug!(id = %source.id, kind = %source.kind, "resolved source");
        Ok(repo)
    }

    /// Build every source the config lists. With none listed, a single
    /// `local_csv` source named `local` over `config.data_dir`.
    pub fn resolve(&self, config: &RunnerConfig) -> Result<ResolvedSources, RegistryError> {
        let implicit;
        let sources: &[SourceConfig] = if config.sources.is_empty() {
            implicit = [SourceConfig::new(DEFAULT_SOURCE_ID, LOCAL_CSV)];
            &implicit
        } else {
            &config.sources
        };

        let mut resolved = BTreeMap::new();
        for source in sources {
            resolved.insert(source.id.clone(), self.create(source, config)?);
        }
        Ok(ResolvedSources { sources: resolved })
    }
}

/// Repositories keyed by source id.
pub struct ResolvedSources {
    sources: BTreeMap<String, Arc<dyn PriceReadRepository>>,
}

impl ResolvedSources {
    pub fn get(&self, id: &str) -> Result<Arc<dyn PriceReadRepository>, RegistryError> {
        self.sources
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownSource(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

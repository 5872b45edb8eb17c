//! Best-effort sequential pipeline.
//!
//! Stages run in order and their batches are merged. A stage that returns
//! nothing or fails is recorded and skipped; the run continues. The report
//! says which stages contributed, which were empty, and which failed.

use anyhow::Context;
use marketfacts_core::data::{
    indicators_to_frame, merge, prices_to_frame, Batch, IndicatorQuery, IndicatorReadRepository,
    PriceQuery, PriceReadRepository, RepositoryError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// A loader that produces one batch.
pub trait Dataset {
    fn name(&self) -> &str;

    fn load(&self) -> anyhow::Result<Batch>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Loaded { rows: usize },
    Empty,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: String,
    pub outcome: StageOutcome,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Merge of every loaded stage, `None` if none contributed.
    pub batch: Option<Batch>,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn loaded(&self) -> usize {
        self.count(|o| matches!(o, StageOutcome::Loaded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StageOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&StageOutcome) -> bool) -> usize {
        self.stages.iter().filter(|s| pred(&s.outcome)).count()
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline has no stages")]
    NoStages,
}

#[derive(Default)]
pub struct PipelineDataset {
    stages: Vec<Box<dyn Dataset>>,
}

impl PipelineDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: impl Dataset + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Dataset>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        if self.stages.is_empty() {
            return Err(PipelineError::NoStages);
        }

        let mut acc: Option<Batch> = None;
        let mut reports = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let outcome = match stage.load() {
                Ok(batch) if batch.is_empty() => {
                    warn!(stage = stage.name(), "stage returned no rows, skipping");
                    StageOutcome::Empty
                }
                Ok(batch) => {
                    let rows = batch.rows();
                    match merge(acc.clone(), Some(batch)) {
                        Ok(merged) => {
                            acc = merged;
                            StageOutcome::Loaded { rows }
                        }
                        Err(e) => {
                            warn!(stage = stage.name(), error = %e, "stage batch rejected by merge, skipping");
                            StageOutcome::Failed {
                                reason: e.to_string(),
                            }
                        }
                    }
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    warn!(stage = stage.name(), error = %reason, "stage failed, skipping");
                    StageOutcome::Failed { reason }
                }
            };
            reports.push(StageReport {
                stage: stage.name().to_string(),
                outcome,
            });
        }

        let report = PipelineReport {
            batch: acc,
            stages: reports,
        };
        info!(
            stages = report.stages.len(),
            loaded = report.loaded(),
            failed = report.failed(),
            rows = report.batch.as_ref().map_or(0, Batch::rows),
            "pipeline finished"
        );
        Ok(report)
    }
}

/// Stage that fetches one price query and projects it into a frame batch.
pub struct PriceDataset {
    name: String,
    repo: Arc<dyn PriceReadRepository>,
    query: PriceQuery,
}

impl PriceDataset {
    pub fn new(repo: Arc<dyn PriceReadRepository>, query: PriceQuery) -> Self {
        let name = format!("{}:{}:{}", repo.name(), query.code(), query.interval());
        Self { name, repo, query }
    }
}

impl Dataset for PriceDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> anyhow::Result<Batch> {
        let bars = self
            .repo
            .get_prices(&self.query)?
            .collect::<Result<Vec<_>, RepositoryError>>()
            .with_context(|| format!("fetching {}", self.name))?;
        let df = prices_to_frame(&bars)?;
        let mut batch = Batch::frame(df, self.repo.name());
        batch.meta = batch
            .meta
            .with_label("code", self.query.code())
            .with_label("interval", self.query.interval().label());
        Ok(batch)
    }
}

/// Stage that fetches one indicator series into a frame batch.
pub struct IndicatorDataset {
    name: String,
    repo: Arc<dyn IndicatorReadRepository>,
    query: IndicatorQuery,
}

impl IndicatorDataset {
    pub fn new(repo: Arc<dyn IndicatorReadRepository>, query: IndicatorQuery) -> Self {
        let name = format!("{}:{}:{}", repo.name(), query.entity(), query.name());
        Self { name, repo, query }
    }
}

impl Dataset for IndicatorDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> anyhow::Result<Batch> {
        let facts = self
            .repo
            .get_indicator(&self.query)?
            .collect::<Result<Vec<_>, RepositoryError>>()
            .with_context(|| format!("fetching {}", self.name))?;
        let mut batch = Batch::frame(indicators_to_frame(&facts)?, self.repo.name());
        batch.meta = batch
            .meta
            .with_label("entity", self.query.entity())
            .with_label("name", self.query.name());
        Ok(batch)
    }
}

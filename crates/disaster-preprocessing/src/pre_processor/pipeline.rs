use rayon::prelude::*;
use tracing::debug;

use super::batch::should_use_parallel;
use super::config::{PipelineConfig, StageConfig};
use super::stages::Stage;
use crate::error::{IssueKind, PipelineError};

/// An ordered sequence of stages applied one after another.
///
/// Immutable once built; share it by reference across threads.
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

/// Cleaned text together with the problems stages recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub diagnostics: Vec<IssueKind>,
}

impl Pipeline {
    /// Build every configured stage, failing before any text is touched if one
    /// of them is invalid.
    pub fn new(configs: &[StageConfig]) -> Result<Self, PipelineError> {
        let stages = configs
            .iter()
            .map(StageConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        let pipeline = Self { stages };
        debug!(stages = ?pipeline.stage_names(), "Pipeline assembled");
        Ok(pipeline)
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Self::new(&config.stages)
    }

    /// Assemble a pipeline from already-built stages, including custom ones.
    #[must_use]
    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Append a stage to the end of the sequence.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        self.stages
            .iter()
            .fold(text.to_string(), |acc, stage| stage.apply(&acc))
    }

    #[must_use]
    pub fn normalize_with_diagnostics(&self, text: &str) -> Normalized {
        let mut diagnostics = Vec::new();
        let text = self.stages.iter().fold(text.to_string(), |acc, stage| {
            stage.apply_with_diagnostics(&acc, &mut diagnostics)
        });
        Normalized { text, diagnostics }
    }

    /// Normalize many texts, in parallel when the workload is large enough.
    /// Output order matches input order.
    pub fn normalize_batch<T: AsRef<str> + Sync>(&self, texts: &[T]) -> Vec<String> {
        if should_use_parallel(texts.iter().map(|t| t.as_ref().len()), texts.len()) {
            debug!(num_texts = texts.len(), "Using parallel normalization");
            texts.par_iter().map(|t| self.normalize(t.as_ref())).collect()
        } else {
            debug!(num_texts = texts.len(), "Using sequential normalization");
            texts.iter().map(|t| self.normalize(t.as_ref())).collect()
        }
    }
}

/// Build a pipeline from `stages` and apply it to `text`.
///
/// Prefer building a [`Pipeline`] once when cleaning more than one text.
pub fn normalize(text: &str, stages: &[StageConfig]) -> Result<String, PipelineError> {
    Ok(Pipeline::new(stages)?.normalize(text))
}

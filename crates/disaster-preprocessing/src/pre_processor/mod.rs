//! Tweet text normalization.
//!
//! Lookup tables feed the stages, stages are composed into a [`Pipeline`], and
//! a [`BatchRunner`] applies a pipeline to whole data sets.

mod batch;
mod config;
mod pipeline;
pub mod stages;
pub mod tables;

pub use batch::{BatchReport, BatchRunner, BatchSummary, CleanedRecord, DeadLetter, RawRecord};
pub use config::{AnomalyPolicy, InputPolicy, PipelineConfig, StageConfig};
pub use pipeline::{Normalized, Pipeline, normalize};
pub use stages::{DEFAULT_URL_PATTERN, Stage};

//! # disaster-preprocessing
//!
//! Cleans raw tweet text before it is handed to a vectorizer and classifier.
//!
//! ```rust
//! use disaster_preprocessing::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::from_config(&PipelineConfig::default())?;
//! let cleaned = pipeline.normalize("Evacuate NOWWWW!! @fema #wildfire :(");
//! assert_eq!(cleaned, "Evacuate NOWW user wildfire sad");
//! # Ok::<(), disaster_preprocessing::PipelineError>(())
//! ```
//!
//! Stages can also be chosen one by one:
//!
//! ```rust
//! use disaster_preprocessing::{StageConfig, normalize};
//!
//! let stages = [
//!     StageConfig::HandleRemoval { replace_with_token: true, preserve_word_boundary: false },
//!     StageConfig::HashtagStrip,
//! ];
//! assert_eq!(normalize("hello @abc_1 #world", &stages)?, "hello user world");
//! # Ok::<(), disaster_preprocessing::PipelineError>(())
//! ```

pub mod error;
pub mod pre_processor;

pub use error::{IssueKind, PipelineError, RecordIssue};
pub use pre_processor::{
    AnomalyPolicy, BatchReport, BatchRunner, BatchSummary, CleanedRecord, DEFAULT_URL_PATTERN,
    DeadLetter, InputPolicy, Normalized, Pipeline, PipelineConfig, RawRecord, Stage, StageConfig,
    normalize,
};

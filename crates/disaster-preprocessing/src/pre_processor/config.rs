//! Serializable pipeline configuration.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "stages": [
//!     { "kind": "url_removal", "pattern": "https?://\\S+|www\\.\\S+" },
//!     { "kind": "handle_removal", "replace_with_token": true },
//!     { "kind": "punctuation_removal" }
//!   ],
//!   "input_policy": "coerce_to_empty",
//!   "anomaly_policy": "dead_letter"
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::stages::{
    ContractionExpansion, DEFAULT_URL_PATTERN, DEFAULT_WORD_SEPARATOR, EmoticonDecoding, HandleRemoval, HashtagStrip,
    HtmlDecoding, PunctuationRemoval, RepeatCollapse, Stage, UrlRemoval,
};
use super::tables::LookupTable;
use crate::error::PipelineError;

/// One stage selection and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageConfig {
    UrlRemoval {
        pattern: String,
    },
    RepeatCollapse,
    HandleRemoval {
        replace_with_token: bool,
        #[serde(default)]
        preserve_word_boundary: bool,
    },
    HashtagStrip,
    HtmlDecode,
    ContractionExpand {
        /// Entries added to (or replacing) the built-in English table.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        overrides: BTreeMap<String, String>,
    },
    PunctuationRemoval,
    EmoticonDecode {
        /// Joins the words of a decoded emoji name.
        #[serde(default = "default_word_separator")]
        word_separator: String,
    },
}

fn default_word_separator() -> String {
    DEFAULT_WORD_SEPARATOR.to_string()
}

impl StageConfig {
    /// Every `kind` accepted in configuration.
    pub const KINDS: &'static [&'static str] = &[
        UrlRemoval::NAME,
        RepeatCollapse::NAME,
        HandleRemoval::NAME,
        HashtagStrip::NAME,
        HtmlDecoding::NAME,
        ContractionExpansion::NAME,
        PunctuationRemoval::NAME,
        EmoticonDecoding::NAME,
    ];

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UrlRemoval { .. } => UrlRemoval::NAME,
            Self::RepeatCollapse => RepeatCollapse::NAME,
            Self::HandleRemoval { .. } => HandleRemoval::NAME,
            Self::HashtagStrip => HashtagStrip::NAME,
            Self::HtmlDecode => HtmlDecoding::NAME,
            Self::ContractionExpand { .. } => ContractionExpansion::NAME,
            Self::PunctuationRemoval => PunctuationRemoval::NAME,
            Self::EmoticonDecode { .. } => EmoticonDecoding::NAME,
        }
    }

    /// URL removal with [`DEFAULT_URL_PATTERN`].
    #[must_use]
    pub fn default_url_removal() -> Self {
        Self::UrlRemoval {
            pattern: DEFAULT_URL_PATTERN.to_string(),
        }
    }

    /// Parse one stage from a JSON value, naming the offending stage on error.
    pub fn from_value(value: serde_json::Value, position: usize) -> Result<Self, PipelineError> {
        let kind = match value.get("kind") {
            Some(serde_json::Value::String(kind)) => kind.clone(),
            Some(_) => {
                return Err(PipelineError::invalid_stage(
                    format!("stages[{position}]"),
                    "`kind` must be a string",
                ));
            }
            None => {
                return Err(PipelineError::invalid_stage(
                    format!("stages[{position}]"),
                    "missing `kind`",
                ));
            }
        };
        if !Self::KINDS.contains(&kind.as_str()) {
            return Err(PipelineError::invalid_stage(
                kind,
                format!("unknown stage kind, expected one of: {}", Self::KINDS.join(", ")),
            ));
        }
        serde_json::from_value(value).map_err(|e| PipelineError::invalid_stage(kind, e.to_string()))
    }

    /// Construct the stage, compiling patterns and tables.
    pub fn build(&self) -> Result<Box<dyn Stage>, PipelineError> {
        let stage: Box<dyn Stage> = match self {
            Self::UrlRemoval { pattern } => Box::new(UrlRemoval::new(pattern)?),
            Self::RepeatCollapse => Box::new(RepeatCollapse),
            Self::HandleRemoval {
                replace_with_token,
                preserve_word_boundary,
            } => Box::new(
                HandleRemoval::new(*replace_with_token)
                    .preserving_word_boundary(*preserve_word_boundary),
            ),
            Self::HashtagStrip => Box::new(HashtagStrip),
            Self::HtmlDecode => Box::new(HtmlDecoding),
            Self::ContractionExpand { overrides } => {
                let table = LookupTable::english_contractions()
                    .with_overrides(overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                Box::new(ContractionExpansion::new(table)?)
            }
            Self::PunctuationRemoval => Box::new(PunctuationRemoval),
            Self::EmoticonDecode { word_separator } => {
                Box::new(EmoticonDecoding::default().with_word_separator(word_separator.as_str()))
            }
        };
        Ok(stage)
    }
}

/// What to do with a record whose text is absent or empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputPolicy {
    /// Route the record to the dead-letter list.
    Reject,
    /// Clean it as the empty string.
    #[default]
    CoerceToEmpty,
}

/// What to do with a record that has an encoding anomaly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyPolicy {
    /// Emit the record's text unmodified (invalid bytes decoded lossily).
    #[default]
    PassThrough,
    /// Withhold the record and list it as a dead letter.
    DeadLetter,
}

/// Ordered stage list plus the per-record policies of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub input_policy: InputPolicy,
    #[serde(default)]
    pub anomaly_policy: AnomalyPolicy,
}

#[derive(Deserialize)]
struct RawPipelineConfig {
    stages: Vec<serde_json::Value>,
    #[serde(default)]
    input_policy: InputPolicy,
    #[serde(default)]
    anomaly_policy: AnomalyPolicy,
}

impl PipelineConfig {
    /// Parse a JSON configuration. Every stage is checked, but patterns are
    /// compiled only when the pipeline is built.
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let raw: RawPipelineConfig = serde_json::from_str(json)
            .map_err(|e| PipelineError::invalid_stage("pipeline", e.to_string()))?;
        let stages = raw
            .stages
            .into_iter()
            .enumerate()
            .map(|(position, value)| StageConfig::from_value(value, position))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            stages,
            input_policy: raw.input_policy,
            anomaly_policy: raw.anomaly_policy,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for PipelineConfig {
    /// The full cleaning sequence. Emoticons are decoded before punctuation
    /// removal, which would otherwise destroy them, and emoji names keep their
    /// words apart since punctuation removal would delete `_`.
    fn default() -> Self {
        Self {
            stages: vec![
                StageConfig::default_url_removal(),
                StageConfig::RepeatCollapse,
                StageConfig::HandleRemoval {
                    replace_with_token: true,
                    preserve_word_boundary: false,
                },
                StageConfig::HashtagStrip,
                StageConfig::HtmlDecode,
                StageConfig::ContractionExpand {
                    overrides: BTreeMap::new(),
                },
                StageConfig::EmoticonDecode {
                    word_separator: " ".to_string(),
                },
                StageConfig::PunctuationRemoval,
            ],
            input_policy: InputPolicy::default(),
            anomaly_policy: AnomalyPolicy::default(),
        }
    }
}

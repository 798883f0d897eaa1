use thiserror::Error;

/// Fatal errors raised while assembling a pipeline.
///
/// A pipeline that fails to build never sees a record, so a bad configuration
/// cannot half-clean a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Unknown stage kind, missing required parameter, or a parameter that
    /// does not validate (e.g. a URL pattern that is not a valid regex).
    #[error("invalid stage config `{stage}`: {reason}")]
    InvalidStageConfig { stage: String, reason: String },
}

impl PipelineError {
    pub(crate) fn invalid_stage(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStageConfig {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Non-fatal problems observed while cleaning a single record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueKind {
    /// Markup that could not be parsed; the fragment was kept as literal text.
    #[error("malformed markup kept as text: {fragment:?}")]
    MalformedMarkup { fragment: String },
    /// Bytes that are not UTF-8, or code points with no place in tweet text.
    #[error("encoding anomaly: {reason}")]
    EncodingAnomaly { reason: String },
    /// The record had no text, or only an empty field.
    #[error("missing text")]
    MissingText,
}

impl IssueKind {
    #[must_use]
    pub fn is_encoding_anomaly(&self) -> bool {
        matches!(self, Self::EncodingAnomaly { .. })
    }

    #[must_use]
    pub fn is_malformed_markup(&self) -> bool {
        matches!(self, Self::MalformedMarkup { .. })
    }
}

/// An [`IssueKind`] tied to the record that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record `{id}`: {kind}")]
pub struct RecordIssue {
    pub id: String,
    pub kind: IssueKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_stage_display() {
        let err = PipelineError::invalid_stage("sentiment", "unknown stage kind");
        assert_eq!(
            err.to_string(),
            "invalid stage config `sentiment`: unknown stage kind"
        );
    }

    #[test]
    fn test_record_issue_display() {
        let issue = RecordIssue {
            id: "42".to_string(),
            kind: IssueKind::EncodingAnomaly {
                reason: "code point U+0089 at char 3".to_string(),
            },
        };
        assert_eq!(
            issue.to_string(),
            "record `42`: encoding anomaly: code point U+0089 at char 3"
        );
        assert!(issue.kind.is_encoding_anomaly());
        assert!(!issue.kind.is_malformed_markup());
    }
}

use std::borrow::Cow;

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::config::{AnomalyPolicy, InputPolicy, PipelineConfig};
use super::pipeline::Pipeline;
use crate::error::{IssueKind, RecordIssue};

/// Minimum number of records to consider parallelization
const MIN_RECORDS_FOR_PARALLEL: usize = 100;

/// Minimum total byte count to consider parallelization
const MIN_BYTES_FOR_PARALLEL: usize = 10_000;

/// Records sampled to estimate the workload of a larger batch
const WORKLOAD_SAMPLE: usize = 20;

/// Determine if parallel processing should be used based on workload characteristics.
///
/// Parallelization pays off when there are many records (>= 100) or the total
/// text is large (>= 10,000 bytes). Past 20 records the total is estimated
/// from the first 20.
pub(crate) fn should_use_parallel(lengths: impl Iterator<Item = usize>, num_records: usize) -> bool {
    if num_records >= MIN_RECORDS_FOR_PARALLEL {
        return true;
    }

    let total_bytes = if num_records > WORKLOAD_SAMPLE {
        let sample_bytes: usize = lengths.take(WORKLOAD_SAMPLE).sum();
        (sample_bytes * num_records) / WORKLOAD_SAMPLE
    } else {
        lengths.sum()
    };

    total_bytes >= MIN_BYTES_FOR_PARALLEL
}

fn progress_bar_setup(len: usize, message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    pb
}

/// One input record: an identifier and raw, possibly missing, text bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub id: String,
    pub text: Option<Vec<u8>>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, text: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            text: Some(text.into()),
        }
    }

    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
        }
    }

    fn len(&self) -> usize {
        self.text.as_ref().map_or(0, Vec::len)
    }
}

/// A record that made it through the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedRecord {
    /// Position of the record in the input.
    pub index: usize,
    pub id: String,
    pub text: String,
    /// `true` when the text was emitted unmodified because of an anomaly.
    pub passed_through: bool,
}

/// A record withheld from the output, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub index: usize,
    pub id: String,
    pub reason: IssueKind,
}

/// Record counts reported at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub cleaned: usize,
    pub passed_through: usize,
    pub dead_lettered: usize,
    pub encoding_anomalies: usize,
    pub malformed_markup: usize,
    pub missing_text: usize,
}

impl BatchSummary {
    /// Records that raised an encoding anomaly or a markup warning.
    #[must_use]
    pub fn flagged(&self) -> usize {
        self.encoding_anomalies + self.malformed_markup
    }
}

/// Everything a batch run produced, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub cleaned: Vec<CleanedRecord>,
    pub dead_letters: Vec<DeadLetter>,
    pub issues: Vec<RecordIssue>,
    pub summary: BatchSummary,
}

enum Outcome {
    Cleaned(CleanedRecord),
    DeadLetter(DeadLetter),
}

struct RecordResult {
    id: String,
    outcome: Outcome,
    issues: Vec<IssueKind>,
}

/// First code point with no place in tweet text: C1 controls (mojibake such
/// as `\x89`) and the replacement character.
fn find_unrepresentable(text: &str) -> Option<String> {
    text.chars()
        .enumerate()
        .find(|(_, c)| matches!(c, '\u{80}'..='\u{9F}' | '\u{FFFD}'))
        .map(|(idx, c)| format!("unrepresentable code point U+{:04X} at char {idx}", c as u32))
}

/// Decode raw bytes, reporting why they are anomalous if they are.
fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, Option<String>) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (Cow::Borrowed(text), find_unrepresentable(text)),
        Err(e) => (
            String::from_utf8_lossy(bytes),
            Some(format!("invalid UTF-8 at byte {}", e.valid_up_to())),
        ),
    }
}

/// Applies a [`Pipeline`] to records under explicit missing-text and
/// anomaly policies. Per-record problems never stop the batch.
#[derive(Debug)]
pub struct BatchRunner<'a> {
    pipeline: &'a Pipeline,
    input_policy: InputPolicy,
    anomaly_policy: AnomalyPolicy,
    show_progress: bool,
}

impl<'a> BatchRunner<'a> {
    #[must_use]
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self {
            pipeline,
            input_policy: InputPolicy::default(),
            anomaly_policy: AnomalyPolicy::default(),
            show_progress: false,
        }
    }

    /// Runner using the policies carried by `config`.
    #[must_use]
    pub fn with_config(pipeline: &'a Pipeline, config: &PipelineConfig) -> Self {
        Self::new(pipeline)
            .input_policy(config.input_policy)
            .anomaly_policy(config.anomaly_policy)
    }

    #[must_use]
    pub fn input_policy(mut self, policy: InputPolicy) -> Self {
        self.input_policy = policy;
        self
    }

    #[must_use]
    pub fn anomaly_policy(mut self, policy: AnomalyPolicy) -> Self {
        self.anomaly_policy = policy;
        self
    }

    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn process(&self, index: usize, record: &RawRecord) -> RecordResult {
        let mut issues = Vec::new();
        let id = record.id.clone();

        let bytes = match record.text.as_deref() {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                issues.push(IssueKind::MissingText);
                let outcome = match self.input_policy {
                    InputPolicy::Reject => Outcome::DeadLetter(DeadLetter {
                        index,
                        id: id.clone(),
                        reason: IssueKind::MissingText,
                    }),
                    InputPolicy::CoerceToEmpty => Outcome::Cleaned(CleanedRecord {
                        index,
                        id: id.clone(),
                        text: self.pipeline.normalize(""),
                        passed_through: false,
                    }),
                };
                return RecordResult { id, outcome, issues };
            }
        };

        let (text, anomaly) = decode_text(bytes);
        if let Some(reason) = anomaly {
            let kind = IssueKind::EncodingAnomaly { reason };
            issues.push(kind.clone());
            let outcome = match self.anomaly_policy {
                AnomalyPolicy::PassThrough => Outcome::Cleaned(CleanedRecord {
                    index,
                    id: id.clone(),
                    text: text.into_owned(),
                    passed_through: true,
                }),
                AnomalyPolicy::DeadLetter => Outcome::DeadLetter(DeadLetter {
                    index,
                    id: id.clone(),
                    reason: kind,
                }),
            };
            return RecordResult { id, outcome, issues };
        }

        let normalized = self.pipeline.normalize_with_diagnostics(&text);
        issues.extend(normalized.diagnostics);
        RecordResult {
            outcome: Outcome::Cleaned(CleanedRecord {
                index,
                id: id.clone(),
                text: normalized.text,
                passed_through: false,
            }),
            id,
            issues,
        }
    }

    fn process_all(&self, records: &[RawRecord]) -> Vec<RecordResult> {
        let parallel = should_use_parallel(records.iter().map(RawRecord::len), records.len());
        let pb = if self.show_progress {
            progress_bar_setup(records.len(), "Cleaning records")
        } else {
            ProgressBar::hidden()
        };

        let results = if parallel {
            debug!(num_records = records.len(), "Using parallel batch cleaning");
            records
                .par_iter()
                .enumerate()
                .progress_with(pb.clone())
                .map(|(index, record)| self.process(index, record))
                .collect()
        } else {
            debug!(num_records = records.len(), "Using sequential batch cleaning");
            records
                .iter()
                .enumerate()
                .progress_with(pb.clone())
                .map(|(index, record)| self.process(index, record))
                .collect()
        };
        pb.finish_with_message("Cleaning complete");
        results
    }

    /// Clean every record, collecting output, dead letters and issues.
    pub fn run(&self, records: &[RawRecord]) -> BatchReport {
        let mut report = BatchReport::default();

        for result in self.process_all(records) {
            report.summary.processed += 1;
            // Counts are per record; a record with several markup problems counts once.
            let has = |check: fn(&IssueKind) -> bool| usize::from(result.issues.iter().any(check));
            report.summary.encoding_anomalies += has(IssueKind::is_encoding_anomaly);
            report.summary.malformed_markup += has(IssueKind::is_malformed_markup);
            report.summary.missing_text += has(|kind| matches!(kind, IssueKind::MissingText));
            for kind in &result.issues {
                warn!(id = %result.id, issue = %kind, "Record flagged");
            }
            report
                .issues
                .extend(result.issues.into_iter().map(|kind| RecordIssue {
                    id: result.id.clone(),
                    kind,
                }));

            match result.outcome {
                Outcome::Cleaned(record) => {
                    if record.passed_through {
                        report.summary.passed_through += 1;
                    } else {
                        report.summary.cleaned += 1;
                    }
                    report.cleaned.push(record);
                }
                Outcome::DeadLetter(letter) => {
                    report.summary.dead_lettered += 1;
                    report.dead_letters.push(letter);
                }
            }
        }

        info!(
            processed = report.summary.processed,
            cleaned = report.summary.cleaned,
            passed_through = report.summary.passed_through,
            dead_lettered = report.summary.dead_lettered,
            encoding_anomalies = report.summary.encoding_anomalies,
            malformed_markup = report.summary.malformed_markup,
            missing_text = report.summary.missing_text,
            "Batch complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pre_processor::config::StageConfig;

    fn pipeline() -> Pipeline {
        Pipeline::from_config(&PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_clean_records_in_order() {
        let pipeline = pipeline();
        let records = vec![
            RawRecord::new("1", "Forest fire near La Ronge Sask. Canada"),
            RawRecord::new("2", "@bbc #flood warning!!!! http://t.co/x"),
        ];
        let report = BatchRunner::new(&pipeline).run(&records);

        assert_eq!(report.cleaned.len(), 2);
        assert_eq!(report.cleaned[0].id, "1");
        assert_eq!(report.cleaned[0].text, "Forest fire near La Ronge Sask Canada");
        assert_eq!(report.cleaned[1].text, "user flood warning");
        assert!(report.issues.is_empty());
        assert_eq!(report.summary.cleaned, 2);
        assert_eq!(report.summary.flagged(), 0);
    }

    #[test]
    fn test_invalid_utf8_passed_through() {
        let pipeline = pipeline();
        let records = vec![RawRecord::new("7", b"bad \xFF byte!!".to_vec())];
        let report = BatchRunner::new(&pipeline)
            .anomaly_policy(AnomalyPolicy::PassThrough)
            .run(&records);

        assert_eq!(report.cleaned.len(), 1);
        assert!(report.cleaned[0].passed_through);
        assert_eq!(report.cleaned[0].text, "bad \u{FFFD} byte!!");
        assert_eq!(report.summary.encoding_anomalies, 1);
        assert_eq!(report.summary.passed_through, 1);
        assert_eq!(
            report.issues[0],
            RecordIssue {
                id: "7".to_string(),
                kind: IssueKind::EncodingAnomaly {
                    reason: "invalid UTF-8 at byte 4".to_string()
                },
            }
        );
    }

    #[test]
    fn test_c1_control_dead_lettered() {
        let pipeline = pipeline();
        let records = vec![
            RawRecord::new("1", "fine"),
            RawRecord::new("2", "quake \u{89}ÛÒ news"),
        ];
        let report = BatchRunner::new(&pipeline)
            .anomaly_policy(AnomalyPolicy::DeadLetter)
            .run(&records);

        assert_eq!(report.cleaned.len(), 1);
        assert_eq!(report.dead_letters.len(), 1);
        assert_eq!(report.dead_letters[0].id, "2");
        assert_eq!(
            report.dead_letters[0].reason,
            IssueKind::EncodingAnomaly {
                reason: "unrepresentable code point U+0089 at char 6".to_string()
            }
        );
        assert_eq!(report.summary.dead_lettered, 1);
    }

    #[test]
    fn test_missing_text_policies() {
        let pipeline = pipeline();
        let records = vec![RawRecord::missing("a"), RawRecord::new("b", "")];

        let coerced = BatchRunner::new(&pipeline)
            .input_policy(InputPolicy::CoerceToEmpty)
            .run(&records);
        assert_eq!(coerced.cleaned.len(), 2);
        assert!(coerced.cleaned.iter().all(|r| r.text.is_empty()));
        assert_eq!(coerced.summary.missing_text, 2);

        let rejected = BatchRunner::new(&pipeline)
            .input_policy(InputPolicy::Reject)
            .run(&records);
        assert!(rejected.cleaned.is_empty());
        assert_eq!(rejected.dead_letters.len(), 2);
        assert_eq!(rejected.dead_letters[1].reason, IssueKind::MissingText);
    }

    #[test]
    fn test_malformed_markup_counted_not_fatal() {
        let pipeline = Pipeline::new(&[StageConfig::HtmlDecode]).unwrap();
        let records = vec![
            RawRecord::new("1", "<b broken"),
            RawRecord::new("2", "<i>fine</i>"),
        ];
        let report = BatchRunner::new(&pipeline).run(&records);

        assert_eq!(report.cleaned.len(), 2);
        assert_eq!(report.cleaned[0].text, "<b broken");
        assert_eq!(report.cleaned[1].text, "fine");
        assert_eq!(report.summary.malformed_markup, 1);
        assert_eq!(report.summary.flagged(), 1);
        assert_eq!(report.issues[0].id, "1");
    }

    #[test]
    fn test_summary_counts_records_not_issues() {
        let pipeline = Pipeline::new(&[StageConfig::HtmlDecode]).unwrap();
        let records = vec![
            RawRecord::new("1", "<script>x <b broken"),
            RawRecord::new("2", "<i unterminated"),
            RawRecord::new("3", "clean"),
        ];
        let report = BatchRunner::new(&pipeline).run(&records);

        assert_eq!(report.issues.len(), 3);
        assert_eq!(report.summary.malformed_markup, 2);
        assert_eq!(report.summary.flagged(), 2);
    }

    #[test]
    fn test_policies_from_config() {
        let pipeline = pipeline();
        let config = PipelineConfig {
            input_policy: InputPolicy::Reject,
            anomaly_policy: AnomalyPolicy::DeadLetter,
            ..PipelineConfig::default()
        };
        let report = BatchRunner::with_config(&pipeline, &config).run(&[RawRecord::missing("x")]);
        assert_eq!(report.summary.dead_lettered, 1);
    }

    #[test]
    fn test_large_batch_matches_sequential() {
        let pipeline = pipeline();
        let records = (0..300)
            .map(|i| RawRecord::new(i.to_string(), format!("#fire {i} sooooo bad :( @user{i}")))
            .collect::<Vec<_>>();
        let report = BatchRunner::new(&pipeline).run(&records);

        assert_eq!(report.cleaned.len(), 300);
        for (i, record) in report.cleaned.iter().enumerate() {
            assert_eq!(record.id, i.to_string());
            assert_eq!(record.text, format!("fire {i} soo bad sad user"));
        }
    }

    #[test]
    fn test_should_use_parallel() {
        assert!(should_use_parallel(std::iter::repeat(1).take(100), 100));
        assert!(!should_use_parallel([10, 20].into_iter(), 2));
        assert!(should_use_parallel([6_000, 6_000].into_iter(), 2));
        assert!(should_use_parallel(std::iter::repeat(500).take(30), 30));
    }
}

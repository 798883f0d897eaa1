mod dataset;

use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dataset::Dataset;
use disaster_preprocessing::{
    AnomalyPolicy, BatchReport, BatchRunner, CleanedRecord, DeadLetter, InputPolicy, Pipeline,
    PipelineConfig, RawRecord,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "disaster-clean")]
#[command(about = "Normalize tweet text for disaster classification", long_about = None)]
struct Cli {
    /// Text to clean (if not provided, reads from stdin)
    #[arg(value_name = "TEXT")]
    text: Option<String>,

    /// Read text from file
    #[arg(short, long, value_name = "PATH", conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Batch process texts (one per line)
    #[arg(short, long, value_name = "PATH", conflicts_with_all = ["text", "file"])]
    batch: Option<PathBuf>,

    /// Clean the text column of a CSV file, keeping every other column
    #[arg(long, value_name = "PATH", conflicts_with_all = ["text", "file", "batch"])]
    csv: Option<PathBuf>,

    /// Name of the CSV column holding the text
    #[arg(long, default_value = "text")]
    text_column: String,

    /// Name of the CSV column holding record ids
    #[arg(long, default_value = "id")]
    id_column: String,

    /// Write output here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Write dead-lettered records as an `id,reason` CSV
    #[arg(long, value_name = "PATH")]
    dead_letter: Option<PathBuf>,

    /// Pipeline configuration as JSON (defaults to the full cleaning sequence)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective pipeline configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Output format for text and batch input [default: text]. CSV input is
    /// always written back as CSV
    #[arg(long, value_enum, conflicts_with = "csv")]
    format: Option<OutputFormat>,

    /// Override the configured handling of encoding anomalies
    #[arg(long, value_enum)]
    on_anomaly: Option<AnomalyArg>,

    /// Override the configured handling of missing text
    #[arg(long, value_enum)]
    missing_text: Option<MissingTextArg>,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode (debug logging and timings)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    /// Cleaned text, one line per input record (empty for dead letters)
    Text,
    /// One JSON object per record with id, text and issues
    Json,
}

#[derive(ValueEnum, Clone, Copy)]
enum AnomalyArg {
    PassThrough,
    DeadLetter,
}

impl From<AnomalyArg> for AnomalyPolicy {
    fn from(arg: AnomalyArg) -> Self {
        match arg {
            AnomalyArg::PassThrough => Self::PassThrough,
            AnomalyArg::DeadLetter => Self::DeadLetter,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum MissingTextArg {
    Reject,
    CoerceEmpty,
}

impl From<MissingTextArg> for InputPolicy {
    fn from(arg: MissingTextArg) -> Self {
        match arg {
            MissingTextArg::Reject => Self::Reject,
            MissingTextArg::CoerceEmpty => Self::CoerceToEmpty,
        }
    }
}

#[derive(Clone, Copy)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

enum InputSource {
    Single(Vec<u8>),
    Batch(Vec<RawRecord>),
    Csv(Dataset),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbosity = match (cli.quiet, cli.verbose) {
        (true, _) => Verbosity::Quiet,
        (_, true) => Verbosity::Verbose,
        _ => Verbosity::Normal,
    };
    init_logging(verbosity);

    let config = load_config(&cli)?;
    if cli.dump_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    let pipeline = Pipeline::from_config(&config).context("Failed to assemble pipeline")?;
    let input_source = determine_input_source(&cli)?;

    let start = matches!(verbosity, Verbosity::Verbose).then(Instant::now);
    let records = match &input_source {
        InputSource::Single(bytes) => vec![RawRecord::new("1", bytes.clone())],
        InputSource::Batch(records) => records.clone(),
        InputSource::Csv(dataset) => dataset.records(),
    };
    let show_progress =
        !cli.no_progress && !matches!(verbosity, Verbosity::Quiet) && records.len() > 10;
    let report = BatchRunner::with_config(&pipeline, &config)
        .show_progress(show_progress)
        .run(&records);
    if let Some(start_time) = start {
        info!(elapsed = ?start_time.elapsed(), records = records.len(), "Cleaning finished");
    }

    match &input_source {
        InputSource::Csv(dataset) => {
            dataset::with_output(cli.output.as_deref(), |out| {
                dataset.write_cleaned(&report, out)
            })?;
        }
        InputSource::Single(_) | InputSource::Batch(_) => {
            dataset::with_output(cli.output.as_deref(), |out| {
                let format = cli.format.unwrap_or(OutputFormat::Text);
                output_records(&report, &records, format, out)
            })?;
        }
    }

    if let Some(path) = &cli.dead_letter {
        write_dead_letter_file(path, &report)?;
    }

    if !matches!(verbosity, Verbosity::Quiet) && records.len() > 1 {
        print_summary(&report);
    }

    Ok(())
}

fn init_logging(verbosity: Verbosity) {
    let default_level = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the pipeline configuration and apply command-line policy overrides.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            PipelineConfig::from_json_str(&json)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(policy) = cli.on_anomaly {
        config.anomaly_policy = policy.into();
    }
    if let Some(policy) = cli.missing_text {
        config.input_policy = policy.into();
    }
    debug!(stages = config.stages.len(), "Configuration loaded");
    Ok(config)
}

/// Determine input source from CLI args
fn determine_input_source(cli: &Cli) -> Result<InputSource> {
    // Priority: text arg > file > batch > csv > stdin
    if let Some(text) = &cli.text {
        return Ok(InputSource::Single(text.clone().into_bytes()));
    }

    if let Some(path) = &cli.file {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        return Ok(InputSource::Single(bytes));
    }

    if let Some(path) = &cli.batch {
        return Ok(InputSource::Batch(dataset::read_lines(path)?));
    }

    if let Some(path) = &cli.csv {
        let dataset = Dataset::from_path(path, &cli.text_column, &cli.id_column)?;
        debug!(rows = dataset.len(), path = %path.display(), "Loaded CSV rows");
        return Ok(InputSource::Csv(dataset));
    }

    let mut buffer = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(InputSource::Single(buffer))
}

/// One output slot per input record, in input order.
#[derive(Clone, Copy)]
enum Line<'a> {
    Cleaned(&'a CleanedRecord),
    DeadLetter(&'a DeadLetter),
}

fn lines_in_input_order<'a>(report: &'a BatchReport, len: usize) -> Vec<Option<Line<'a>>> {
    let mut lines = vec![None; len];
    for record in &report.cleaned {
        if let Some(slot) = lines.get_mut(record.index) {
            *slot = Some(Line::Cleaned(record));
        }
    }
    for letter in &report.dead_letters {
        if let Some(slot) = lines.get_mut(letter.index) {
            *slot = Some(Line::DeadLetter(letter));
        }
    }
    lines
}

/// Output one line per input record based on format.
///
/// Text output keeps line numbers aligned with the input: a dead-lettered
/// record leaves an empty line, and a passed-through record is written as its
/// original bytes.
fn output_records(
    report: &BatchReport,
    records: &[RawRecord],
    format: OutputFormat,
    mut out: impl Write,
) -> Result<()> {
    for line in lines_in_input_order(report, records.len()).into_iter().flatten() {
        match (format, line) {
            (OutputFormat::Text, Line::Cleaned(record)) => {
                let original = records.get(record.index).and_then(|r| r.text.as_deref());
                match original {
                    Some(bytes) if record.passed_through => out.write_all(bytes)?,
                    _ => out.write_all(record.text.as_bytes())?,
                }
                writeln!(out)?;
            }
            (OutputFormat::Text, Line::DeadLetter(_)) => writeln!(out)?,
            (OutputFormat::Json, Line::Cleaned(record)) => {
                let issues = report
                    .issues
                    .iter()
                    .filter(|issue| issue.id == record.id)
                    .map(|issue| issue.kind.to_string())
                    .collect::<Vec<_>>();
                let json_output = serde_json::json!({
                    "id": record.id,
                    "text": record.text,
                    "passed_through": record.passed_through,
                    "issues": issues,
                });
                writeln!(out, "{}", serde_json::to_string(&json_output)?)?;
            }
            (OutputFormat::Json, Line::DeadLetter(letter)) => {
                let json_output = serde_json::json!({
                    "id": letter.id,
                    "text": null,
                    "dead_letter": letter.reason.to_string(),
                });
                writeln!(out, "{}", serde_json::to_string(&json_output)?)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn write_dead_letter_file(path: &Path, report: &BatchReport) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create dead-letter file: {}", path.display()))?;
    dataset::write_dead_letters(&report.dead_letters, file)
}

fn print_summary(report: &BatchReport) {
    let summary = &report.summary;
    eprintln!(
        "Processed {} records: {} cleaned, {} passed through, {} dead-lettered",
        summary.processed, summary.cleaned, summary.passed_through, summary.dead_lettered
    );
    if summary.flagged() > 0 || summary.missing_text > 0 {
        eprintln!(
            "Flagged: {} encoding anomalies, {} malformed markup, {} missing text",
            summary.encoding_anomalies, summary.malformed_markup, summary.missing_text
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_for(records: &[RawRecord]) -> BatchReport {
        let pipeline = Pipeline::from_config(&PipelineConfig::default()).unwrap();
        BatchRunner::new(&pipeline).run(records)
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_policy_overrides() {
        let cli = Cli::parse_from([
            "disaster-clean",
            "--on-anomaly",
            "dead-letter",
            "--missing-text",
            "reject",
            "hello",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.anomaly_policy, AnomalyPolicy::DeadLetter);
        assert_eq!(config.input_policy, InputPolicy::Reject);
        assert_eq!(config.stages, PipelineConfig::default().stages);
    }

    #[test]
    fn test_config_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{ "stages": [ { "kind": "hashtag_strip" } ] }"#).unwrap();
        let cli = Cli::parse_from(["disaster-clean", "--config", path.to_str().unwrap(), "x"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.stages.len(), 1);
    }

    #[test]
    fn test_bad_config_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{ "stages": [ { "kind": "lemmatize" } ] }"#).unwrap();
        let cli = Cli::parse_from(["disaster-clean", "--config", path.to_str().unwrap(), "x"]);
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("lemmatize"));
    }

    #[test]
    fn test_text_output() {
        let records = [
            RawRecord::new("1", "#flood!!! @bbc"),
            RawRecord::new("2", "so saaaaad :("),
        ];
        let report = report_for(&records);
        let mut out = Vec::new();
        output_records(&report, &records, OutputFormat::Text, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "flood user\nso saad sad\n");
    }

    #[test]
    fn test_json_output_includes_issues() {
        let records = [RawRecord::new("9", b"bad \xFF".to_vec())];
        let report = report_for(&records);
        let mut out = Vec::new();
        output_records(&report, &records, OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["id"], "9");
        assert_eq!(value["passed_through"], true);
        assert_eq!(value["issues"][0], "encoding anomaly: invalid UTF-8 at byte 4");
    }

    #[test]
    fn test_text_output_stays_line_aligned() {
        let records = [
            RawRecord::new("1", "#one"),
            RawRecord::new("2", b"bad \xFF!!".to_vec()),
            RawRecord::missing("3"),
            RawRecord::new("4", "four!!"),
        ];
        let pipeline = Pipeline::from_config(&PipelineConfig::default()).unwrap();
        let report = BatchRunner::new(&pipeline)
            .input_policy(InputPolicy::Reject)
            .anomaly_policy(AnomalyPolicy::PassThrough)
            .run(&records);

        let mut out = Vec::new();
        output_records(&report, &records, OutputFormat::Text, &mut out).unwrap();
        assert_eq!(out, b"one\nbad \xFF!!\n\nfour\n".to_vec());
    }

    #[test]
    fn test_json_output_lists_dead_letters() {
        let records = [RawRecord::missing("x"), RawRecord::new("y", "ok")];
        let pipeline = Pipeline::from_config(&PipelineConfig::default()).unwrap();
        let report = BatchRunner::new(&pipeline)
            .input_policy(InputPolicy::Reject)
            .run(&records);

        let mut out = Vec::new();
        output_records(&report, &records, OutputFormat::Json, &mut out).unwrap();
        let lines = out
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice::<serde_json::Value>(line).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], "x");
        assert_eq!(lines[0]["text"], serde_json::Value::Null);
        assert_eq!(lines[0]["dead_letter"], "missing text");
        assert_eq!(lines[1]["text"], "ok");
    }

    #[test]
    fn test_format_rejected_with_csv() {
        let result = Cli::try_parse_from([
            "disaster-clean",
            "--csv",
            "train.csv",
            "--format",
            "json",
        ]);
        assert!(result.is_err());
        assert!(Cli::try_parse_from(["disaster-clean", "--csv", "train.csv"]).is_ok());
    }

    #[test]
    fn test_batch_input_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.txt");
        std::fs::write(&path, "first\nsecond\n").unwrap();
        let cli = Cli::parse_from(["disaster-clean", "--batch", path.to_str().unwrap()]);
        let InputSource::Batch(records) = determine_input_source(&cli).unwrap() else {
            panic!("expected batch input");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "2");
    }
}

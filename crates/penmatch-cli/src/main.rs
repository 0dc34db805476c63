use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use penmatch_contracts::events::EventWriter;
use penmatch_contracts::runs::record_files::write_record_file;
use penmatch_contracts::runs::summary::{write_summary, RunSummary};
use penmatch_contracts::Dataset;
use penmatch_engine::{
    extract_decision, BatchReport, BatchRunner, EngineConfig, ExecutionMode, OpenAiChatModel,
    OutcomeKind, ResizingImageEncoder,
};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const LOG_ENV: &str = "PENMATCH_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "penmatch",
    version,
    about = "Compare handwriting sample pairs with a hosted multimodal model"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate the first and last rows of a dataset.
    Run(RunArgs),
    /// Print the label the decision extractor reads from a reply.
    Decide(DecideArgs),
}

#[derive(Debug, Parser)]
struct RunArgs {
    /// JSON Lines dataset with `sample1`/`sample2` columns.
    #[arg(long)]
    dataset: PathBuf,
    /// Directory holding the sample images.
    #[arg(long)]
    images: PathBuf,
    #[arg(long)]
    out: PathBuf,
    /// Rows taken from each end of the dataset.
    #[arg(long, default_value_t = 5)]
    sample: usize,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    sequential: bool,
}

#[derive(Debug, Parser)]
struct DecideArgs {
    text: Vec<String>,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("penmatch error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_batch(args),
        Command::Decide(args) => {
            println!("{}", extract_decision(&args.text.join(" ")));
            Ok(0)
        }
    }
}

fn run_batch(args: RunArgs) -> Result<i32> {
    let config = resolve_config(&args)?;
    let Some(api_key) = non_empty_env(API_KEY_ENV) else {
        bail!("{API_KEY_ENV} is not set");
    };

    let source = Dataset::load_jsonl(&args.dataset)?;
    let mut selected = source.head_tail(args.sample);
    tracing::info!(
        rows = source.len(),
        selected = selected.len(),
        dataset = %args.dataset.display(),
        "loaded dataset"
    );

    let run_id = format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
    let events = EventWriter::create(args.out.join("events.jsonl"), run_id.clone())?;
    let started_at = now_utc_iso();
    let runner = BatchRunner::new(
        Box::new(OpenAiChatModel::new(&config.api_base, api_key)),
        Box::new(ResizingImageEncoder::new(&args.images, config.max_image_dim)),
        config,
    )
    .with_events(events);
    let report = runner.run(&mut selected)?;

    write_accepted_records(&args.out.join("records"), &report, &selected)?;
    let merged_path = args.out.join("merged.jsonl");
    selected.write_jsonl(&merged_path)?;

    let summary = build_summary(run_id, started_at, &report);
    write_summary(
        &args.out.join("summary.json"),
        &summary,
        Some(&summary_extra(runner.config(), &args)),
    )?;

    println!(
        "{} pairs: {} accepted, {} indeterminate, {} failed",
        report.total(),
        summary.accepted,
        summary.indeterminate,
        summary.failed
    );
    println!("Merged rows written to {}", merged_path.display());
    Ok(0)
}

/// One file per accepted pair. Rows kept only for their explanation are
/// written to the merged dataset but get no record file.
fn write_accepted_records(
    dir: &Path,
    report: &BatchReport,
    dataset: &Dataset,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for index in report.accepted_indices() {
        let Some(record) = dataset.get(index) else {
            bail!("accepted pair {index} is missing from the merged dataset");
        };
        let path = write_record_file(dir, index, record)?;
        tracing::debug!(index, path = %path.display(), "wrote record file");
        written.push(path);
    }
    Ok(written)
}

fn resolve_config(args: &RunArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(model) = args.model.as_deref().map(str::trim) {
        if model.is_empty() {
            bail!("--model must not be empty");
        }
        config.model = model.to_string();
    }
    if args.sequential {
        config.mode = ExecutionMode::Sequential;
    }
    Ok(config)
}

fn build_summary(run_id: String, started_at: String, report: &BatchReport) -> RunSummary {
    RunSummary {
        run_id,
        started_at,
        finished_at: now_utc_iso(),
        total_pairs: report.total() as u64,
        accepted: report.count(OutcomeKind::Accepted) as u64,
        indeterminate: report.count(OutcomeKind::Indeterminate) as u64,
        failed: report.count(OutcomeKind::Failed) as u64,
        accepted_indices: report
            .accepted_indices()
            .into_iter()
            .map(|index| index as u64)
            .collect(),
    }
}

fn summary_extra(config: &EngineConfig, args: &RunArgs) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("model".to_string(), json!(config.model));
    extra.insert("mode".to_string(), json!(config.mode));
    extra.insert("dataset".to_string(), json!(path_text(&args.dataset)));
    extra.insert("images".to_string(), json!(path_text(&args.images)));
    extra.insert("sample".to_string(), json!(args.sample));
    extra
}

fn path_text(path: &Path) -> String {
    path.display().to_string()
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use penmatch_contracts::{Dataset, Decision, PairRecord};
    use penmatch_engine::{BatchReport, EngineConfig, ExecutionMode, OutcomeKind};

    use super::{build_summary, resolve_config, write_accepted_records, RunArgs};

    fn args() -> RunArgs {
        RunArgs {
            dataset: PathBuf::from("pairs.jsonl"),
            images: PathBuf::from("images"),
            out: PathBuf::from("out"),
            sample: 5,
            config: None,
            model: None,
            sequential: false,
        }
    }

    #[test]
    fn flags_override_config_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("penmatch.json");
        std::fs::write(&path, r#"{"model": "gpt-4o-mini", "pacing_ms": 0}"#)?;
        let mut args = args();
        args.config = Some(path);
        args.model = Some("gpt-4.1".to_string());
        args.sequential = true;

        let config = resolve_config(&args)?;
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.mode, ExecutionMode::Sequential);
        assert_eq!(config.pacing_ms, 0);
        Ok(())
    }

    #[test]
    fn defaults_without_flags() -> anyhow::Result<()> {
        assert_eq!(resolve_config(&args())?, EngineConfig::default());
        let mut blank = args();
        blank.model = Some("  ".to_string());
        assert!(resolve_config(&blank).is_err());
        Ok(())
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut report = BatchReport::default();
        report.outcomes.insert(0, OutcomeKind::Accepted);
        report.outcomes.insert(1, OutcomeKind::Indeterminate);
        report.outcomes.insert(9, OutcomeKind::Accepted);
        report.outcomes.insert(4, OutcomeKind::Failed);

        let summary = build_summary("run-1".to_string(), "t0".to_string(), &report);
        assert_eq!(summary.total_pairs, 4);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.indeterminate, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.accepted_indices, vec![0, 9]);
    }

    #[test]
    fn record_files_cover_accepted_pairs_only() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut accepted = PairRecord::new("a.png", "b.png");
        accepted.explanation = Some("Same loops.".to_string());
        accepted.decision = Some(Decision::Yes);
        let mut kept = PairRecord::new("c.png", "d.png");
        kept.explanation = Some("Hard to say.".to_string());
        let dataset = Dataset::from_records(vec![accepted.clone(), kept.clone()]);

        let mut report = BatchReport::default();
        report.results.insert(0, accepted);
        report.results.insert(1, kept);
        report.outcomes.insert(0, OutcomeKind::Accepted);
        report.outcomes.insert(1, OutcomeKind::Indeterminate);

        let dir = temp.path().join("records");
        let written = write_accepted_records(&dir, &report, &dataset)?;
        assert_eq!(written, vec![dir.join("0_a.png_b.png.json")]);
        assert_eq!(std::fs::read_dir(&dir)?.count(), 1);
        Ok(())
    }
}

//! TCTC - Traceability & Test Coverage Tool CLI.
//!
//! Reads requirement and test datasets, validates them, builds the
//! traceability matrix, computes coverage KPIs and writes a report bundle.
//! Advisory suggestions are optional and never block a run.

#![forbid(unsafe_code)]

mod openai;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use openai::OpenAiProvider;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tctc_common::advisory::AdvisoryProvider;
use tctc_common::config::{LoadedConfig, TctcConfig, load_config, validate_config};
use tctc_common::kpi::{CoverageKpi, JsonCoverageSource, compute_coverage_kpis_with};
use tctc_common::loader::{load_requirements, load_tests};
use tctc_common::observe::TracingObserver;
use tctc_common::pipeline::{RunOptions, RunOutcome, run};
use tctc_common::validators::{ValidationReport, raise_if_invalid, validate_datasets};
use tctc_common::{IssueCode, LinkSuggestion, init_logging};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "tctc", author, version)]
#[command(about = "TCTC - Traceability & Test Coverage Tool")]
#[command(
    after_help = "Advisory suggestions run only when ENABLE_AI (or TCTC_AI_ENABLED) is set and \
                  OPENAI_API_KEY is present. They never change the matrix or the KPIs."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./tctc.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the matrix, compute KPIs and write the report bundle
    Run(RunArgs),

    /// Validate the datasets and print the validation report
    Validate {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "pretty")]
        format: OutputFormat,
    },

    /// Compute coverage KPIs from an exported matrix JSON file
    Kpi {
        /// Path to traceability_matrix.json (or any document with req_to_tests)
        #[arg(long)]
        matrix: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Print JSON Schemas of the machine-readable outputs
    Schema,

    /// List validation issue codes with their remediation steps
    Codes,
}

#[derive(Args)]
struct InputArgs {
    /// Requirements CSV
    #[arg(long)]
    requirements: Option<PathBuf>,

    /// Test cases CSV
    #[arg(long)]
    tests: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Curated links CSV (requirement_id,test_id,source,confidence,rationale)
    #[arg(long)]
    links: Option<PathBuf>,

    /// Output directory (default: OUTPUT_DIR or data/outputs)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Fail on empty datasets and on blocking validation issues
    #[arg(long, visible_alias = "strict")]
    fail_on_empty: bool,

    /// Report title
    #[arg(long)]
    title: Option<String>,

    /// Skip the advisory step even when configured
    #[arg(long)]
    no_ai: bool,

    /// Output format of the run summary
    #[arg(long, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Pretty,
    None,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let mut log_config = loaded.config.logging.to_log_config();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = init_logging(&log_config)?;
    report_config(&loaded);

    let mut config = loaded.config;
    match cli.command {
        Commands::Run(args) => cmd_run(&mut config, args),
        Commands::Validate { inputs, format } => {
            apply_inputs(&mut config, inputs);
            cmd_validate(&config, format)
        }
        Commands::Kpi { matrix, format } => cmd_kpi(&matrix, format),
        Commands::Schema => cmd_schema(),
        Commands::Codes => {
            cmd_codes();
            Ok(())
        }
    }
}

fn report_config(loaded: &LoadedConfig) {
    match &loaded.file {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using defaults"),
    }
    if !loaded.env_overrides.is_empty() {
        info!("Environment overrides: {}", loaded.env_overrides.join(", "));
    }
    for err in &loaded.env_errors {
        warn!("{err}");
    }
    for warning in validate_config(&loaded.config) {
        warn!("{warning}");
    }
}

fn apply_inputs(config: &mut TctcConfig, inputs: InputArgs) {
    if let Some(path) = inputs.requirements {
        config.inputs.requirements = path;
    }
    if let Some(path) = inputs.tests {
        config.inputs.tests = path;
    }
}

fn cmd_run(config: &mut TctcConfig, args: RunArgs) -> Result<()> {
    apply_inputs(config, args.inputs);
    if args.links.is_some() {
        config.inputs.links = args.links;
    }
    if let Some(dir) = args.out_dir {
        config.output.out_dir = dir;
    }
    if let Some(title) = args.title {
        config.output.title = title;
    }
    if args.fail_on_empty {
        config.validation.strict = true;
    }
    if args.no_ai {
        config.advisory.enabled = false;
    }

    let ai_enabled = config.advisory.is_enabled();
    info!(
        "AI: {} (enabled={}, key={})",
        if ai_enabled { "enabled" } else { "disabled" },
        config.advisory.enabled,
        if config.advisory.api_key.is_some() { "yes" } else { "no" }
    );

    let provider = if ai_enabled {
        match OpenAiProvider::new(&config.advisory) {
            Ok(provider) => Some(provider),
            Err(err) => {
                warn!("Advisory provider unavailable, continuing without it: {err}");
                None
            }
        }
    } else {
        None
    };

    let options = RunOptions::from_config(config);
    let outcome = run(
        &options,
        provider.as_ref().map(|p| p as &dyn AdvisoryProvider),
        &TracingObserver,
    )
    .context("Traceability run failed")?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Pretty => print_outcome(&outcome),
        OutputFormat::None => {}
    }
    Ok(())
}

fn list_or_none(ids: &[String]) -> String {
    if ids.is_empty() {
        "none".to_string()
    } else {
        ids.join(", ")
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let summary = &outcome.kpi;
    println!(
        "Requirements: {}  Tests: {}",
        outcome.requirements_count, outcome.tests_count
    );
    println!(
        "Coverage: {:.2}% ({}/{} requirements)",
        outcome.coverage_percent, summary.requirements_covered, summary.requirements_total
    );
    println!("Uncovered: {}", list_or_none(&outcome.uncovered_requirements));
    println!("Orphan tests: {}", list_or_none(&outcome.orphan_tests));
    print_validation_line(&outcome.validation);
    if outcome.ai_enabled {
        println!("AI suggestions: {}", outcome.ai_suggestions_count);
        for s in &outcome.suggestions {
            print_suggestion(s);
        }
    }
    println!("Report: {}", outcome.artifacts.report_html.display());
}

fn print_suggestion(s: &LinkSuggestion) {
    let confidence = s
        .confidence
        .map_or_else(|| "-".to_string(), |c| format!("{c:.2}"));
    println!(
        "  {} -> {} (confidence {confidence}) {}",
        s.requirement_id, s.test_id, s.rationale
    );
}

fn print_validation_line(report: &ValidationReport) {
    println!(
        "Validation: {} ({} errors, {} warnings)",
        if report.ok { "OK" } else { "FAILED" },
        report.errors.len(),
        report.warnings.len()
    );
}

fn cmd_validate(config: &TctcConfig, format: OutputFormat) -> Result<()> {
    let observer = TracingObserver;
    let requirements = load_requirements(&config.inputs.requirements, &observer)?;
    let tests = load_tests(&config.inputs.tests, &observer)?;
    let report = validate_datasets(&requirements, &tests);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Pretty => {
            print_validation_line(&report);
            for issue in report.errors.iter().chain(&report.warnings) {
                let context = issue
                    .context
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "  [{}] {}: {} {context}",
                    issue.severity(),
                    issue.code,
                    issue.message
                );
            }
        }
        OutputFormat::None => {}
    }

    raise_if_invalid(&report)?;
    Ok(())
}

fn cmd_kpi(path: &Path, format: OutputFormat) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read matrix file {}", path.display()))?;
    let doc: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Matrix file is not valid JSON: {}", path.display()))?;
    let kpi: CoverageKpi = compute_coverage_kpis_with(&JsonCoverageSource::new(doc), &TracingObserver)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&kpi)?),
        OutputFormat::Pretty => {
            println!(
                "Coverage: {:.2}% ({}/{} requirements)",
                kpi.coverage_percent,
                kpi.covered_requirements.len(),
                kpi.total_requirements
            );
            println!("Tests: {}  Links: {}", kpi.total_tests, kpi.total_links);
            println!("Avg tests per requirement: {:.2}", kpi.avg_tests_per_requirement);
            println!("Uncovered: {}", list_or_none(&kpi.uncovered_requirements));
            println!("Orphan tests: {}", list_or_none(&kpi.orphan_tests));
        }
        OutputFormat::None => {}
    }
    Ok(())
}

fn cmd_schema() -> Result<()> {
    let schemas = json!({
        "run_outcome": schemars::schema_for!(RunOutcome),
        "validation_report": schemars::schema_for!(ValidationReport),
        "coverage_kpi": schemars::schema_for!(CoverageKpi),
        "link_suggestion": schemars::schema_for!(LinkSuggestion),
    });
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}

fn cmd_codes() {
    for code in IssueCode::all() {
        println!("{}\n", code.entry().format_full());
    }
}

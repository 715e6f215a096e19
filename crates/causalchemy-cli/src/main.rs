mod registry;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use causalchemy_core::{Error as CoreError, TieBreak, build_graph_report};
use causalchemy_eval::{EvalError, EvaluateOptions, EvaluationEngine, render_report};
use causalchemy_generate::output::{
    DATASET_CSV, DATASET_JSON, GENERATION_REPORT, write_table_csv, write_table_json,
};
use causalchemy_generate::{FunctionRegistry, GenerationError, compile_plan};
use causalchemy_plan::{
    Plan, PlanError, PlanOptions, ValidationIssue, ValidationReport, load_plan, load_plan_value,
    plan_fingerprint, plan_json_schema, validate_plan,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use registry::{
    RunContext, RunOptions, init_run_logging, init_stderr_logging, start_run, write_json,
};
use settings::{CliSettings, SettingsError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("graph error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("plan is invalid ({0} error(s))")]
    InvalidPlan(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "causalchemy", version, about = "Causal synthetic data CLI")]
struct Cli {
    /// Settings file (defaults to ./causalchemy.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset from a plan into a new run directory.
    Generate(GenerateArgs),
    /// Validate a plan and print its issues.
    Validate(PlanArgs),
    /// Print the graph report (generation order, roots, leaves, cycle).
    Inspect(InspectArgs),
    /// Evaluate an existing run against its plan.
    Eval(EvalArgs),
    /// Print the plan JSON Schema.
    PlanSchema(PlanSchemaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Plan file (.json or .toml).
    #[arg(long)]
    plan: PathBuf,
    /// Override the plan's row count.
    #[arg(long)]
    rows: Option<u64>,
    /// Override the plan's seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Dataset format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Ordering among nodes that become ready together.
    #[arg(long, value_enum)]
    tie_break: Option<TieBreakArg>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// Plan file (.json or .toml).
    #[arg(long)]
    plan: PathBuf,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Plan file (.json or .toml).
    #[arg(long)]
    plan: PathBuf,
    #[arg(long, value_enum)]
    tie_break: Option<TieBreakArg>,
}

#[derive(Args, Debug)]
struct EvalArgs {
    /// Plan file the run was generated from.
    #[arg(long)]
    plan: PathBuf,
    /// Run directory containing data.csv.
    #[arg(long)]
    run: PathBuf,
    /// Output directory for metrics.json and report.md (defaults to the run).
    #[arg(long)]
    out: Option<PathBuf>,
    /// |correlation| above which unrelated nodes are flagged.
    #[arg(long)]
    threshold: Option<f64>,
    /// Fail when any violation is found.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct PlanSchemaArgs {
    /// Write the schema to this path instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TieBreakArg {
    Declaration,
    Lexicographic,
}

impl From<TieBreakArg> for TieBreak {
    fn from(value: TieBreakArg) -> Self {
        match value {
            TieBreakArg::Declaration => TieBreak::Declaration,
            TieBreakArg::Lexicographic => TieBreak::Lexicographic,
        }
    }
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = CliSettings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Generate(args) => run_generate(args, &settings),
        Command::Validate(args) => run_validate(args, &settings),
        Command::Inspect(args) => run_inspect(args, &settings),
        Command::Eval(args) => run_eval(args, &settings),
        Command::PlanSchema(args) => run_plan_schema(args),
    }
}

fn run_generate(args: GenerateArgs, settings: &CliSettings) -> Result<(), CliError> {
    let GenerateArgs {
        plan: plan_path,
        rows,
        seed,
        run_dir,
        format,
        tie_break,
    } = args;

    if rows == Some(0) {
        return Err(CliError::InvalidConfig(
            "--rows must be greater than zero".to_string(),
        ));
    }

    let (mut plan, warnings) = load_validated_plan(&plan_path)?;
    if let Some(rows) = rows {
        plan.rows = rows;
    }
    if let Some(seed) = seed {
        plan.seed = seed;
    }
    let cli_tie_break = tie_break.map(TieBreak::from);
    let plan_tie_break = plan.options.as_ref().and_then(|options| options.tie_break);
    if let Some(resolved) = cli_tie_break.or(plan_tie_break).or(settings.tie_break) {
        plan.options = Some(PlanOptions {
            tie_break: Some(resolved),
        });
    }

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir: run_dir.unwrap_or_else(|| settings.run_dir.clone()),
        plan_path: plan_path.clone(),
        plan_version: plan.plan_version.clone(),
        plan_fingerprint: plan_fingerprint(&plan)?,
        options: RunOptions {
            seed: plan.seed,
            rows: plan.rows,
            tie_break: plan.tie_break(),
            format: format.as_str().to_string(),
            dependence_threshold: settings.dependence_threshold,
        },
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path, &settings.log_filter)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        plan = %plan_path.display(),
        seed = plan.seed,
        rows = plan.rows
    );
    for warning in &warnings {
        tracing::warn!(
            event = "plan_warning",
            code = %warning.code,
            path = %warning.path,
            message = %warning.message
        );
    }

    let timer = Instant::now();

    write_json(&run_paths.plan_path, &plan)?;

    let compiled = compile_plan(&plan, &FunctionRegistry::new())?;
    let mut result = compiled.generate()?;
    result.report.run_id = run_id.clone();

    let dataset_path = match format {
        OutputFormat::Csv => {
            let path = run_paths.root.join(DATASET_CSV);
            let bytes = write_table_csv(&path, &result.table)?;
            tracing::info!(event = "dataset_written", path = %path.display(), bytes);
            path
        }
        OutputFormat::Json => {
            let path = run_paths.root.join(DATASET_JSON);
            write_table_json(&path, &result.table)?;
            tracing::info!(event = "dataset_written", path = %path.display());
            path
        }
    };

    write_json(&run_paths.root.join(GENERATION_REPORT), &result.report)?;

    let evaluator = EvaluationEngine::new(EvaluateOptions {
        dependence_threshold: settings.dependence_threshold,
        ..EvaluateOptions::default()
    });
    let evaluation = evaluator.evaluate(&plan, compiled.model.graph(), &result.table, &run_id);
    write_json(&run_paths.metrics_path, &evaluation.metrics)?;
    let report = render_report(
        &evaluation.metrics,
        &evaluation.violations,
        EvaluateOptions::default().max_examples,
    );
    std::fs::write(&run_paths.report_path, report)?;
    tracing::info!(
        event = "evaluation_written",
        path = %run_paths.metrics_path.display(),
        violations = evaluation.violations.len()
    );

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(
        event = "run_finished",
        status = "success",
        null_cells = result.report.null_cells,
        duration_ms = duration_ms
    );

    println!("{}", dataset_path.display());
    Ok(())
}

fn run_validate(args: PlanArgs, settings: &CliSettings) -> Result<(), CliError> {
    init_stderr_logging(&settings.log_filter)?;

    let plan_json = load_plan_value(&args.plan)?;
    let schema = serde_json::to_value(plan_json_schema())?;
    match validate_plan(&plan_json, &schema) {
        Ok(validated) => {
            print_issues(&validated.warnings);
            println!(
                "plan ok: {} node(s), {} warning(s)",
                validated.plan.nodes.len(),
                validated.warnings.len()
            );
            Ok(())
        }
        Err(report) => fail_with_report(report),
    }
}

fn run_inspect(args: InspectArgs, settings: &CliSettings) -> Result<(), CliError> {
    init_stderr_logging(&settings.log_filter)?;

    let plan = load_plan(&args.plan)?;
    let tie_break = args
        .tie_break
        .map(TieBreak::from)
        .or_else(|| plan.options.as_ref().and_then(|options| options.tie_break))
        .or(settings.tie_break)
        .unwrap_or_default();

    let nodes = plan.graph.to_nodes()?;
    let report = build_graph_report(&nodes, tie_break)?;
    if let Some(cycle) = &report.cycle {
        tracing::warn!(event = "cycle_detected", cycle = %cycle.join(" -> "));
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_eval(args: EvalArgs, settings: &CliSettings) -> Result<(), CliError> {
    init_stderr_logging(&settings.log_filter)?;

    let (plan, _) = load_validated_plan(&args.plan)?;
    let threshold = args.threshold.unwrap_or(settings.dependence_threshold);
    if !(threshold.is_finite() && threshold >= 0.0) {
        return Err(CliError::InvalidConfig(format!(
            "threshold {threshold} must be a non-negative number"
        )));
    }

    let engine = EvaluationEngine::new(EvaluateOptions {
        strict: args.strict,
        dependence_threshold: threshold,
        out_dir: args.out,
        ..EvaluateOptions::default()
    });
    let result = engine.run(&plan, &args.run)?;
    println!("{}", result.report_path.display());
    Ok(())
}

fn run_plan_schema(args: PlanSchemaArgs) -> Result<(), CliError> {
    let schema = serde_json::to_string_pretty(&plan_json_schema())?;
    match args.out {
        Some(path) => std::fs::write(path, schema)?,
        None => println!("{schema}"),
    }
    Ok(())
}

fn load_validated_plan(path: &Path) -> Result<(Plan, Vec<ValidationIssue>), CliError> {
    let plan_json = load_plan_value(path)?;
    let schema = serde_json::to_value(plan_json_schema())?;
    match validate_plan(&plan_json, &schema) {
        Ok(validated) => Ok((validated.plan, validated.warnings)),
        Err(report) => fail_with_report(report),
    }
}

fn fail_with_report<T>(report: ValidationReport) -> Result<T, CliError> {
    print_issues(&report.errors);
    print_issues(&report.warnings);
    Err(CliError::InvalidPlan(report.errors.len()))
}

fn print_issues(issues: &[ValidationIssue]) {
    for issue in issues {
        let level = match issue.severity {
            causalchemy_plan::IssueSeverity::Error => "error",
            causalchemy_plan::IssueSeverity::Warning => "warning",
        };
        eprintln!("{level}[{}] {}: {}", issue.code, issue.path, issue.message);
        if let Some(hint) = &issue.hint {
            eprintln!("  hint: {hint}");
        }
    }
}

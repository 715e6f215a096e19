use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use causalchemy_core::GraphSpec;
use causalchemy_generate::model::GenerationReport;
use causalchemy_generate::output::{DATASET_CSV, GENERATION_REPORT};
use causalchemy_generate::{OutputTable, Value, ValueKind, column_kinds};
use causalchemy_plan::{Plan, plan_fingerprint};
use tracing::info;

use crate::errors::EvalError;
use crate::metrics::{
    METRICS_VERSION, MetricsPlanRef, MetricsReport, PerformanceMetrics, WarningItem,
};
use crate::model::{EvaluateOptions, EvaluationResult, Violation};
use crate::report::render_report;
use crate::stats::column_stats;
use crate::structure::check_structure;

/// In-memory evaluation of a table against its graph.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: MetricsReport,
    pub violations: Vec<Violation>,
}

/// Evaluate generated datasets against their causal graph.
#[derive(Debug, Clone, Default)]
pub struct EvaluationEngine {
    options: EvaluateOptions,
}

impl EvaluationEngine {
    pub fn new(options: EvaluateOptions) -> Self {
        Self { options }
    }

    /// Evaluate a table already in memory. Nothing is written.
    pub fn evaluate(&self, plan: &Plan, graph: &GraphSpec, table: &OutputTable, run_id: &str) -> Evaluation {
        let start = Instant::now();
        let mut warnings = Vec::new();

        let present: Vec<&str> = graph
            .names()
            .filter(|name| table.column(name).is_some())
            .collect();
        let expected_columns: Vec<String> = match &plan.columns {
            Some(columns) => columns.clone(),
            None => graph.names().map(str::to_string).collect(),
        };
        let missing: Vec<&str> = expected_columns
            .iter()
            .map(String::as_str)
            .filter(|name| !present.contains(name))
            .collect();
        if !missing.is_empty() {
            warnings.push(WarningItem {
                code: "missing_columns".to_string(),
                path: "/columns".to_string(),
                message: format!("missing columns: {}", missing.join(", ")),
                hint: Some("regenerate dataset to include all columns".to_string()),
            });
        }
        let extra: Vec<&str> = table
            .column_names()
            .iter()
            .map(String::as_str)
            .filter(|name| !graph.contains(name))
            .collect();
        if !extra.is_empty() {
            warnings.push(WarningItem {
                code: "extra_columns".to_string(),
                path: "/columns".to_string(),
                message: format!("unexpected columns: {}", extra.join(", ")),
                hint: Some("remove extra columns or update the graph".to_string()),
            });
        }
        if table.row_count() as u64 != plan.rows {
            warnings.push(WarningItem {
                code: "row_count_mismatch".to_string(),
                path: "/rows".to_string(),
                message: format!(
                    "found {} row(s), plan requests {}",
                    table.row_count(),
                    plan.rows
                ),
                hint: None,
            });
        }

        let column_stats = table
            .columns()
            .map(|(name, column)| column_stats(name, column))
            .collect();

        let structure = check_structure(graph, table, self.options.dependence_threshold);
        let mut violations = structure.violations;
        violations.sort_by(|a, b| (&a.code, &a.path).cmp(&(&b.code, &b.path)));

        let metrics = MetricsReport {
            metrics_version: METRICS_VERSION.to_string(),
            run_id: run_id.to_string(),
            plan_ref: MetricsPlanRef {
                plan_version: plan.plan_version.clone(),
                seed: plan.seed,
                plan_hash: plan_fingerprint(plan).ok(),
            },
            rows_found: table.row_count() as u64,
            rows_expected: Some(plan.rows),
            column_stats,
            edges: structure.edges,
            unrelated_pairs: structure.unrelated_pairs,
            threshold: self.options.dependence_threshold,
            warnings,
            performance: PerformanceMetrics {
                load_ms: 0,
                evaluate_ms: start.elapsed().as_millis(),
                total_ms: start.elapsed().as_millis(),
            },
        };

        Evaluation {
            metrics,
            violations,
        }
    }

    /// Load `data.csv` from a run directory, evaluate it and write
    /// `metrics.json` and `report.md`.
    pub fn run(&self, plan: &Plan, dataset_dir: &Path) -> Result<EvaluationResult, EvalError> {
        let total_start = Instant::now();
        let load_start = Instant::now();

        let graph = plan.graph.to_graph_spec()?;
        let run_id = detect_run_id(dataset_dir).unwrap_or_else(|| "unknown".to_string());
        let table = load_table_csv(&dataset_dir.join(DATASET_CSV), &column_kinds(plan))?;
        let load_ms = load_start.elapsed().as_millis();

        let Evaluation {
            mut metrics,
            violations,
        } = self.evaluate(plan, &graph, &table, &run_id);
        metrics.performance.load_ms = load_ms;
        metrics.performance.total_ms = total_start.elapsed().as_millis();

        let report = render_report(&metrics, &violations, self.options.max_examples);
        let out_dir = self
            .options
            .out_dir
            .clone()
            .unwrap_or_else(|| dataset_dir.to_path_buf());
        std::fs::create_dir_all(&out_dir)?;

        let metrics_path = out_dir.join("metrics.json");
        std::fs::write(&metrics_path, serde_json::to_vec_pretty(&metrics)?)?;

        let report_path = out_dir.join("report.md");
        std::fs::write(&report_path, report.as_bytes())?;

        info!(
            run_id = %run_id,
            rows = metrics.rows_found,
            edges = metrics.edges.len(),
            violations = violations.len(),
            "evaluation completed"
        );

        if self.options.strict && !violations.is_empty() {
            return Err(EvalError::Violations(violations.len() as u64));
        }

        Ok(EvaluationResult {
            run_dir: out_dir,
            metrics_path,
            report_path,
            metrics,
            report,
            violations,
        })
    }
}

/// Read a CSV written by the generator back into a table. Columns listed in
/// `kinds` are parsed as that kind; others are inferred cell by cell.
pub fn load_table_csv(
    path: &Path,
    kinds: &BTreeMap<String, ValueKind>,
) -> Result<OutputTable, EvalError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let header_kinds: Vec<Option<ValueKind>> = headers
        .iter()
        .map(|header| kinds.get(header).copied())
        .collect();
    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(EvalError::InvalidDataset(format!(
                "row {row} has {} cell(s), header has {}",
                record.len(),
                headers.len()
            )));
        }
        for ((column, kind), cell) in columns.iter_mut().zip(&header_kinds).zip(record.iter()) {
            column.push(match kind {
                Some(kind) => Value::from_csv_as(cell, *kind),
                None => Value::from_csv(cell),
            });
        }
    }

    OutputTable::new(headers.into_iter().zip(columns).collect())
        .map_err(|err| EvalError::InvalidDataset(err.to_string()))
}

fn detect_run_id(dataset_dir: &Path) -> Option<String> {
    let report_path = dataset_dir.join(GENERATION_REPORT);
    if let Ok(contents) = std::fs::read_to_string(report_path)
        && let Ok(report) = serde_json::from_str::<GenerationReport>(&contents)
    {
        return Some(report.run_id);
    }

    let name = dataset_dir.file_name()?.to_string_lossy();
    name.split_once("__run_")
        .map(|(_, run_part)| run_part.to_string())
}

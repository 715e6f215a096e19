use std::time::Instant;

use causalchemy_core::TopologicalScheduler;
use rand::seq::index::sample;
use tracing::{debug, info, warn};

use crate::errors::GenerationError;
use crate::generators::ParentColumns;
use crate::model::{CausalModel, GenerateOptions, GenerationReport, NodeReport};
use crate::random::RandomSource;
use crate::table::OutputTable;
use crate::value::Value;

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub table: OutputTable,
    pub report: GenerationReport,
}

/// Generates tables from a bound causal model.
///
/// One [`RandomSource`] is seeded per call and consumed in generation order,
/// so `(model, rows, seed, options)` fully determines the table.
#[derive(Debug, Clone, Default)]
pub struct GenerationEngine {
    options: GenerateOptions,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn generate(
        &self,
        model: &CausalModel,
        rows: usize,
        seed: u64,
    ) -> Result<OutputTable, GenerationError> {
        self.generate_with_report(model, rows, seed)
            .map(|result| result.table)
    }

    pub fn generate_with_report(
        &self,
        model: &CausalModel,
        rows: usize,
        seed: u64,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        let outcome = self.run(model, rows, seed, &run_id);
        match &outcome {
            Ok(result) => info!(
                run_id = %run_id,
                rows,
                columns = result.table.column_count(),
                null_cells = result.report.null_cells,
                duration_ms = start.elapsed().as_millis() as u64,
                "generation completed"
            ),
            Err(err) => warn!(run_id = %run_id, error = %err, "generation failed"),
        }
        outcome.map(|mut result| {
            result.report.duration_ms = start.elapsed().as_millis() as u64;
            result
        })
    }

    fn run(
        &self,
        model: &CausalModel,
        rows: usize,
        seed: u64,
        run_id: &str,
    ) -> Result<GenerationResult, GenerationError> {
        if rows == 0 {
            return Err(GenerationError::invalid("row count must be positive"));
        }

        let graph = model.graph();
        let order = TopologicalScheduler::new(self.options.tie_break).schedule(graph)?;
        model.ensure_bound()?;

        info!(
            run_id = %run_id,
            seed,
            rows,
            nodes = graph.len(),
            tie_break = ?self.options.tie_break,
            "generation started"
        );

        let mut report =
            GenerationReport::new(run_id.to_string(), seed, rows as u64, self.options.tie_break);
        let mut rng = RandomSource::from_seed(seed);
        let mut columns: Vec<Option<Vec<Value>>> = vec![None; graph.len()];

        for name in &order {
            let node_start = Instant::now();
            let position = graph
                .position(name)
                .ok_or_else(|| GenerationError::malformed(format!("unknown node '{name}'")))?;
            let node = &graph.nodes()[position];
            let generator = model
                .generator(name)
                .ok_or_else(|| GenerationError::malformed(format!("node '{name}' has no generator")))?;

            let mut column = {
                let mut parents = ParentColumns::new();
                for parent in node.parent_names() {
                    let data = graph
                        .position(parent)
                        .and_then(|parent_position| columns[parent_position].as_deref())
                        .ok_or_else(|| GenerationError::MissingParentData {
                            node: name.clone(),
                            parent: parent.to_string(),
                        })?;
                    parents.insert(parent, data);
                }
                generator.produce(name, &parents, rows, &mut rng)?
            };

            apply_fillrate(&mut column, model.fillrate(name), &mut rng);
            let nulls = column.iter().filter(|value| value.is_null()).count() as u64;

            let label = generator.label();
            report.record_generator_usage(&label);
            report.record_node(NodeReport {
                name: name.clone(),
                generator: label,
                parents: node.parent_names().map(str::to_string).collect(),
                rows: rows as u64,
                nulls,
                duration_us: node_start.elapsed().as_micros() as u64,
            });
            debug!(node = %name, generator = generator.kind(), nulls, "node generated");

            columns[position] = Some(column);
        }

        let mut output = Vec::new();
        for name in model.columns() {
            let column = graph
                .position(name)
                .and_then(|position| columns[position].take())
                .ok_or_else(|| GenerationError::malformed(format!("unknown column '{name}'")))?;
            output.push((name.to_string(), column));
        }
        report.columns = output.iter().map(|(name, _)| name.clone()).collect();

        Ok(GenerationResult {
            table: OutputTable::from_columns(output, rows),
            report,
        })
    }
}

/// Generate with default options.
pub fn generate(
    model: &CausalModel,
    rows: usize,
    seed: u64,
) -> Result<OutputTable, GenerationError> {
    GenerationEngine::default().generate(model, rows, seed)
}

/// Null out `round((1 - fillrate) * rows)` distinct rows, chosen from the
/// run's random stream. A fillrate of 1 consumes no draws.
fn apply_fillrate(column: &mut [Value], fillrate: f64, rng: &mut RandomSource) {
    let rows = column.len();
    let nulls = (((1.0 - fillrate) * rows as f64).round() as usize).min(rows);
    if nulls == 0 {
        return;
    }
    for index in sample(rng, rows, nulls) {
        column[index] = Value::Null;
    }
}

//! Evaluation of generated datasets against their causal graph.
//!
//! Reports column statistics, edge correlations and dependence between
//! nodes the graph declares unrelated.

pub mod engine;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod report;
pub mod stats;
pub mod structure;

pub use engine::{Evaluation, EvaluationEngine, load_table_csv};
pub use errors::EvalError;
pub use metrics::{
    ColumnStats, EdgeMetric, METRICS_VERSION, MetricsPlanRef, MetricsReport, PairMetric,
    PerformanceMetrics, WarningItem,
};
pub use model::{EvaluateOptions, EvaluationResult, Violation};
pub use report::render_report;
pub use stats::{column_stats, pearson};
pub use structure::{StructureCheck, check_structure};

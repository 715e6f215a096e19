use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metrics::MetricsReport;

/// Options for dataset evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateOptions {
    /// Fail when violations are found.
    pub strict: bool,
    /// Limit the number of violations listed in the report.
    pub max_examples: usize,
    /// Largest |correlation| tolerated between unrelated nodes.
    pub dependence_threshold: f64,
    /// Optional output directory override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_examples: 20,
            dependence_threshold: 0.1,
            out_dir: None,
        }
    }
}

/// Structured violation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub code: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// Result of a dataset evaluation written to disk.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub run_dir: PathBuf,
    pub metrics_path: PathBuf,
    pub report_path: PathBuf,
    pub metrics: MetricsReport,
    pub report: String,
    pub violations: Vec<Violation>,
}

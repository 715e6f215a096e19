use crate::metrics::MetricsReport;
use crate::model::Violation;

/// Render a deterministic markdown report from metrics and violations.
pub fn render_report(
    metrics: &MetricsReport,
    violations: &[Violation],
    max_examples: usize,
) -> String {
    let mut lines = Vec::new();

    lines.push("# Causalchemy Evaluation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- run_id: {}", metrics.run_id));
    lines.push(format!("- plan_version: {}", metrics.plan_ref.plan_version));
    lines.push(format!("- seed: {}", metrics.plan_ref.seed));
    if let Some(hash) = &metrics.plan_ref.plan_hash {
        lines.push(format!("- plan_hash: {hash}"));
    }
    let expected = metrics
        .rows_expected
        .map(|value| value.to_string())
        .unwrap_or_else(|| "-".to_string());
    lines.push(format!(
        "- rows: {} (expected {expected})",
        metrics.rows_found
    ));
    lines.push(String::new());

    lines.push("## Column statistics".to_string());
    lines.push("| column | nulls | mean | variance | min | max |".to_string());
    lines.push("| --- | --- | --- | --- | --- | --- |".to_string());
    for stats in &metrics.column_stats {
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            stats.column,
            stats.null_count,
            number(stats.mean),
            number(stats.variance),
            number(stats.min),
            number(stats.max)
        ));
    }
    lines.push(String::new());

    lines.push("## Edges".to_string());
    if metrics.edges.is_empty() {
        lines.push("- none".to_string());
    } else {
        lines.push("| edge | weight | correlation |".to_string());
        lines.push("| --- | --- | --- |".to_string());
        for edge in &metrics.edges {
            lines.push(format!(
                "| {} -> {} | {} | {} |",
                edge.parent,
                edge.child,
                number(edge.weight),
                number(edge.correlation)
            ));
        }
    }
    lines.push(String::new());

    lines.push(format!(
        "## Unrelated pairs (threshold {})",
        metrics.threshold
    ));
    if metrics.unrelated_pairs.is_empty() {
        lines.push("- none".to_string());
    } else {
        lines.push("| pair | correlation |".to_string());
        lines.push("| --- | --- |".to_string());
        for pair in &metrics.unrelated_pairs {
            lines.push(format!(
                "| {} ~ {} | {} |",
                pair.left,
                pair.right,
                number(pair.correlation)
            ));
        }
    }
    lines.push(String::new());

    if !metrics.warnings.is_empty() {
        lines.push("## Warnings".to_string());
        for warning in &metrics.warnings {
            let hint = warning
                .hint
                .as_ref()
                .map(|hint| format!(" (hint: {hint})"))
                .unwrap_or_default();
            lines.push(format!("- {}: {}{}", warning.path, warning.message, hint));
        }
        lines.push(String::new());
    }

    if !violations.is_empty() {
        lines.push("## Top violations".to_string());
        for violation in violations.iter().take(max_examples) {
            let example = violation
                .example
                .as_ref()
                .map(|value| format!(" ({value})"))
                .unwrap_or_default();
            lines.push(format!(
                "- {} {}: {}{}",
                violation.code, violation.path, violation.message, example
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(metrics, violations));
    lines.join("\n")
}

fn number(value: Option<f64>) -> String {
    value
        .map(|value| format!("{value:.4}"))
        .unwrap_or_else(|| "-".to_string())
}

fn recommendations(metrics: &MetricsReport, violations: &[Violation]) -> Vec<String> {
    let mut lines = Vec::new();
    if violations
        .iter()
        .any(|violation| violation.code == "unexpected_dependence")
    {
        lines.push(
            "- unrelated columns correlate; add the missing edge or raise rows to reduce sampling noise."
                .to_string(),
        );
    }
    if metrics
        .edges
        .iter()
        .any(|edge| edge.correlation.is_some_and(|value| value.abs() < 0.01))
    {
        lines.push("- some edges show no correlation; check weights and noise scale.".to_string());
    }
    if metrics
        .rows_expected
        .is_some_and(|expected| expected != metrics.rows_found)
    {
        lines.push("- row count differs from the plan; regenerate the dataset.".to_string());
    }
    if violations.is_empty() {
        lines.push("- no violations detected; compare metrics across seeds for drift.".to_string());
    }
    lines
}

use std::collections::{HashMap, HashSet};

use causalchemy_core::{Error as GraphError, Node, validate_nodes};
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
use crate::model::{
    DistributionSpec, FunctionalConfig, GeneratorConfig, KNOWN_DISTRIBUTIONS, LinearWeights,
    PLAN_VERSION, Plan,
};

/// Validated plan with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub plan: Plan,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a plan JSON document against the plan JSON Schema.
pub fn validate_plan_json(
    plan_json: &Value,
    plan_schema: &Value,
) -> Result<ValidationReport, PlanError> {
    let compiled =
        JSONSchema::compile(plan_schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(plan_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Semantic checks on a parsed plan: graph shape, generator bindings and
/// generator options.
pub fn validate_plan_semantics(plan: &Plan) -> ValidationReport {
    let mut report = ValidationReport::default();

    if plan.plan_version != PLAN_VERSION {
        report.push_warning(ValidationIssue::new(
            IssueSeverity::Warning,
            "plan_version_mismatch",
            "/plan_version",
            format!(
                "plan_version '{}' differs from supported version '{}'",
                plan.plan_version, PLAN_VERSION
            ),
            None,
        ));
    }

    if plan.rows == 0 {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "rows_zero",
            "/rows",
            "rows must be greater than zero",
            Some("set rows to a positive integer".to_string()),
        ));
    }

    let Some(nodes) = validate_graph(plan, &mut report) else {
        return report;
    };

    validate_node_plans(plan, &nodes, &mut report);
    validate_columns(plan, &nodes, &mut report);

    report
}

/// Validate the plan end-to-end, returning structured issues on failure.
pub fn validate_plan(plan_json: &Value, plan_schema: &Value) -> Result<ValidatedPlan, ValidationReport> {
    let structural = match validate_plan_json(plan_json, plan_schema) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let plan: Plan = match serde_json::from_value(plan_json.clone()) {
        Ok(plan) => plan,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_plan_json",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    let semantic = validate_plan_semantics(&plan);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedPlan {
        plan,
        warnings: semantic.warnings,
    })
}

fn validate_graph(plan: &Plan, report: &mut ValidationReport) -> Option<Vec<Node>> {
    let nodes = match plan.graph.to_nodes() {
        Ok(nodes) => nodes,
        Err(err) => {
            push_graph_error(err, report);
            return None;
        }
    };

    if nodes.is_empty() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "graph_empty",
            "/graph",
            "graph must declare at least one node",
            None,
        ));
        return None;
    }

    if let Err(err) = validate_nodes(&nodes) {
        push_graph_error(err, report);
        return None;
    }

    Some(nodes)
}

fn push_graph_error(err: GraphError, report: &mut ValidationReport) {
    let (code, hint) = match &err {
        GraphError::MalformedGraph(_) => ("malformed_graph", None),
        GraphError::CyclicGraph { .. } => (
            "cyclic_graph",
            err.back_edge()
                .map(|(from, to)| format!("remove the edge '{from}' -> '{to}'")),
        ),
    };
    report.push_error(ValidationIssue::new(
        IssueSeverity::Error,
        code,
        "/graph",
        err.to_string(),
        hint,
    ));
}

fn validate_node_plans(plan: &Plan, nodes: &[Node], report: &mut ValidationReport) {
    let graph_nodes: HashMap<&str, &Node> =
        nodes.iter().map(|node| (node.name.as_str(), node)).collect();
    let mut bound = HashSet::new();

    for (idx, node_plan) in plan.nodes.iter().enumerate() {
        let base_path = format!("/nodes/{idx}");

        if !bound.insert(node_plan.name.as_str()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_node_plan",
                format!("{base_path}/name"),
                format!("node '{}' has more than one generator", node_plan.name),
                Some("merge duplicate entries into a single node plan".to_string()),
            ));
            continue;
        }

        let Some(node) = graph_nodes.get(node_plan.name.as_str()) else {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "unknown_node",
                format!("{base_path}/name"),
                format!("node '{}' is not declared in the graph", node_plan.name),
                None,
            ));
            continue;
        };

        if let Some(fillrate) = node_plan.fillrate
            && !(0.0..=1.0).contains(&fillrate)
        {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_fillrate",
                format!("{base_path}/fillrate"),
                format!("fillrate {fillrate} is outside [0, 1]"),
                None,
            ));
        }

        let generator_path = format!("{base_path}/generator");
        match &node_plan.generator {
            GeneratorConfig::Independent { distribution } => {
                if !node.is_root() {
                    report.push_warning(ValidationIssue::new(
                        IssueSeverity::Warning,
                        "parents_ignored",
                        generator_path.clone(),
                        format!(
                            "node '{}' is independent; its declared parents do not influence it",
                            node.name
                        ),
                        Some("use a functional generator to depend on parents".to_string()),
                    ));
                }
                validate_distribution(
                    distribution,
                    &format!("{generator_path}/distribution"),
                    report,
                );
            }
            GeneratorConfig::Functional(config) => {
                validate_functional(node, config, &generator_path, report);
            }
        }
    }

    for node in nodes {
        if !bound.contains(node.name.as_str()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "missing_generator",
                "/nodes",
                format!("node '{}' has no generator", node.name),
                Some(format!("add a nodes entry for '{}'", node.name)),
            ));
        }
    }
}

fn validate_functional(
    node: &Node,
    config: &FunctionalConfig,
    base_path: &str,
    report: &mut ValidationReport,
) {
    if node.is_root() {
        report.push_warning(ValidationIssue::new(
            IssueSeverity::Warning,
            "functional_without_parents",
            base_path,
            format!(
                "node '{}' is functional but has no parents; only noise is generated",
                node.name
            ),
            None,
        ));
    }

    if config.linear_weights.is_some() && config.combine_fn.is_some() {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "conflicting_combine",
            base_path,
            "linear_weights and combine_fn are mutually exclusive",
            None,
        ));
    }

    if let Some(weights) = &config.linear_weights {
        let weights_path = format!("{base_path}/linear_weights");
        match weights {
            LinearWeights::Ordered(values) => {
                if values.len() != node.parents.len() {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "linear_weights_mismatch",
                        weights_path,
                        format!(
                            "node '{}' has {} parent(s) but {} weight(s)",
                            node.name,
                            node.parents.len(),
                            values.len()
                        ),
                        Some("provide exactly one weight per parent".to_string()),
                    ));
                }
            }
            LinearWeights::Named(values) => {
                for key in values.keys() {
                    if !node.parent_names().any(|parent| parent == key) {
                        report.push_error(ValidationIssue::new(
                            IssueSeverity::Error,
                            "linear_weights_mismatch",
                            format!("{weights_path}/{key}"),
                            format!("'{key}' is not a parent of node '{}'", node.name),
                            None,
                        ));
                    }
                }
                for parent in node.parent_names() {
                    if !values.contains_key(parent) {
                        report.push_error(ValidationIssue::new(
                            IssueSeverity::Error,
                            "linear_weights_mismatch",
                            weights_path.clone(),
                            format!("missing weight for parent '{parent}'"),
                            None,
                        ));
                    }
                }
            }
        }
    }

    if let Some(intercept) = config.intercept
        && !intercept.is_finite()
    {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "invalid_intercept",
            format!("{base_path}/intercept"),
            "intercept must be finite",
            None,
        ));
    }

    if let Some(name) = &config.combine_fn
        && name.trim().is_empty()
    {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "invalid_combine_fn",
            format!("{base_path}/combine_fn"),
            "combine_fn must name a registered function",
            None,
        ));
    }

    if let Some(noise) = &config.noise {
        validate_distribution(noise, &format!("{base_path}/noise"), report);
    }
}

fn validate_distribution(spec: &DistributionSpec, path: &str, report: &mut ValidationReport) {
    if !KNOWN_DISTRIBUTIONS.contains(&spec.name.as_str()) {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "unknown_distribution",
            format!("{path}/name"),
            format!("unknown distribution '{}'", spec.name),
            Some(format!("use one of: {}", KNOWN_DISTRIBUTIONS.join(", "))),
        ));
    }

    if let Some(params) = &spec.params
        && !params.is_object()
    {
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "invalid_params",
            format!("{path}/params"),
            "params must be a JSON object",
            None,
        ));
    }
}

fn validate_columns(plan: &Plan, nodes: &[Node], report: &mut ValidationReport) {
    let Some(columns) = &plan.columns else {
        return;
    };

    let known: HashSet<&str> = nodes.iter().map(|node| node.name.as_str()).collect();
    let mut seen = HashSet::new();
    for (idx, column) in columns.iter().enumerate() {
        let path = format!("/columns/{idx}");
        if !known.contains(column.as_str()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "unknown_column",
                path,
                format!("column '{column}' is not a graph node"),
                None,
            ));
        } else if !seen.insert(column.as_str()) {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "duplicate_column",
                path,
                format!("column '{column}' is listed more than once"),
                None,
            ));
        }
    }

    if seen.len() < known.len() && columns.len() == seen.len() {
        report.push_warning(ValidationIssue::new(
            IssueSeverity::Warning,
            "columns_subset",
            "/columns",
            "columns omits some graph nodes; they are generated but not emitted",
            None,
        ));
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

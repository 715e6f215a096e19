use std::path::{Path, PathBuf};

use causalchemy_plan::{
    Plan, load_plan, load_plan_value, plan_fingerprint, plan_json_schema, validate_plan,
    validate_plan_json, validate_plan_semantics,
};
use serde_json::{Value, json};

fn plan_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../plans")
        .join(name)
}

fn plan_schema() -> Value {
    serde_json::to_value(plan_json_schema()).expect("serialize plan schema")
}

fn base_plan() -> Value {
    json!({
        "plan_version": "0.1",
        "seed": 1,
        "rows": 10,
        "graph": {
            "form": "declarations",
            "nodes": [
                { "name": "x" },
                { "name": "y", "parents": ["x"] }
            ]
        },
        "nodes": [
            {
                "name": "x",
                "generator": {
                    "kind": "independent",
                    "distribution": { "name": "normal", "params": { "mean": 0.0, "std": 1.0 } }
                }
            },
            {
                "name": "y",
                "generator": { "kind": "functional", "linear_weights": [3.0] }
            }
        ]
    })
}

fn parse(value: Value) -> Plan {
    serde_json::from_value(value).expect("parse plan")
}

#[test]
fn chain_plan_validates() {
    let plan_json = load_plan_value(&plan_path("chain.plan.json")).expect("load chain plan");

    let structural = validate_plan_json(&plan_json, &plan_schema()).expect("validate json schema");
    assert!(structural.errors.is_empty(), "structural errors found: {structural:?}");

    let validated = validate_plan(&plan_json, &plan_schema()).expect("plan validation should succeed");
    assert!(validated.warnings.is_empty(), "unexpected warnings");
    assert_eq!(validated.plan.rows, 5);
}

#[test]
fn toml_matrix_plan_validates() {
    let plan_json = load_plan_value(&plan_path("collider.plan.toml")).expect("load collider plan");
    let validated = validate_plan(&plan_json, &plan_schema()).expect("plan validation should succeed");

    let graph = validated.plan.graph.to_graph_spec().expect("graph spec");
    assert_eq!(graph.edge("a", "c").and_then(|edge| edge.weight), Some(1.5));
    assert_eq!(graph.edge("b", "c").and_then(|edge| edge.weight), Some(-0.5));
}

#[test]
fn declarations_accept_weighted_parents() {
    let mut plan_json = base_plan();
    plan_json["graph"]["nodes"][1]["parents"] = json!([{ "name": "x", "weight": 0.75 }]);
    plan_json["nodes"][1]["generator"] = json!({ "kind": "functional" });

    let validated = validate_plan(&plan_json, &plan_schema()).expect("plan validation should succeed");
    let graph = validated.plan.graph.to_graph_spec().expect("graph spec");
    assert_eq!(graph.edge("x", "y").and_then(|edge| edge.weight), Some(0.75));

    let mut plan_json = base_plan();
    plan_json["graph"]["nodes"][1]["parents"] = json!(["x"]);
    let graph = parse(plan_json).graph.to_graph_spec().expect("graph spec");
    assert_eq!(graph.edge("x", "y").and_then(|edge| edge.weight), None);
}

#[test]
fn customers_plan_loads() {
    let plan = load_plan(&plan_path("customers.plan.json")).expect("load customers plan");
    let report = validate_plan_semantics(&plan);
    assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
}

#[test]
fn missing_rows_is_a_schema_violation() {
    let mut plan_json = base_plan();
    plan_json
        .as_object_mut()
        .expect("object")
        .remove("rows");

    let report = validate_plan(&plan_json, &plan_schema()).unwrap_err();
    assert!(report.has_code("schema_violation"));
}

#[test]
fn cyclic_graph_is_reported_with_hint() {
    let mut plan_json = base_plan();
    plan_json["graph"]["nodes"][0]["parents"] = json!(["y"]);

    let report = validate_plan_semantics(&parse(plan_json));
    let issue = report
        .errors
        .iter()
        .find(|issue| issue.code == "cyclic_graph")
        .expect("cyclic_graph issue");
    assert!(issue.hint.as_deref().unwrap_or_default().contains("->"));
}

#[test]
fn dangling_parent_is_malformed() {
    let mut plan_json = base_plan();
    plan_json["graph"]["nodes"][1]["parents"] = json!(["ghost"]);

    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.has_code("malformed_graph"));
}

#[test]
fn unbound_and_unknown_nodes_are_errors() {
    let mut plan_json = base_plan();
    plan_json["nodes"][1]["name"] = json!("z");

    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.has_code("unknown_node"));
    assert!(report.has_code("missing_generator"));
}

#[test]
fn linear_weights_must_match_parents() {
    let mut plan_json = base_plan();
    plan_json["nodes"][1]["generator"]["linear_weights"] = json!([1.0, 2.0]);
    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.has_code("linear_weights_mismatch"));

    let mut plan_json = base_plan();
    plan_json["nodes"][1]["generator"]["linear_weights"] = json!({ "w": 1.0 });
    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.has_code("linear_weights_mismatch"));
}

#[test]
fn combine_fn_conflicts_with_weights() {
    let mut plan_json = base_plan();
    plan_json["nodes"][1]["generator"]["combine_fn"] = json!("sum");

    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.has_code("conflicting_combine"));
}

#[test]
fn independent_node_with_parents_warns() {
    let mut plan_json = base_plan();
    plan_json["nodes"][1]["generator"] = json!({
        "kind": "independent",
        "distribution": { "name": "uniform" }
    });

    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.is_ok());
    assert!(report.has_code("parents_ignored"));
}

#[test]
fn unknown_distribution_and_bad_fillrate() {
    let mut plan_json = base_plan();
    plan_json["nodes"][0]["generator"]["distribution"]["name"] = json!("zipf");
    plan_json["nodes"][0]["fillrate"] = json!(1.5);

    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.has_code("unknown_distribution"));
    assert!(report.has_code("invalid_fillrate"));
}

#[test]
fn columns_must_name_graph_nodes() {
    let mut plan_json = base_plan();
    plan_json["columns"] = json!(["y", "y", "nope"]);

    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.has_code("duplicate_column"));
    assert!(report.has_code("unknown_column"));
}

#[test]
fn zero_rows_is_rejected() {
    let mut plan_json = base_plan();
    plan_json["rows"] = json!(0);

    let report = validate_plan_semantics(&parse(plan_json));
    assert!(report.has_code("rows_zero"));
}

#[test]
fn fingerprint_tracks_plan_content() {
    let plan = parse(base_plan());
    let first = plan_fingerprint(&plan).expect("fingerprint");
    let again = plan_fingerprint(&plan).expect("fingerprint");
    assert_eq!(first, again);
    assert_eq!(first.len(), 64);

    let mut reseeded = plan.clone();
    reseeded.seed = 2;
    assert_ne!(first, plan_fingerprint(&reseeded).expect("fingerprint"));
}

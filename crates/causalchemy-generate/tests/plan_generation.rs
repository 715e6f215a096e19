use std::fs;
use std::path::{Path, PathBuf};

use causalchemy_generate::output::{write_table_csv, write_table_json};
use causalchemy_generate::{FunctionRegistry, compile_plan};
use causalchemy_plan::{Plan, load_plan};

fn plan_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../plans")
        .join(name)
}

fn load(name: &str) -> Plan {
    load_plan(&plan_path(name)).unwrap_or_else(|err| panic!("load {name}: {err}"))
}

fn temp_out_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "causalchemy_generate_{label}_{}",
        uuid::Uuid::new_v4()
    ));
    fs::create_dir_all(&dir).expect("create temp out dir");
    dir
}

#[test]
fn chain_plan_generates_exact_relations() {
    let compiled = compile_plan(&load("chain.plan.json"), &FunctionRegistry::new())
        .expect("compile chain plan");
    let result = compiled.generate().expect("generate chain");

    let table = &result.table;
    assert_eq!(table.row_count(), 5);
    let a = table.numeric_column("a").unwrap();
    let b = table.numeric_column("b").unwrap();
    let c = table.numeric_column("c").unwrap();
    for i in 0..5 {
        let (a, b, c) = (a[i].unwrap(), b[i].unwrap(), c[i].unwrap());
        assert!((0.0..1.0).contains(&a));
        assert_eq!(b, 2.0 * a);
        assert_eq!(c, b + 1.0);
    }
    assert_eq!(result.report.seed, 42);
}

#[test]
fn customers_plan_respects_fillrate_and_columns() {
    let compiled = compile_plan(&load("customers.plan.json"), &FunctionRegistry::new())
        .expect("compile customers plan");
    let result = compiled.generate().expect("generate customers");
    let table = &result.table;

    assert_eq!(
        table.column_names(),
        ["segment", "age", "income", "spend", "churned"]
    );
    assert_eq!(table.row_count(), 200);

    let income = table.column("income").unwrap();
    let spend = table.column("spend").unwrap();
    assert_eq!(income.iter().filter(|value| value.is_null()).count(), 20);
    for (income, spend) in income.iter().zip(spend) {
        assert_eq!(income.is_null(), spend.is_null());
    }

    for age in table.column("age").unwrap() {
        let age = age.as_i64().expect("integer age");
        assert!((18..=80).contains(&age));
    }
    for segment in table.column("segment").unwrap() {
        assert!(matches!(segment.as_str(), Some("retail" | "wholesale")));
    }
}

#[test]
fn toml_matrix_plan_uses_edge_weights() {
    let plan = load("collider.plan.toml");
    let compiled = compile_plan(&plan, &FunctionRegistry::new()).expect("compile collider");
    let table = compiled.generate().expect("generate collider").table;

    let a = table.numeric_column("a").unwrap();
    let b = table.numeric_column("b").unwrap();
    let c = table.numeric_column("c").unwrap();
    let mut max_residual: f64 = 0.0;
    for i in 0..table.row_count() {
        let expected = 1.5 * a[i].unwrap() - 0.5 * b[i].unwrap();
        max_residual = max_residual.max((c[i].unwrap() - expected).abs());
    }
    // Noise has std 0.1; six sigma is far beyond any of 1000 draws.
    assert!(max_residual < 0.6, "residual {max_residual}");
}

#[test]
fn csv_and_json_exports_are_deterministic() {
    let plan = load("customers.plan.json");
    let out_dir = temp_out_dir("exports");

    let mut csv_runs = Vec::new();
    for run in 0..2 {
        let table = compile_plan(&plan, &FunctionRegistry::new())
            .and_then(|compiled| compiled.generate())
            .expect("generate customers")
            .table;
        let csv_path = out_dir.join(format!("customers_{run}.csv"));
        let bytes = write_table_csv(&csv_path, &table).expect("write csv");
        let contents = fs::read_to_string(&csv_path).expect("read csv");
        assert_eq!(bytes, contents.len() as u64);
        csv_runs.push(contents);

        let json_path = out_dir.join(format!("customers_{run}.json"));
        write_table_json(&json_path, &table).expect("write json");
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).expect("read json"))
                .expect("parse json");
        assert_eq!(json["age"].as_array().map(Vec::len), Some(200));
    }

    assert_eq!(csv_runs[0], csv_runs[1]);
    let header = csv_runs[0].lines().next().unwrap_or_default();
    assert_eq!(header, "segment,age,income,spend,churned");
    assert_eq!(csv_runs[0].lines().count(), 201);
}

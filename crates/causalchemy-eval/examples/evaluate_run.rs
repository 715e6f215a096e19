use std::env;
use std::path::PathBuf;

use causalchemy_eval::{EvaluateOptions, EvaluationEngine};
use causalchemy_plan::load_plan;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut plan_path: Option<PathBuf> = None;
    let mut run_dir: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--plan" => plan_path = args.next().map(PathBuf::from),
            "--run" => run_dir = args.next().map(PathBuf::from),
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let plan_path = plan_path.ok_or("missing --plan path")?;
    let run_dir = run_dir.ok_or("missing --run directory")?;

    let plan = load_plan(&plan_path)?;
    let result = EvaluationEngine::new(EvaluateOptions::default()).run(&plan, &run_dir)?;

    println!("metrics_path={}", result.metrics_path.display());
    println!("report_path={}", result.report_path.display());
    println!("violations={}", result.violations.len());
    Ok(())
}

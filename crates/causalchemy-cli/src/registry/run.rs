use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use causalchemy_core::TieBreak;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{RegistryError, RegistryResult};

/// Serializable generation options recorded with each run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub seed: u64,
    pub rows: u64,
    pub tie_break: TieBreak,
    pub format: String,
    pub dependence_threshold: f64,
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    pub plan_path: PathBuf,
    pub plan_version: String,
    pub plan_fingerprint: String,
    pub options: RunOptions,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub plan_path: String,
    pub plan_version: String,
    pub plan_fingerprint: String,
    pub options: RunOptions,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub plan_path: PathBuf,
    pub metrics_path: PathBuf,
    pub report_path: PathBuf,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` with `config.json` and an
/// empty `logs.ndjson`.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let paths = RunPaths {
        config_path: root.join("config.json"),
        logs_path: root.join("logs.ndjson"),
        plan_path: root.join("plan.json"),
        metrics_path: root.join("metrics.json"),
        report_path: root.join("report.md"),
        root,
    };

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        plan_path: ctx.plan_path.display().to_string(),
        plan_version: ctx.plan_version.clone(),
        plan_fingerprint: ctx.plan_fingerprint.clone(),
        options: ctx.options.clone(),
        git: collect_git_info(),
    };

    write_json(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)?;

    Ok(paths)
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_run_writes_config_and_log_file() {
        let run_id = uuid::Uuid::new_v4().to_string();
        let run_dir = std::env::temp_dir().join(format!("causalchemy_cli_registry_{run_id}"));
        let ctx = RunContext {
            run_id: run_id.clone(),
            started_at: Utc::now(),
            run_dir: run_dir.clone(),
            plan_path: PathBuf::from("plans/chain.plan.json"),
            plan_version: "0.1".to_string(),
            plan_fingerprint: "abc".to_string(),
            options: RunOptions {
                seed: 42,
                rows: 5,
                tie_break: TieBreak::Declaration,
                format: "csv".to_string(),
                dependence_threshold: 0.1,
            },
        };

        let paths = start_run(&ctx).expect("start run");
        assert!(paths.root.starts_with(&run_dir));
        assert!(
            paths
                .root
                .file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with(&format!("__run_{run_id}"))
        );
        assert!(paths.logs_path.exists());

        let config: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&paths.config_path).unwrap()).unwrap();
        assert_eq!(config["run_id"], run_id);
        assert_eq!(config["options"]["seed"], 42);
        assert_eq!(config["options"]["tie_break"], "declaration");
    }
}

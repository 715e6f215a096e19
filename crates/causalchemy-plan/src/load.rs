use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::{PlanError, Result};
use crate::model::Plan;

/// Read a plan document as untyped JSON. `.toml` files are converted; any
/// other extension is parsed as JSON.
pub fn load_plan_value(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(toml::from_str(&contents)?),
        Some("json") | None => Ok(serde_json::from_str(&contents)?),
        Some(other) => Err(PlanError::UnsupportedFormat(other.to_string())),
    }
}

/// Read and parse a plan document without semantic validation.
pub fn load_plan(path: &Path) -> Result<Plan> {
    let value = load_plan_value(path)?;
    Ok(serde_json::from_value(value)?)
}

/// SHA-256 of the plan's canonical JSON encoding, hex encoded.
pub fn plan_fingerprint(plan: &Plan) -> Result<String> {
    let encoded = serde_json::to_vec(plan)?;
    let digest = Sha256::digest(&encoded);
    Ok(hex::encode(digest))
}

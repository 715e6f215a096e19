//! Plan contracts, loading and validation for causalchemy.
//!
//! A plan describes a causal graph and the generator bound to each of its
//! nodes. Plans are authored as JSON or TOML, checked against the emitted
//! JSON Schema and then validated semantically before compilation.

pub mod errors;
pub mod load;
pub mod model;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
pub use load::{load_plan, load_plan_value, plan_fingerprint};
pub use model::{
    DistributionSpec, FunctionalConfig, GeneratorConfig, GraphInput, KNOWN_DISTRIBUTIONS,
    LinearWeights, NodeDeclaration, NodePlan, NoiseMode, PLAN_VERSION, ParentDeclaration, Plan,
    PlanOptions,
};
pub use schema::plan_json_schema;
pub use validate::{ValidatedPlan, validate_plan, validate_plan_json, validate_plan_semantics};

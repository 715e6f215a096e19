//! Causal data generation engine for causalchemy.
//!
//! A [`CausalModel`] binds one [`NodeGenerator`] to every node of a validated
//! graph. The [`GenerationEngine`] walks the graph in topological order,
//! drawing from a single seeded [`RandomSource`], and returns an
//! [`OutputTable`] with one column per node.

pub mod compile;
pub mod distributions;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod output;
pub mod params;
pub mod random;
pub mod table;
pub mod value;

pub use compile::{CompiledPlan, column_kinds, compile_plan};
pub use distributions::Distribution;
pub use engine::{GenerationEngine, GenerationResult, generate};
pub use errors::GenerationError;
pub use generators::{
    Combine, CustomGenerator, FunctionRegistry, FunctionalGenerator, NodeGenerator, ParentColumns,
};
pub use model::{CausalModel, GenerateOptions, GenerationReport, NodeReport};
pub use random::RandomSource;
pub use table::OutputTable;
pub use value::{Value, ValueKind};

use std::collections::{BTreeMap, HashSet};

use causalchemy_core::{GraphSpec, TieBreak};
use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;
use crate::generators::NodeGenerator;

/// Options for the generation engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Ordering among nodes that become ready at the same step.
    #[serde(default)]
    pub tie_break: TieBreak,
}

/// A validated graph with one generator bound to every node.
#[derive(Debug, Clone)]
pub struct CausalModel {
    graph: GraphSpec,
    generators: Vec<Option<NodeGenerator>>,
    fillrates: Vec<f64>,
    columns: Option<Vec<String>>,
}

impl CausalModel {
    pub fn new(graph: GraphSpec) -> Self {
        let len = graph.len();
        Self {
            graph,
            generators: vec![None; len],
            fillrates: vec![1.0; len],
            columns: None,
        }
    }

    /// Bind `generator` to node `name`, replacing any previous binding.
    ///
    /// Functional and custom generators may only read declared parents of
    /// the node.
    pub fn bind(
        &mut self,
        name: &str,
        generator: impl Into<NodeGenerator>,
    ) -> Result<&mut Self, GenerationError> {
        let generator = generator.into();
        let position = self.require_position(name)?;
        let node = &self.graph.nodes()[position];
        for parent in generator.parents() {
            if !node.parent_names().any(|declared| declared == parent) {
                return Err(GenerationError::invalid(format!(
                    "generator for '{name}' reads '{parent}', which is not a parent of '{name}'"
                )));
            }
        }
        self.generators[position] = Some(generator);
        Ok(self)
    }

    /// Builder form of [`CausalModel::bind`].
    pub fn with_generator(
        mut self,
        name: &str,
        generator: impl Into<NodeGenerator>,
    ) -> Result<Self, GenerationError> {
        self.bind(name, generator)?;
        Ok(self)
    }

    /// Fraction of non-null cells kept for node `name`.
    pub fn set_fillrate(&mut self, name: &str, fillrate: f64) -> Result<(), GenerationError> {
        if !(0.0..=1.0).contains(&fillrate) {
            return Err(GenerationError::invalid(format!(
                "fillrate for '{name}' must be in [0, 1], got {fillrate}"
            )));
        }
        let position = self.require_position(name)?;
        self.fillrates[position] = fillrate;
        Ok(())
    }

    pub fn with_fillrate(mut self, name: &str, fillrate: f64) -> Result<Self, GenerationError> {
        self.set_fillrate(name, fillrate)?;
        Ok(self)
    }

    /// Emit only `columns`, in this order. Every node is still generated.
    pub fn set_columns(&mut self, columns: Vec<String>) -> Result<(), GenerationError> {
        let mut seen = HashSet::new();
        for column in &columns {
            self.require_position(column)?;
            if !seen.insert(column.as_str()) {
                return Err(GenerationError::invalid(format!(
                    "column '{column}' is listed more than once"
                )));
            }
        }
        self.columns = Some(columns);
        Ok(())
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_columns(columns.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    pub fn graph(&self) -> &GraphSpec {
        &self.graph
    }

    pub fn generator(&self, name: &str) -> Option<&NodeGenerator> {
        self.graph
            .position(name)
            .and_then(|position| self.generators[position].as_ref())
    }

    pub fn fillrate(&self, name: &str) -> f64 {
        self.graph
            .position(name)
            .map(|position| self.fillrates[position])
            .unwrap_or(1.0)
    }

    /// Output column order: the configured projection, else declaration
    /// order.
    pub fn columns(&self) -> Vec<&str> {
        match &self.columns {
            Some(columns) => columns.iter().map(String::as_str).collect(),
            None => self.graph.names().collect(),
        }
    }

    /// Fails with `MalformedGraph` naming the first node without a
    /// generator.
    pub fn ensure_bound(&self) -> Result<(), GenerationError> {
        match self
            .generators
            .iter()
            .position(|generator| generator.is_none())
        {
            Some(position) => Err(GenerationError::malformed(format!(
                "node '{}' has no generator",
                self.graph.nodes()[position].name
            ))),
            None => Ok(()),
        }
    }

    fn require_position(&self, name: &str) -> Result<usize, GenerationError> {
        self.graph
            .position(name)
            .ok_or_else(|| GenerationError::malformed(format!("unknown node '{name}'")))
    }
}

/// Per-node generation summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReport {
    pub name: String,
    pub generator: String,
    pub parents: Vec<String>,
    pub rows: u64,
    pub nulls: u64,
    pub duration_us: u64,
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub rows: u64,
    pub tie_break: TieBreak,
    /// Order in which nodes were generated.
    pub order: Vec<String>,
    /// Emitted columns, in output order.
    pub columns: Vec<String>,
    pub nodes: Vec<NodeReport>,
    pub generator_usage: BTreeMap<String, u64>,
    pub null_cells: u64,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64, rows: u64, tie_break: TieBreak) -> Self {
        Self {
            run_id,
            seed,
            rows,
            tie_break,
            order: Vec::new(),
            columns: Vec::new(),
            nodes: Vec::new(),
            generator_usage: BTreeMap::new(),
            null_cells: 0,
            duration_ms: 0,
        }
    }

    pub fn record_node(&mut self, node: NodeReport) {
        self.null_cells += node.nulls;
        self.order.push(node.name.clone());
        self.nodes.push(node);
    }

    pub fn record_generator_usage(&mut self, label: &str) {
        *self.generator_usage.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn node(&self, name: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|node| node.name == name)
    }
}

#[cfg(test)]
mod tests {
    use causalchemy_core::Node;

    use super::*;
    use crate::distributions::Distribution;
    use crate::generators::FunctionalGenerator;

    fn graph() -> GraphSpec {
        GraphSpec::from_declarations(vec![
            Node::new("x"),
            Node::new("w"),
            Node::with_parents("y", ["x"]),
        ])
        .unwrap()
    }

    #[test]
    fn unbound_node_is_malformed() {
        let model = CausalModel::new(graph())
            .with_generator("x", Distribution::normal(0.0, 1.0).unwrap())
            .unwrap();
        let err = model.ensure_bound().unwrap_err();
        assert!(err.is_malformed_graph());
        assert!(err.to_string().contains("'w'"));
    }

    #[test]
    fn binding_unknown_node_fails() {
        let err = CausalModel::new(graph())
            .with_generator("ghost", Distribution::constant(1_i64))
            .unwrap_err();
        assert!(err.is_malformed_graph());
    }

    #[test]
    fn generator_may_only_read_declared_parents() {
        let generator = FunctionalGenerator::linear([("w", 1.0)], 0.0).unwrap();
        let err = CausalModel::new(graph())
            .with_generator("y", generator)
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidParameter(_)));
    }

    #[test]
    fn columns_and_fillrate_are_checked() {
        let mut model = CausalModel::new(graph());
        assert!(model.set_fillrate("x", 1.2).is_err());
        model.set_fillrate("x", 0.5).unwrap();
        assert_eq!(model.fillrate("x"), 0.5);
        assert_eq!(model.fillrate("y"), 1.0);

        assert_eq!(model.columns(), vec!["x", "w", "y"]);
        assert!(model.set_columns(vec!["y".into(), "y".into()]).is_err());
        assert!(model.set_columns(vec!["nope".into()]).is_err());
        model.set_columns(vec!["y".into(), "x".into()]).unwrap();
        assert_eq!(model.columns(), vec!["y", "x"]);
    }
}

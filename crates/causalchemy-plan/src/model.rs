use std::collections::BTreeMap;

use causalchemy_core::{GraphSpec, Node, TieBreak, nodes_from_matrix};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Current contract version for plan documents.
pub const PLAN_VERSION: &str = "0.1";

/// Distribution names understood by the generation engine.
pub const KNOWN_DISTRIBUTIONS: &[&str] = &[
    "uniform",
    "normal",
    "int_uniform",
    "bernoulli",
    "exponential",
    "categorical",
    "constant",
];

/// Root plan document: a causal graph plus one generator per node.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// Plan contract version.
    pub plan_version: String,
    /// Seed for the run's random stream.
    pub seed: u64,
    /// Number of rows to generate.
    pub rows: u64,
    /// Causal graph, in either accepted input form.
    pub graph: GraphInput,
    /// Generator configuration per node.
    pub nodes: Vec<NodePlan>,
    /// Presentation order of output columns. Defaults to declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PlanOptions>,
}

/// Plan-level policy knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlanOptions {
    /// Ordering among nodes that become ready at the same step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie_break: Option<TieBreak>,
}

/// Accepted graph descriptions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum GraphInput {
    /// Explicit `(node, parents)` declarations.
    Declarations { nodes: Vec<NodeDeclaration> },
    /// Square weighted adjacency matrix; `weights[i][j]` is the edge
    /// `names[i] -> names[j]`, zero meaning no edge.
    Matrix {
        names: Vec<String>,
        weights: Vec<Vec<f64>>,
    },
}

/// A node and its parents, in order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NodeDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ParentDeclaration>,
}

/// A parent given by name, or by name with an edge weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ParentDeclaration {
    Name(String),
    Weighted { name: String, weight: f64 },
}

impl ParentDeclaration {
    pub fn name(&self) -> &str {
        match self {
            ParentDeclaration::Name(name) | ParentDeclaration::Weighted { name, .. } => name,
        }
    }

    pub fn weight(&self) -> Option<f64> {
        match self {
            ParentDeclaration::Name(_) => None,
            ParentDeclaration::Weighted { weight, .. } => Some(*weight),
        }
    }
}

impl From<&str> for ParentDeclaration {
    fn from(name: &str) -> Self {
        ParentDeclaration::Name(name.to_string())
    }
}

impl NodeDeclaration {
    fn to_node(&self) -> Node {
        self.parents
            .iter()
            .fold(Node::new(self.name.clone()), |node, parent| match parent.weight() {
                Some(weight) => node.weighted_parent(parent.name(), weight),
                None => node.parent(parent.name()),
            })
    }
}

impl GraphInput {
    /// Node declarations without the acyclicity check.
    pub fn to_nodes(&self) -> causalchemy_core::Result<Vec<Node>> {
        match self {
            GraphInput::Declarations { nodes } => {
                Ok(nodes.iter().map(NodeDeclaration::to_node).collect())
            }
            GraphInput::Matrix { names, weights } => nodes_from_matrix(names, weights),
        }
    }

    /// Normalize into a validated graph.
    pub fn to_graph_spec(&self) -> causalchemy_core::Result<GraphSpec> {
        GraphSpec::from_declarations(self.to_nodes()?)
    }
}

/// Generator binding for one node.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NodePlan {
    pub name: String,
    pub generator: GeneratorConfig,
    /// Fraction of non-null cells, in `[0, 1]`. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fillrate: Option<f64>,
}

/// Generator configuration, interpreted per variant.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Draws i.i.d. values and ignores parents.
    Independent { distribution: DistributionSpec },
    /// Combines parent values and adds per-row noise.
    Functional(FunctionalConfig),
}

impl GeneratorConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            GeneratorConfig::Independent { .. } => "independent",
            GeneratorConfig::Functional(_) => "functional",
        }
    }
}

/// Functional generator options.
///
/// Without `linear_weights` or `combine_fn` the node is linear, each parent
/// weighted by its edge weight (matrix entry or weighted parent) or 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FunctionalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear_weights: Option<LinearWeights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f64>,
    /// Named pure function over parent values, in parent order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine_fn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<DistributionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_mode: Option<NoiseMode>,
}

/// Linear coefficients, either in parent order or keyed by parent name.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum LinearWeights {
    Ordered(Vec<f64>),
    Named(BTreeMap<String, f64>),
}

/// How per-row noise is applied to the combined value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoiseMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Distribution name with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DistributionSpec {
    pub name: String,
    /// Distribution parameters (shape depends on the distribution).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl DistributionSpec {
    pub fn new(name: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl Plan {
    pub fn tie_break(&self) -> TieBreak {
        self.options
            .as_ref()
            .and_then(|options| options.tie_break)
            .unwrap_or_default()
    }

    pub fn node_plan(&self, name: &str) -> Option<&NodePlan> {
        self.nodes.iter().find(|node| node.name == name)
    }
}

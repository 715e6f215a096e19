use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scheduler::{TieBreak, TopologicalScheduler};
use crate::validation::{find_cycle, validate_matrix, validate_nodes, validate_structure};

/// A direct causal input of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parent {
    pub name: String,
    /// Edge weight, used as the default linear coefficient by functional
    /// generators. Matrix inputs always carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// A variable of the causal model, mapped to one output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<Parent>,
}

impl Node {
    /// Create a root node (no parents).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
        }
    }

    /// Create a node with unweighted parents, in the given order.
    pub fn with_parents<I, S>(name: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parents: parents
                .into_iter()
                .map(|parent| Parent {
                    name: parent.into(),
                    weight: None,
                })
                .collect(),
        }
    }

    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parents.push(Parent {
            name: name.into(),
            weight: None,
        });
        self
    }

    pub fn weighted_parent(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.parents.push(Parent {
            name: name.into(),
            weight: Some(weight),
        });
        self
    }

    pub fn parent_names(&self) -> impl Iterator<Item = &str> {
        self.parents.iter().map(|parent| parent.name.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Validated, acyclic causal graph.
///
/// Both accepted input forms (node declarations and adjacency matrices) are
/// normalized into this representation; nothing downstream sees the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSpec {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
}

impl GraphSpec {
    /// Build a graph from explicit `(node, parents)` declarations.
    pub fn from_declarations(nodes: Vec<Node>) -> Result<Self> {
        validate_nodes(&nodes)?;

        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.name.clone(), position))
            .collect();

        let mut children = vec![Vec::new(); nodes.len()];
        for (position, node) in nodes.iter().enumerate() {
            for parent in &node.parents {
                let parent_position = index.get(&parent.name).copied().ok_or_else(|| {
                    Error::malformed(format!(
                        "node '{}' references unknown parent '{}'",
                        node.name, parent.name
                    ))
                })?;
                children[parent_position].push(position);
            }
        }

        Ok(Self {
            nodes,
            index,
            children,
        })
    }

    /// Build a graph from a square weighted adjacency matrix; see
    /// [`nodes_from_matrix`].
    pub fn from_matrix<S: AsRef<str>>(names: &[S], weights: &[Vec<f64>]) -> Result<Self> {
        Self::from_declarations(nodes_from_matrix(names, weights)?)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.position(name).map(|position| &self.nodes[position])
    }

    /// Declaration index of a node.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.parents.len()).sum()
    }

    /// Direct children of `name`, in declaration order.
    pub fn children(&self, name: &str) -> Vec<&str> {
        self.position(name)
            .map(|position| {
                self.children[position]
                    .iter()
                    .map(|child| self.nodes[*child].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The edge `parent -> child`, if declared.
    pub fn edge(&self, parent: &str, child: &str) -> Option<&Parent> {
        self.node(child)?
            .parents
            .iter()
            .find(|candidate| candidate.name == parent)
    }

    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| node.is_root())
            .map(|node| node.name.as_str())
            .collect()
    }

    pub fn leaves(&self) -> Vec<&str> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, children)| children.is_empty())
            .map(|(position, _)| self.nodes[position].name.as_str())
            .collect()
    }

    /// All transitive parents of `name`.
    pub fn ancestors(&self, name: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self
            .node(name)
            .map(|node| node.parent_names().collect())
            .unwrap_or_default();

        while let Some(current) = stack.pop() {
            if seen.insert(current.to_string())
                && let Some(node) = self.node(current)
            {
                stack.extend(node.parent_names());
            }
        }

        seen
    }

    /// Derived weight matrix in declaration order. Unweighted edges count as
    /// `1.0`.
    pub fn adjacency_matrix(&self) -> Vec<Vec<f64>> {
        let mut matrix = vec![vec![0.0; self.nodes.len()]; self.nodes.len()];
        for (child, node) in self.nodes.iter().enumerate() {
            for parent in &node.parents {
                if let Some(row) = self.position(&parent.name) {
                    matrix[row][child] = parent.weight.unwrap_or(1.0);
                }
            }
        }
        matrix
    }
}

/// Convert a weighted adjacency matrix into node declarations.
///
/// Entry `weights[i][j] != 0` declares an edge from `names[i]` (parent) to
/// `names[j]` (child) with that weight. Parents are listed in ascending row
/// order. Only the matrix shape is validated here.
pub fn nodes_from_matrix<S: AsRef<str>>(names: &[S], weights: &[Vec<f64>]) -> Result<Vec<Node>> {
    validate_matrix(names, weights)?;

    Ok(names
        .iter()
        .enumerate()
        .map(|(column, name)| Node {
            name: name.as_ref().to_string(),
            parents: weights
                .iter()
                .enumerate()
                .filter(|(_, row)| row[column] != 0.0)
                .map(|(row_index, row)| Parent {
                    name: names[row_index].as_ref().to_string(),
                    weight: Some(row[column]),
                })
                .collect(),
        })
        .collect())
}

/// Summary of graph structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub roots: usize,
    pub leaves: usize,
}

/// Report for generation ordering, built even when the graph is cyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphReport {
    pub summary: GraphSummary,
    pub topo_order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Build a deterministic ordering report for raw node declarations.
///
/// Structural problems (dangling parents, duplicates) are still errors; a
/// cycle is reported in the `cycle` field instead.
pub fn build_graph_report(nodes: &[Node], tie_break: TieBreak) -> Result<GraphReport> {
    validate_structure(nodes)?;

    let referenced: BTreeSet<&str> = nodes
        .iter()
        .flat_map(|node| node.parent_names())
        .collect();
    let summary = GraphSummary {
        nodes: nodes.len(),
        edges: nodes.iter().map(|node| node.parents.len()).sum(),
        roots: nodes.iter().filter(|node| node.is_root()).count(),
        leaves: nodes
            .iter()
            .filter(|node| !referenced.contains(node.name.as_str()))
            .count(),
    };

    match find_cycle(nodes) {
        Some(cycle) => Ok(GraphReport {
            summary,
            topo_order: None,
            cycle: Some(cycle),
        }),
        None => Ok(GraphReport {
            summary,
            topo_order: Some(TopologicalScheduler::new(tie_break).schedule_nodes(nodes)?),
            cycle: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> GraphSpec {
        GraphSpec::from_declarations(vec![
            Node::new("a"),
            Node::with_parents("b", ["a"]),
            Node::with_parents("c", ["b"]),
        ])
        .expect("valid chain")
    }

    #[test]
    fn matrix_and_declarations_normalize_to_same_graph() {
        let names = ["a", "b", "c"];
        let weights = vec![
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 0.0],
        ];
        let from_matrix = GraphSpec::from_matrix(&names, &weights).expect("valid matrix");

        assert_eq!(from_matrix.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(from_matrix.node("b").unwrap().parent_names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(from_matrix.edge("b", "c").unwrap().weight, Some(1.0));
        assert_eq!(from_matrix.adjacency_matrix(), chain().adjacency_matrix());
    }

    #[test]
    fn matrix_weights_are_kept_on_edges() {
        let names = ["x", "y"];
        let weights = vec![vec![0.0, -2.5], vec![0.0, 0.0]];
        let graph = GraphSpec::from_matrix(&names, &weights).expect("valid matrix");

        assert_eq!(graph.edge("x", "y").unwrap().weight, Some(-2.5));
        assert!(graph.edge("y", "x").is_none());
        assert_eq!(graph.adjacency_matrix(), weights);
    }

    #[test]
    fn children_roots_and_leaves() {
        let graph = chain();
        assert_eq!(graph.children("a"), vec!["b"]);
        assert!(graph.children("c").is_empty());
        assert_eq!(graph.roots(), vec!["a"]);
        assert_eq!(graph.leaves(), vec!["c"]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn ancestors_are_transitive() {
        let graph = chain();
        let ancestors = graph.ancestors("c");
        assert!(ancestors.contains("a"));
        assert!(ancestors.contains("b"));
        assert!(graph.ancestors("a").is_empty());
    }

    #[test]
    fn report_orders_acyclic_graph() {
        let nodes = vec![
            Node::with_parents("c", ["a", "b"]),
            Node::new("a"),
            Node::new("b"),
        ];
        let report = build_graph_report(&nodes, TieBreak::Declaration).expect("report");
        assert_eq!(
            report.topo_order,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(report.summary.roots, 2);
        assert_eq!(report.summary.leaves, 1);
        assert!(report.cycle.is_none());
    }

    #[test]
    fn report_captures_cycle() {
        let nodes = vec![
            Node::with_parents("a", ["b"]),
            Node::with_parents("b", ["a"]),
        ];
        let report = build_graph_report(&nodes, TieBreak::Declaration).expect("report");
        assert!(report.topo_order.is_none());
        let cycle = report.cycle.expect("cycle");
        assert_eq!(cycle.first(), cycle.last());
    }
}

use std::collections::{BTreeSet, HashMap};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{GraphSpec, Node};
use crate::validation::{find_cycle, validate_structure};

/// Selection policy among nodes that become ready at the same step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Ascending declaration index.
    #[default]
    Declaration,
    /// Ascending node name.
    Lexicographic,
}

/// Computes a generation order in which every node follows its parents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologicalScheduler {
    tie_break: TieBreak,
}

impl TopologicalScheduler {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Order a validated graph.
    pub fn schedule(&self, graph: &GraphSpec) -> Result<Vec<String>> {
        self.schedule_nodes(graph.nodes())
    }

    /// Order raw declarations. Cycles are re-checked here and reported as
    /// [`Error::CyclicGraph`].
    pub fn schedule_nodes(&self, nodes: &[Node]) -> Result<Vec<String>> {
        validate_structure(nodes)?;

        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.name.as_str(), position))
            .collect();
        let rank = self.ranks(nodes);

        let mut indegree: Vec<usize> = nodes.iter().map(|node| node.parents.len()).collect();
        let mut children = vec![Vec::new(); nodes.len()];
        for (position, node) in nodes.iter().enumerate() {
            for parent in node.parent_names() {
                if let Some(parent_position) = index.get(parent) {
                    children[*parent_position].push(position);
                }
            }
        }

        let mut ready: BTreeSet<(usize, usize)> = indegree
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(position, _)| (rank[position], position))
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some((_, position)) = ready.pop_first() {
            order.push(nodes[position].name.clone());

            for child in &children[position] {
                let count = &mut indegree[*child];
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.insert((rank[*child], *child));
                }
            }
        }

        if order.len() == nodes.len() {
            Ok(order)
        } else {
            let cycle = find_cycle(nodes).unwrap_or_else(|| {
                indegree
                    .iter()
                    .enumerate()
                    .filter(|(_, count)| **count > 0)
                    .map(|(position, _)| nodes[position].name.clone())
                    .collect()
            });
            Err(Error::CyclicGraph { cycle })
        }
    }

    fn ranks(&self, nodes: &[Node]) -> Vec<usize> {
        match self.tie_break {
            TieBreak::Declaration => (0..nodes.len()).collect(),
            TieBreak::Lexicographic => {
                let mut sorted: Vec<usize> = (0..nodes.len()).collect();
                sorted.sort_by(|left, right| nodes[*left].name.cmp(&nodes[*right].name));
                let mut rank = vec![0; nodes.len()];
                for (position, node) in sorted.into_iter().enumerate() {
                    rank[node] = position;
                }
                rank
            }
        }
    }
}

use std::collections::BTreeSet;

use causalchemy_core::GraphSpec;
use causalchemy_generate::OutputTable;

use crate::metrics::{EdgeMetric, PairMetric};
use crate::model::Violation;
use crate::stats::pearson;

/// Correlations observed along edges and between unrelated nodes.
#[derive(Debug, Clone, Default)]
pub struct StructureCheck {
    pub edges: Vec<EdgeMetric>,
    pub unrelated_pairs: Vec<PairMetric>,
    pub violations: Vec<Violation>,
}

/// Compare a table against the graph it was generated from.
///
/// Two nodes are unrelated when neither is an ancestor of the other and they
/// share no ancestor; without conditioning such columns must be independent.
/// An unrelated pair whose |correlation| exceeds `threshold` is reported as
/// `unexpected_dependence`. Columns missing from the table are skipped.
pub fn check_structure(graph: &GraphSpec, table: &OutputTable, threshold: f64) -> StructureCheck {
    let mut check = StructureCheck::default();

    for node in graph.nodes() {
        let Some(child) = table.column(&node.name) else {
            continue;
        };
        for parent in &node.parents {
            let Some(parent_column) = table.column(&parent.name) else {
                continue;
            };
            check.edges.push(EdgeMetric {
                parent: parent.name.clone(),
                child: node.name.clone(),
                weight: parent.weight,
                correlation: pearson(parent_column, child),
            });
        }
    }

    let lineage: Vec<BTreeSet<String>> = graph
        .nodes()
        .iter()
        .map(|node| {
            let mut set = graph.ancestors(&node.name);
            set.insert(node.name.clone());
            set
        })
        .collect();

    let nodes = graph.nodes();
    for (i, left) in nodes.iter().enumerate() {
        for (j, right) in nodes.iter().enumerate().skip(i + 1) {
            if !lineage[i].is_disjoint(&lineage[j]) {
                continue;
            }
            let (Some(left_column), Some(right_column)) =
                (table.column(&left.name), table.column(&right.name))
            else {
                continue;
            };

            let correlation = pearson(left_column, right_column);
            if let Some(value) = correlation
                && value.abs() > threshold
            {
                check.violations.push(Violation {
                    code: "unexpected_dependence".to_string(),
                    path: format!("{}~{}", left.name, right.name),
                    message: format!(
                        "'{}' and '{}' share no causal path but correlate at {value:.3}",
                        left.name, right.name
                    ),
                    example: Some(format!("threshold={threshold}")),
                });
            }
            check.unrelated_pairs.push(PairMetric {
                left: left.name.clone(),
                right: right.name.clone(),
                correlation,
            });
        }
    }

    check
}

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::graph::Node;

/// Validate node declarations: structure first, then acyclicity.
///
/// This checks:
/// - empty and duplicate node names
/// - self-loops and repeated parents
/// - parent references that do not resolve
/// - non-finite edge weights
/// - cycles
pub fn validate_nodes(nodes: &[Node]) -> Result<()> {
    validate_structure(nodes)?;
    detect_cycle(nodes)
}

/// Structural checks only; cycles are left to [`detect_cycle`].
pub fn validate_structure(nodes: &[Node]) -> Result<()> {
    let mut names = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if node.name.trim().is_empty() {
            return Err(Error::malformed("node names must be non-empty"));
        }
        if !names.insert(node.name.as_str()) {
            return Err(Error::malformed(format!(
                "duplicate node name: {}",
                node.name
            )));
        }
    }

    for node in nodes {
        let mut seen = HashSet::with_capacity(node.parents.len());
        for parent in &node.parents {
            if parent.name == node.name {
                return Err(Error::malformed(format!(
                    "self-loop on node '{}'",
                    node.name
                )));
            }
            if !names.contains(parent.name.as_str()) {
                return Err(Error::malformed(format!(
                    "node '{}' references unknown parent '{}'",
                    node.name, parent.name
                )));
            }
            if !seen.insert(parent.name.as_str()) {
                return Err(Error::malformed(format!(
                    "node '{}' lists parent '{}' more than once",
                    node.name, parent.name
                )));
            }
            if let Some(weight) = parent.weight
                && !weight.is_finite()
            {
                return Err(Error::malformed(format!(
                    "edge '{}' -> '{}' has non-finite weight",
                    parent.name, node.name
                )));
            }
        }
    }

    Ok(())
}

/// Validate the shape of a weighted adjacency matrix against its names.
pub fn validate_matrix<S: AsRef<str>>(names: &[S], weights: &[Vec<f64>]) -> Result<()> {
    if weights.len() != names.len() {
        return Err(Error::malformed(format!(
            "matrix has {} rows but {} node names",
            weights.len(),
            names.len()
        )));
    }

    for (row_index, row) in weights.iter().enumerate() {
        if row.len() != names.len() {
            return Err(Error::malformed(format!(
                "matrix is not square: row {} has {} entries, expected {}",
                row_index,
                row.len(),
                names.len()
            )));
        }
        for (column, value) in row.iter().enumerate() {
            if !value.is_finite() {
                return Err(Error::malformed(format!(
                    "matrix entry [{row_index}][{column}] is not finite"
                )));
            }
        }
        if row[row_index] != 0.0 {
            return Err(Error::malformed(format!(
                "self-loop on node '{}' (diagonal entry {})",
                names[row_index].as_ref(),
                row_index
            )));
        }
    }

    Ok(())
}

/// Fail with [`Error::CyclicGraph`] when the declarations contain a cycle.
pub fn detect_cycle(nodes: &[Node]) -> Result<()> {
    match find_cycle(nodes) {
        Some(cycle) => Err(Error::CyclicGraph { cycle }),
        None => Ok(()),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first search along parent -> child edges, in declaration order.
///
/// Returns the cycle path; its first and last entries are the same node and
/// the last two entries form the back-edge. Unknown parents are ignored.
pub(crate) fn find_cycle(nodes: &[Node]) -> Option<Vec<String>> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(position, node)| (node.name.as_str(), position))
        .collect();

    let mut children = vec![Vec::new(); nodes.len()];
    for (position, node) in nodes.iter().enumerate() {
        for parent in node.parent_names() {
            if let Some(parent_position) = index.get(parent) {
                children[*parent_position].push(position);
            }
        }
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    for start in 0..nodes.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        marks[start] = Mark::InProgress;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            let Some(&child) = children[node].get(cursor) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[child] {
                Mark::Unvisited => {
                    marks[child] = Mark::InProgress;
                    stack.push((child, 0));
                }
                Mark::InProgress => {
                    let begin = stack
                        .iter()
                        .position(|(candidate, _)| *candidate == child)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> = stack[begin..]
                        .iter()
                        .map(|(position, _)| nodes[*position].name.clone())
                        .collect();
                    cycle.push(nodes[child].name.clone());
                    return Some(cycle);
                }
                Mark::Done => {}
            }
        }
    }

    None
}

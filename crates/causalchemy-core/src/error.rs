use thiserror::Error;

/// Structural errors raised while building or ordering a causal graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The declared graph has a bad shape, a dangling reference, a duplicate
    /// identity or a self-loop.
    #[error("malformed graph: {0}")]
    MalformedGraph(String),
    /// The graph contains a cycle. The last two entries of `cycle` form the
    /// back-edge that closed it.
    #[error("cyclic graph: {}", cycle.join(" -> "))]
    CyclicGraph { cycle: Vec<String> },
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedGraph(message.into())
    }

    /// Back-edge `(from, to)` of a cycle error.
    pub fn back_edge(&self) -> Option<(&str, &str)> {
        match self {
            Error::CyclicGraph { cycle } if cycle.len() >= 2 => {
                let to = &cycle[cycle.len() - 1];
                let from = &cycle[cycle.len() - 2];
                Some((from.as_str(), to.as_str()))
            }
            _ => None,
        }
    }
}

/// Convenience alias for results returned by causalchemy crates.
pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Errors emitted by generators and the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Malformed or cyclic graph, detected before any sampling.
    #[error("{0}")]
    Graph(#[from] causalchemy_core::Error),
    /// A generator ran before one of its parents was generated.
    #[error("missing parent data: node '{node}' requires column '{parent}'")]
    MissingParentData { node: String, parent: String },
    /// A generator configuration is outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A column does not have the requested number of rows.
    #[error("column '{node}' has {actual} value(s), expected {expected}")]
    ColumnLength {
        node: String,
        expected: usize,
        actual: usize,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        GenerationError::Graph(causalchemy_core::Error::MalformedGraph(message.into()))
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        GenerationError::InvalidParameter(message.into())
    }

    pub fn is_malformed_graph(&self) -> bool {
        matches!(
            self,
            GenerationError::Graph(causalchemy_core::Error::MalformedGraph(_))
        )
    }

    pub fn is_cyclic_graph(&self) -> bool {
        matches!(
            self,
            GenerationError::Graph(causalchemy_core::Error::CyclicGraph { .. })
        )
    }
}

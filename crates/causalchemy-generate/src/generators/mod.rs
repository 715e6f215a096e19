//! Node generators: independent draws, functional combinations of parents
//! and caller-supplied custom functions.

pub mod functional;
pub mod functions;

use std::fmt;
use std::sync::Arc;

use crate::distributions::Distribution;
use crate::errors::GenerationError;
use crate::random::RandomSource;
use crate::value::Value;

pub use functional::{Combine, FunctionalGenerator};
pub use functions::{CombineFn, FunctionRegistry};

/// Caller-supplied column producer. Receives the parent columns, the row
/// count and the shared random stream, and must return exactly one value
/// per row.
pub type CustomFn = Arc<
    dyn Fn(&ParentColumns<'_>, usize, &mut RandomSource) -> Result<Vec<Value>, GenerationError>
        + Send
        + Sync,
>;

/// Already-generated parent columns, looked up by name.
#[derive(Debug, Default)]
pub struct ParentColumns<'a> {
    columns: Vec<(&'a str, &'a [Value])>,
}

impl<'a> ParentColumns<'a> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: &'a str, column: &'a [Value]) {
        self.columns.push((name, column));
    }

    pub fn get(&self, name: &str) -> Option<&'a [Value]> {
        self.columns
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, column)| *column)
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.columns.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns for `parents`, in order, each holding exactly `rows` values.
    pub fn require(
        &self,
        node: &str,
        parents: &[String],
        rows: usize,
    ) -> Result<Vec<&'a [Value]>, GenerationError> {
        parents
            .iter()
            .map(|parent| {
                let column = self
                    .get(parent)
                    .ok_or_else(|| GenerationError::MissingParentData {
                        node: node.to_string(),
                        parent: parent.clone(),
                    })?;
                if column.len() != rows {
                    return Err(GenerationError::ColumnLength {
                        node: parent.clone(),
                        expected: rows,
                        actual: column.len(),
                    });
                }
                Ok(column)
            })
            .collect()
    }
}

/// Custom generator with the parents it reads.
#[derive(Clone)]
pub struct CustomGenerator {
    id: String,
    parents: Vec<String>,
    function: CustomFn,
}

impl CustomGenerator {
    pub fn new<I, S, F>(id: impl Into<String>, parents: I, function: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&ParentColumns<'_>, usize, &mut RandomSource) -> Result<Vec<Value>, GenerationError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            parents: parents.into_iter().map(Into::into).collect(),
            function: Arc::new(function),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }
}

impl fmt::Debug for CustomGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomGenerator")
            .field("id", &self.id)
            .field("parents", &self.parents)
            .finish_non_exhaustive()
    }
}

/// Generation rule bound to one node.
#[derive(Debug, Clone)]
pub enum NodeGenerator {
    /// i.i.d. draws; parents are ignored.
    Independent(Distribution),
    Functional(FunctionalGenerator),
    Custom(CustomGenerator),
}

impl NodeGenerator {
    pub fn independent(distribution: Distribution) -> Self {
        NodeGenerator::Independent(distribution)
    }

    pub fn custom<I, S, F>(id: impl Into<String>, parents: I, function: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&ParentColumns<'_>, usize, &mut RandomSource) -> Result<Vec<Value>, GenerationError>
            + Send
            + Sync
            + 'static,
    {
        NodeGenerator::Custom(CustomGenerator::new(id, parents, function))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NodeGenerator::Independent(_) => "independent",
            NodeGenerator::Functional(_) => "functional",
            NodeGenerator::Custom(_) => "custom",
        }
    }

    /// Stable label for usage counters, e.g. `independent.normal`.
    pub fn label(&self) -> String {
        match self {
            NodeGenerator::Independent(distribution) => {
                format!("independent.{}", distribution.name())
            }
            NodeGenerator::Functional(generator) => match generator.combine() {
                Combine::Linear { .. } => "functional.linear".to_string(),
                Combine::Function { name, .. } => format!("functional.{name}"),
            },
            NodeGenerator::Custom(generator) => format!("custom.{}", generator.id()),
        }
    }

    /// Parents this generator reads. Independent generators read none.
    pub fn parents(&self) -> &[String] {
        match self {
            NodeGenerator::Independent(_) => &[],
            NodeGenerator::Functional(generator) => generator.parents(),
            NodeGenerator::Custom(generator) => generator.parents(),
        }
    }

    /// Produce one column of `rows` values.
    pub fn produce(
        &self,
        node: &str,
        parent_columns: &ParentColumns<'_>,
        rows: usize,
        rng: &mut RandomSource,
    ) -> Result<Vec<Value>, GenerationError> {
        let column = match self {
            NodeGenerator::Independent(distribution) => distribution.sample_n(rows, rng),
            NodeGenerator::Functional(generator) => {
                generator.produce(node, parent_columns, rows, rng)?
            }
            NodeGenerator::Custom(generator) => {
                parent_columns.require(node, &generator.parents, rows)?;
                (generator.function)(parent_columns, rows, rng)?
            }
        };

        if column.len() != rows {
            return Err(GenerationError::ColumnLength {
                node: node.to_string(),
                expected: rows,
                actual: column.len(),
            });
        }
        Ok(column)
    }
}

impl From<Distribution> for NodeGenerator {
    fn from(distribution: Distribution) -> Self {
        NodeGenerator::Independent(distribution)
    }
}

impl From<FunctionalGenerator> for NodeGenerator {
    fn from(generator: FunctionalGenerator) -> Self {
        NodeGenerator::Functional(generator)
    }
}

impl From<CustomGenerator> for NodeGenerator {
    fn from(generator: CustomGenerator) -> Self {
        NodeGenerator::Custom(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_ignores_parents() {
        let generator = NodeGenerator::independent(Distribution::uniform(0.0, 1.0).unwrap());
        let mut rng = RandomSource::from_seed(1);
        let column = generator
            .produce("x", &ParentColumns::new(), 25, &mut rng)
            .unwrap();
        assert_eq!(column.len(), 25);
        assert_eq!(generator.label(), "independent.uniform");
    }

    #[test]
    fn custom_generator_reads_parents() {
        let x = vec![Value::Int(2), Value::Int(3)];
        let mut parents = ParentColumns::new();
        parents.insert("x", &x);

        let generator = NodeGenerator::custom("square", ["x"], |parents, rows, _rng| {
            let x = parents.get("x").unwrap_or_default();
            Ok((0..rows)
                .map(|row| Value::Int(x[row].as_i64().unwrap_or(0).pow(2)))
                .collect())
        });
        let mut rng = RandomSource::from_seed(1);
        let column = generator.produce("y", &parents, 2, &mut rng).unwrap();
        assert_eq!(column, vec![Value::Int(4), Value::Int(9)]);
        assert_eq!(generator.label(), "custom.square");
    }

    #[test]
    fn short_custom_column_is_rejected() {
        let generator = NodeGenerator::custom("short", Vec::<String>::new(), |_, _, _| {
            Ok(vec![Value::Null])
        });
        let mut rng = RandomSource::from_seed(1);
        let err = generator
            .produce("z", &ParentColumns::new(), 3, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::ColumnLength { expected: 3, actual: 1, .. }
        ));
    }
}

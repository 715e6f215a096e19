use std::fmt;

use causalchemy_plan::NoiseMode;

use crate::distributions::Distribution;
use crate::errors::GenerationError;
use crate::generators::ParentColumns;
use crate::generators::functions::CombineFn;
use crate::random::RandomSource;
use crate::value::Value;

/// Deterministic part of a functional node.
#[derive(Clone)]
pub enum Combine {
    /// `intercept + sum(weight_i * parent_i)`.
    Linear { weights: Vec<f64>, intercept: f64 },
    /// Named pure function of the parent values.
    Function { name: String, function: CombineFn },
}

impl Combine {
    pub fn apply(&self, inputs: &[f64]) -> f64 {
        match self {
            Combine::Linear { weights, intercept } => weights
                .iter()
                .zip(inputs)
                .fold(*intercept, |acc, (weight, value)| acc + weight * value),
            Combine::Function { function, .. } => function(inputs),
        }
    }
}

impl fmt::Debug for Combine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combine::Linear { weights, intercept } => f
                .debug_struct("Linear")
                .field("weights", weights)
                .field("intercept", intercept)
                .finish(),
            Combine::Function { name, .. } => f.debug_tuple("Function").field(name).finish(),
        }
    }
}

/// Value computed from parent values plus one noise draw per row.
///
/// A null in any parent yields a null output for that row. Noise is drawn
/// for every row regardless, so the random stream does not depend on where
/// nulls fall.
#[derive(Debug, Clone)]
pub struct FunctionalGenerator {
    parents: Vec<String>,
    combine: Combine,
    noise: Option<Distribution>,
    noise_mode: NoiseMode,
}

impl FunctionalGenerator {
    /// Linear combination of `(parent, weight)` pairs.
    pub fn linear<I, S>(weights: I, intercept: f64) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        if !intercept.is_finite() {
            return Err(GenerationError::invalid("linear: intercept must be finite"));
        }
        let (parents, weights): (Vec<String>, Vec<f64>) = weights
            .into_iter()
            .map(|(parent, weight)| (parent.into(), weight))
            .unzip();
        if let Some(position) = weights.iter().position(|weight| !weight.is_finite()) {
            return Err(GenerationError::invalid(format!(
                "linear: weight for parent '{}' must be finite",
                parents[position]
            )));
        }
        Ok(Self {
            parents,
            combine: Combine::Linear { weights, intercept },
            noise: None,
            noise_mode: NoiseMode::Additive,
        })
    }

    /// Named function over `parents`, in that order.
    pub fn with_function<I, S>(parents: I, name: impl Into<String>, function: CombineFn) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parents: parents.into_iter().map(Into::into).collect(),
            combine: Combine::Function {
                name: name.into(),
                function,
            },
            noise: None,
            noise_mode: NoiseMode::Additive,
        }
    }

    pub fn noise(mut self, noise: Distribution) -> Result<Self, GenerationError> {
        if !noise.is_numeric() {
            return Err(GenerationError::invalid(format!(
                "noise distribution '{}' must be numeric",
                noise.name()
            )));
        }
        self.noise = Some(noise);
        Ok(self)
    }

    pub fn noise_mode(mut self, mode: NoiseMode) -> Self {
        self.noise_mode = mode;
        self
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn combine(&self) -> &Combine {
        &self.combine
    }

    pub(crate) fn produce(
        &self,
        node: &str,
        parent_columns: &ParentColumns<'_>,
        rows: usize,
        rng: &mut RandomSource,
    ) -> Result<Vec<Value>, GenerationError> {
        let inputs = parent_columns.require(node, &self.parents, rows)?;

        let mut row_values = vec![0.0; inputs.len()];
        let mut output = Vec::with_capacity(rows);
        for row in 0..rows {
            let noise = self.noise.as_ref().map(|noise| noise.sample_f64(rng));

            let mut has_null = false;
            for ((slot, column), parent) in row_values.iter_mut().zip(&inputs).zip(&self.parents) {
                match &column[row] {
                    Value::Null => has_null = true,
                    value => {
                        *slot = value.as_f64().ok_or_else(|| {
                            GenerationError::invalid(format!(
                                "node '{node}': parent '{parent}' has a non-numeric value at row {row}"
                            ))
                        })?;
                    }
                }
            }
            if has_null {
                output.push(Value::Null);
                continue;
            }

            let combined = self.combine.apply(&row_values);
            let value = match (noise, self.noise_mode) {
                (None, _) => combined,
                (Some(noise), NoiseMode::Additive) => combined + noise,
                (Some(noise), NoiseMode::Multiplicative) => combined * noise,
            };
            output.push(Value::Float(value));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn floats(values: &[f64]) -> Vec<Value> {
        values.iter().copied().map(Value::Float).collect()
    }

    #[test]
    fn linear_combination_with_intercept() {
        let x = floats(&[1.0, 2.0, 3.0]);
        let z = floats(&[0.5, 0.0, -1.0]);
        let mut parents = ParentColumns::new();
        parents.insert("x", &x);
        parents.insert("z", &z);

        let generator = FunctionalGenerator::linear([("x", 2.0), ("z", 4.0)], 1.0).unwrap();
        let mut rng = RandomSource::from_seed(0);
        let output = generator.produce("y", &parents, 3, &mut rng).unwrap();
        assert_eq!(output, floats(&[5.0, 5.0, 3.0]));
    }

    #[test]
    fn null_parent_propagates() {
        let x = vec![Value::Float(1.0), Value::Null];
        let mut parents = ParentColumns::new();
        parents.insert("x", &x);

        let generator = FunctionalGenerator::linear([("x", 1.0)], 0.0).unwrap();
        let mut rng = RandomSource::from_seed(0);
        let output = generator.produce("y", &parents, 2, &mut rng).unwrap();
        assert_eq!(output, vec![Value::Float(1.0), Value::Null]);
    }

    #[test]
    fn text_parent_is_rejected() {
        let x = vec![Value::from("high")];
        let mut parents = ParentColumns::new();
        parents.insert("x", &x);

        let generator = FunctionalGenerator::linear([("x", 1.0)], 0.0).unwrap();
        let mut rng = RandomSource::from_seed(0);
        let err = generator.produce("y", &parents, 1, &mut rng).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidParameter(_)));
    }

    #[test]
    fn missing_parent_column_is_reported() {
        let generator = FunctionalGenerator::linear([("x", 1.0)], 0.0).unwrap();
        let mut rng = RandomSource::from_seed(0);
        let err = generator
            .produce("y", &ParentColumns::new(), 4, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::MissingParentData { ref node, ref parent } if node == "y" && parent == "x"
        ));
    }

    #[test]
    fn multiplicative_noise_scales() {
        let x = floats(&[2.0, 4.0]);
        let mut parents = ParentColumns::new();
        parents.insert("x", &x);

        let generator = FunctionalGenerator::linear([("x", 1.0)], 0.0)
            .unwrap()
            .noise(Distribution::constant(3.0))
            .unwrap()
            .noise_mode(NoiseMode::Multiplicative);
        let mut rng = RandomSource::from_seed(0);
        let output = generator.produce("y", &parents, 2, &mut rng).unwrap();
        assert_eq!(output, floats(&[6.0, 12.0]));
    }

    #[test]
    fn named_function_combines_parents() {
        let a = floats(&[1.0, 5.0]);
        let b = floats(&[3.0, 2.0]);
        let mut parents = ParentColumns::new();
        parents.insert("a", &a);
        parents.insert("b", &b);

        let generator = FunctionalGenerator::with_function(
            ["a", "b"],
            "max",
            Arc::new(|values: &[f64]| values.iter().copied().fold(f64::MIN, f64::max)),
        );
        let mut rng = RandomSource::from_seed(0);
        let output = generator.produce("c", &parents, 2, &mut rng).unwrap();
        assert_eq!(output, floats(&[3.0, 5.0]));
    }

    #[test]
    fn text_noise_is_rejected() {
        let generator = FunctionalGenerator::linear([("x", 1.0)], 0.0).unwrap();
        assert!(generator.noise(Distribution::constant("loud")).is_err());
        assert!(FunctionalGenerator::linear([("x", f64::NAN)], 0.0).is_err());
    }
}

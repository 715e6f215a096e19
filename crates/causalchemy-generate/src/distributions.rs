use causalchemy_plan::DistributionSpec;
use rand::Rng;

use crate::errors::GenerationError;
use crate::params::{ParamKind, ParamSpec, validate_params};
use crate::random::RandomSource;
use crate::value::{Value, ValueKind};

/// Parametric distribution sampled by independent nodes and noise terms.
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std: f64 },
    IntUniform { min: i64, max: i64 },
    Bernoulli { p: f64 },
    Exponential { rate: f64 },
    Categorical {
        classes: Vec<Value>,
        cumulative: Vec<f64>,
    },
    Constant(Value),
}

impl Distribution {
    pub fn uniform(low: f64, high: f64) -> Result<Self, GenerationError> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(GenerationError::invalid(format!(
                "uniform: low ({low}) must be finite and below high ({high})"
            )));
        }
        if !(high - low).is_finite() {
            return Err(GenerationError::invalid(format!(
                "uniform: range {low}..{high} is too wide to sample"
            )));
        }
        Ok(Distribution::Uniform { low, high })
    }

    pub fn normal(mean: f64, std: f64) -> Result<Self, GenerationError> {
        if !mean.is_finite() || !std.is_finite() {
            return Err(GenerationError::invalid("normal: mean and std must be finite"));
        }
        if std < 0.0 {
            return Err(GenerationError::invalid(format!(
                "normal: std must be >= 0, got {std}"
            )));
        }
        Ok(Distribution::Normal { mean, std })
    }

    pub fn int_uniform(min: i64, max: i64) -> Result<Self, GenerationError> {
        if min > max {
            return Err(GenerationError::invalid(format!(
                "int_uniform: min ({min}) must be <= max ({max})"
            )));
        }
        Ok(Distribution::IntUniform { min, max })
    }

    pub fn bernoulli(p: f64) -> Result<Self, GenerationError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(GenerationError::invalid(format!(
                "bernoulli: p must be in [0, 1], got {p}"
            )));
        }
        Ok(Distribution::Bernoulli { p })
    }

    pub fn exponential(rate: f64) -> Result<Self, GenerationError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(GenerationError::invalid(format!(
                "exponential: rate must be > 0, got {rate}"
            )));
        }
        Ok(Distribution::Exponential { rate })
    }

    /// Weighted choice among `classes`; uniform when `weights` is omitted.
    ///
    /// Classes must share one kind: all numeric, all text or all boolean.
    pub fn categorical(
        classes: Vec<Value>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, GenerationError> {
        if classes.is_empty() {
            return Err(GenerationError::invalid("categorical: classes must not be empty"));
        }
        if classes.iter().any(Value::is_null) {
            return Err(GenerationError::invalid("categorical: classes must not be null"));
        }
        let first = class_kind(&classes[0]);
        if classes.iter().any(|class| class_kind(class) != first) {
            return Err(GenerationError::invalid(
                "categorical: classes must all be numbers, all strings or all booleans",
            ));
        }

        let weights = weights.unwrap_or_else(|| vec![1.0; classes.len()]);
        if weights.len() != classes.len() {
            return Err(GenerationError::invalid(format!(
                "categorical: {} class(es) but {} weight(s)",
                classes.len(),
                weights.len()
            )));
        }
        if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
            return Err(GenerationError::invalid(
                "categorical: weights must be finite and >= 0",
            ));
        }

        let mut total = 0.0;
        let cumulative: Vec<f64> = weights
            .iter()
            .map(|weight| {
                total += weight;
                total
            })
            .collect();
        if total <= 0.0 {
            return Err(GenerationError::invalid("categorical: weights must not all be zero"));
        }

        Ok(Distribution::Categorical {
            classes,
            cumulative,
        })
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Distribution::Constant(value.into())
    }

    /// Parse a named distribution with its JSON params. `ctx` prefixes error
    /// messages.
    pub fn from_spec(spec: &DistributionSpec, ctx: &str) -> Result<Self, GenerationError> {
        Self::parse_spec(spec).map_err(|err| match err {
            GenerationError::InvalidParameter(message) => {
                GenerationError::InvalidParameter(format!("{ctx}: {message}"))
            }
            other => other,
        })
    }

    fn parse_spec(spec: &DistributionSpec) -> Result<Self, GenerationError> {
        let ctx = spec.name.as_str();
        let params = spec.params.as_ref();
        match spec.name.as_str() {
            "uniform" => {
                let params = validate_params(
                    params,
                    &[
                        ParamSpec::new("low", ParamKind::Float, false),
                        ParamSpec::new("high", ParamKind::Float, false),
                    ],
                    ctx,
                )?;
                Self::uniform(
                    params.get_f64("low").unwrap_or(0.0),
                    params.get_f64("high").unwrap_or(1.0),
                )
            }
            "normal" => {
                let params = validate_params(
                    params,
                    &[
                        ParamSpec::new("mean", ParamKind::Float, false),
                        ParamSpec::new("std", ParamKind::Float, false),
                        ParamSpec::new("loc", ParamKind::Float, false),
                        ParamSpec::new("scale", ParamKind::Float, false),
                    ],
                    ctx,
                )?;
                Self::normal(
                    params.get_f64_alias(&["mean", "loc"], ctx)?.unwrap_or(0.0),
                    params.get_f64_alias(&["std", "scale"], ctx)?.unwrap_or(1.0),
                )
            }
            "int_uniform" => {
                let params = validate_params(
                    params,
                    &[
                        ParamSpec::new("min", ParamKind::Int, false),
                        ParamSpec::new("max", ParamKind::Int, false),
                    ],
                    ctx,
                )?;
                Self::int_uniform(
                    params.get_i64("min").unwrap_or(0),
                    params.get_i64("max").unwrap_or(100),
                )
            }
            "bernoulli" => {
                let params = validate_params(
                    params,
                    &[ParamSpec::new("p", ParamKind::Float, false)],
                    ctx,
                )?;
                Self::bernoulli(params.get_f64("p").unwrap_or(0.5))
            }
            "exponential" => {
                let params = validate_params(
                    params,
                    &[ParamSpec::new("rate", ParamKind::Float, false)],
                    ctx,
                )?;
                Self::exponential(params.get_f64("rate").unwrap_or(1.0))
            }
            "categorical" => {
                let params = validate_params(
                    params,
                    &[
                        ParamSpec::new("classes", ParamKind::Array, true),
                        ParamSpec::new("weights", ParamKind::Array, false),
                    ],
                    ctx,
                )?;
                let classes = params
                    .get_array("classes")
                    .unwrap_or_default()
                    .iter()
                    .map(|class| {
                        Value::from_json(class).ok_or_else(|| {
                            GenerationError::invalid(format!("{ctx}: classes must be scalars"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let weights = params.get_f64_array("weights", ctx)?;
                Self::categorical(classes, weights)
            }
            "constant" => {
                let params = validate_params(
                    params,
                    &[ParamSpec::new("value", ParamKind::Scalar, true)],
                    ctx,
                )?;
                let value = params
                    .get("value")
                    .and_then(Value::from_json)
                    .ok_or_else(|| GenerationError::invalid(format!("{ctx}: value must be a scalar")))?;
                Ok(Self::Constant(value))
            }
            other => Err(GenerationError::invalid(format!(
                "unknown distribution '{other}'"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Uniform { .. } => "uniform",
            Distribution::Normal { .. } => "normal",
            Distribution::IntUniform { .. } => "int_uniform",
            Distribution::Bernoulli { .. } => "bernoulli",
            Distribution::Exponential { .. } => "exponential",
            Distribution::Categorical { .. } => "categorical",
            Distribution::Constant(_) => "constant",
        }
    }

    /// Kind of cell every sample has. Mixed integer and float classes read
    /// as floats.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            Distribution::Uniform { .. }
            | Distribution::Normal { .. }
            | Distribution::Exponential { .. } => ValueKind::Float,
            Distribution::IntUniform { .. } => ValueKind::Int,
            Distribution::Bernoulli { .. } => ValueKind::Bool,
            Distribution::Categorical { classes, .. } => {
                let kinds: Vec<ValueKind> = classes.iter().filter_map(Value::kind).collect();
                if kinds.contains(&ValueKind::Float) {
                    ValueKind::Float
                } else {
                    kinds.first().copied().unwrap_or(ValueKind::Text)
                }
            }
            Distribution::Constant(value) => value.kind().unwrap_or(ValueKind::Text),
        }
    }

    /// Whether every sample has a numeric view, as noise terms require.
    pub fn is_numeric(&self) -> bool {
        match self {
            Distribution::Categorical { classes, .. } => {
                classes.iter().all(|class| class.as_f64().is_some())
            }
            Distribution::Constant(value) => value.as_f64().is_some(),
            _ => true,
        }
    }

    pub fn sample(&self, rng: &mut RandomSource) -> Value {
        match self {
            Distribution::Uniform { low, high } => Value::Float(low + (high - low) * rng.unit()),
            Distribution::Normal { mean, std } => {
                Value::Float(mean + std * rng.standard_normal())
            }
            Distribution::IntUniform { min, max } => Value::Int(rng.random_range(*min..=*max)),
            Distribution::Bernoulli { p } => Value::Bool(rng.random_bool(*p)),
            Distribution::Exponential { rate } => Value::Float(-rng.open_unit().ln() / rate),
            Distribution::Categorical {
                classes,
                cumulative,
            } => {
                let total = cumulative.last().copied().unwrap_or(0.0);
                let roll = rng.unit() * total;
                let index = cumulative
                    .iter()
                    .position(|bound| roll < *bound)
                    .unwrap_or(classes.len() - 1);
                classes[index].clone()
            }
            Distribution::Constant(value) => value.clone(),
        }
    }

    pub fn sample_n(&self, rows: usize, rng: &mut RandomSource) -> Vec<Value> {
        (0..rows).map(|_| self.sample(rng)).collect()
    }

    /// Numeric draw; `NaN` when the distribution is not numeric.
    pub fn sample_f64(&self, rng: &mut RandomSource) -> f64 {
        self.sample(rng).as_f64().unwrap_or(f64::NAN)
    }

    /// Theoretical mean, when the distribution is numeric.
    pub fn mean(&self) -> Option<f64> {
        match self {
            Distribution::Uniform { low, high } => Some((low + high) / 2.0),
            Distribution::Normal { mean, .. } => Some(*mean),
            Distribution::IntUniform { min, max } => Some((*min as f64 + *max as f64) / 2.0),
            Distribution::Bernoulli { p } => Some(*p),
            Distribution::Exponential { rate } => Some(1.0 / rate),
            Distribution::Categorical {
                classes,
                cumulative,
            } => {
                let total = cumulative.last().copied()?;
                let mut previous = 0.0;
                let mut mean = 0.0;
                for (class, bound) in classes.iter().zip(cumulative) {
                    mean += class.as_f64()? * (bound - previous) / total;
                    previous = *bound;
                }
                Some(mean)
            }
            Distribution::Constant(value) => value.as_f64(),
        }
    }

    /// Theoretical variance, for the continuous and binary families.
    pub fn variance(&self) -> Option<f64> {
        match self {
            Distribution::Uniform { low, high } => Some((high - low).powi(2) / 12.0),
            Distribution::Normal { std, .. } => Some(std * std),
            Distribution::IntUniform { min, max } => {
                let span = (*max as f64 - *min as f64) + 1.0;
                Some((span * span - 1.0) / 12.0)
            }
            Distribution::Bernoulli { p } => Some(p * (1.0 - p)),
            Distribution::Exponential { rate } => Some(1.0 / (rate * rate)),
            Distribution::Constant(value) => value.as_f64().map(|_| 0.0),
            Distribution::Categorical { .. } => None,
        }
    }
}

#[derive(PartialEq, Eq)]
enum ClassKind {
    Number,
    Text,
    Bool,
    Null,
}

fn class_kind(value: &Value) -> ClassKind {
    match value {
        Value::Int(_) | Value::Float(_) => ClassKind::Number,
        Value::Text(_) => ClassKind::Text,
        Value::Bool(_) => ClassKind::Bool,
        Value::Null => ClassKind::Null,
    }
}

#[cfg(test)]
mod tests {
    use causalchemy_plan::KNOWN_DISTRIBUTIONS;
    use serde_json::json;

    use super::*;

    fn spec(name: &str, params: serde_json::Value) -> DistributionSpec {
        DistributionSpec::new(name, Some(params))
    }

    fn sample_mean(distribution: &Distribution, rows: usize, seed: u64) -> f64 {
        let mut rng = RandomSource::from_seed(seed);
        let values = distribution.sample_n(rows, &mut rng);
        values.iter().filter_map(Value::as_f64).sum::<f64>() / rows as f64
    }

    #[test]
    fn every_known_name_parses_with_defaults() {
        for name in KNOWN_DISTRIBUTIONS {
            let params = match *name {
                "categorical" => Some(json!({ "classes": ["a", "b"] })),
                "constant" => Some(json!({ "value": 3 })),
                _ => None,
            };
            let distribution = Distribution::from_spec(&DistributionSpec::new(*name, params), "x")
                .unwrap_or_else(|err| panic!("{name}: {err}"));
            assert_eq!(distribution.name(), *name);
        }
    }

    #[test]
    fn unknown_name_is_invalid_parameter() {
        let err = Distribution::from_spec(&spec("zipf", json!({})), "x").unwrap_err();
        assert!(matches!(err, GenerationError::InvalidParameter(_)));
    }

    #[test]
    fn rejects_out_of_domain_parameters() {
        assert!(Distribution::normal(0.0, -1.0).is_err());
        assert!(Distribution::uniform(2.0, 1.0).is_err());
        assert!(Distribution::uniform(-1e308, 1e308).is_err());
        assert!(Distribution::int_uniform(5, 1).is_err());
        assert!(Distribution::bernoulli(1.5).is_err());
        assert!(Distribution::exponential(0.0).is_err());
        assert!(Distribution::categorical(vec![], None).is_err());
        assert!(
            Distribution::categorical(vec![Value::Int(1), Value::from("a")], None).is_err()
        );
        assert!(
            Distribution::categorical(vec![Value::Int(1), Value::Int(2)], Some(vec![1.0])).is_err()
        );
        assert!(
            Distribution::categorical(vec![Value::Int(1)], Some(vec![0.0])).is_err()
        );
    }

    #[test]
    fn normal_accepts_loc_scale_aliases() {
        let distribution =
            Distribution::from_spec(&spec("normal", json!({ "loc": 2.0, "scale": 0.5 })), "x")
                .unwrap();
        assert_eq!(distribution, Distribution::Normal { mean: 2.0, std: 0.5 });

        let err = Distribution::from_spec(&spec("normal", json!({ "mean": 1.0, "loc": 2.0 })), "x");
        assert!(err.is_err());
    }

    #[test]
    fn zero_std_normal_is_exactly_the_mean() {
        let distribution = Distribution::normal(4.25, 0.0).unwrap();
        let mut rng = RandomSource::from_seed(11);
        for value in distribution.sample_n(100, &mut rng) {
            assert_eq!(value, Value::Float(4.25));
        }
    }

    #[test]
    fn value_kinds_follow_the_family() {
        assert_eq!(Distribution::normal(0.0, 1.0).unwrap().value_kind(), ValueKind::Float);
        assert_eq!(Distribution::int_uniform(0, 3).unwrap().value_kind(), ValueKind::Int);
        assert_eq!(Distribution::bernoulli(0.5).unwrap().value_kind(), ValueKind::Bool);
        let text = Distribution::categorical(vec![Value::from("1"), Value::from("true")], None);
        assert_eq!(text.unwrap().value_kind(), ValueKind::Text);
        let mixed = Distribution::categorical(vec![Value::Int(1), Value::Float(2.5)], None);
        assert_eq!(mixed.unwrap().value_kind(), ValueKind::Float);
    }

    #[test]
    fn wide_uniform_stays_finite() {
        let distribution = Distribution::uniform(-1e307, 1e308).unwrap();
        let mut rng = RandomSource::from_seed(17);
        for value in distribution.sample_n(500, &mut rng) {
            let value = value.as_f64().unwrap();
            assert!(value.is_finite());
            assert!((-1e307..1e308).contains(&value));
        }

        let err = Distribution::from_spec(
            &spec("uniform", json!({ "low": -1e308, "high": 1e308 })),
            "x",
        )
        .unwrap_err();
        assert!(err.to_string().contains("too wide"));
    }

    #[test]
    fn samples_stay_in_support() {
        let mut rng = RandomSource::from_seed(5);
        let uniform = Distribution::uniform(-1.0, 1.0).unwrap();
        let ints = Distribution::int_uniform(3, 6).unwrap();
        let expo = Distribution::exponential(2.0).unwrap();
        for _ in 0..2_000 {
            let value = uniform.sample(&mut rng).as_f64().unwrap();
            assert!((-1.0..1.0).contains(&value));
            let value = ints.sample(&mut rng).as_i64().unwrap();
            assert!((3..=6).contains(&value));
            assert!(expo.sample(&mut rng).as_f64().unwrap() >= 0.0);
        }
    }

    #[test]
    fn sample_means_converge() {
        let cases = [
            Distribution::normal(10.0, 2.0).unwrap(),
            Distribution::uniform(0.0, 4.0).unwrap(),
            Distribution::exponential(0.5).unwrap(),
            Distribution::bernoulli(0.3).unwrap(),
            Distribution::int_uniform(0, 10).unwrap(),
        ];
        for distribution in cases {
            let expected = distribution.mean().unwrap();
            let std = distribution.variance().unwrap().sqrt();
            let observed = sample_mean(&distribution, 20_000, 99);
            // Five standard errors.
            let tolerance = 5.0 * std / (20_000_f64).sqrt();
            assert!(
                (observed - expected).abs() < tolerance,
                "{}: mean {observed} vs {expected}",
                distribution.name()
            );
        }
    }

    #[test]
    fn categorical_follows_weights() {
        let distribution = Distribution::from_spec(
            &spec("categorical", json!({ "classes": ["a", "b"], "weights": [3, 1] })),
            "x",
        )
        .unwrap();
        let mut rng = RandomSource::from_seed(21);
        let values = distribution.sample_n(10_000, &mut rng);
        let share_a = values.iter().filter(|value| value.as_str() == Some("a")).count() as f64
            / values.len() as f64;
        assert!((share_a - 0.75).abs() < 0.03, "share of 'a' was {share_a}");
    }

    #[test]
    fn categorical_zero_weight_class_never_drawn() {
        let distribution =
            Distribution::categorical(vec![Value::Int(1), Value::Int(2)], Some(vec![0.0, 1.0]))
                .unwrap();
        let mut rng = RandomSource::from_seed(2);
        assert!(distribution
            .sample_n(500, &mut rng)
            .iter()
            .all(|value| *value == Value::Int(2)));
        assert_eq!(distribution.mean(), Some(2.0));
    }

    #[test]
    fn constant_needs_a_scalar() {
        let err = Distribution::from_spec(&spec("constant", json!({ "value": [1] })), "x");
        assert!(err.is_err());
        let constant = Distribution::from_spec(&spec("constant", json!({ "value": "on" })), "x")
            .unwrap();
        assert!(!constant.is_numeric());
    }
}

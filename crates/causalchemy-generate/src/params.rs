use serde_json::{Map, Value};

use crate::errors::GenerationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    Array,
    /// Any JSON scalar.
    Scalar,
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn new(key: &'static str, kind: ParamKind, required: bool) -> Self {
        Self {
            key,
            kind,
            required,
        }
    }
}

pub struct ParamMap<'a> {
    map: Option<&'a Map<String, Value>>,
}

/// Check `params` against the accepted keys and kinds.
pub fn validate_params<'a>(
    params: Option<&'a Value>,
    specs: &[ParamSpec],
    ctx: &str,
) -> Result<ParamMap<'a>, GenerationError> {
    let map = match params {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            return Err(GenerationError::invalid(format!(
                "{ctx}: params must be a JSON object"
            )));
        }
    };

    if let Some(map) = map {
        for (key, value) in map {
            let Some(spec) = specs.iter().find(|spec| spec.key == key.as_str()) else {
                return Err(GenerationError::invalid(format!(
                    "{ctx}: unknown param '{key}'"
                )));
            };
            validate_kind(ctx, key, spec.kind, value)?;
        }
    }

    for spec in specs {
        if spec.required && !map.is_some_and(|map| map.contains_key(spec.key)) {
            return Err(GenerationError::invalid(format!(
                "{ctx}: missing required param '{}'",
                spec.key
            )));
        }
    }

    Ok(ParamMap { map })
}

impl<'a> ParamMap<'a> {
    pub fn contains(&self, key: &str) -> bool {
        self.map.is_some_and(|map| map.contains_key(key))
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|map| map.get(key))
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|value| value.as_i64())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|value| value.as_f64())
    }

    pub fn get_array(&self, key: &str) -> Option<&'a [Value]> {
        self.get(key)
            .and_then(|value| value.as_array())
            .map(|values| values.as_slice())
    }

    /// Numeric array; `None` when absent, error when any entry is not a number.
    pub fn get_f64_array(&self, key: &str, ctx: &str) -> Result<Option<Vec<f64>>, GenerationError> {
        let Some(values) = self.get_array(key) else {
            return Ok(None);
        };
        values
            .iter()
            .map(|value| {
                value.as_f64().ok_or_else(|| {
                    GenerationError::invalid(format!("{ctx}: '{key}' must contain only numbers"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// First present key among aliases, rejecting conflicting spellings.
    pub fn get_f64_alias(&self, keys: &[&str], ctx: &str) -> Result<Option<f64>, GenerationError> {
        let present: Vec<&str> = keys.iter().copied().filter(|key| self.contains(key)).collect();
        if present.len() > 1 {
            return Err(GenerationError::invalid(format!(
                "{ctx}: params {} are aliases, set only one",
                present.join(" and ")
            )));
        }
        Ok(present.first().and_then(|key| self.get_f64(key)))
    }
}

fn validate_kind(ctx: &str, key: &str, kind: ParamKind, value: &Value) -> Result<(), GenerationError> {
    let valid = match kind {
        ParamKind::Int => value.as_i64().is_some(),
        ParamKind::Float => value.as_f64().is_some(),
        ParamKind::Array => value.is_array(),
        ParamKind::Scalar => !value.is_array() && !value.is_object(),
    };

    if valid {
        Ok(())
    } else {
        Err(GenerationError::invalid(format!(
            "{ctx}: invalid value for param '{key}'"
        )))
    }
}

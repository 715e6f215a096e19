use serde::{Deserialize, Serialize};

/// One generated cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Cell type a column holds, used to read CSV cells back without guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Booleans count as 0 or 1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Null | Value::Text(_) => None,
        }
    }

    /// `None` for nulls.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Text(_) => Some(ValueKind::Text),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// CSV cell text; nulls become empty cells.
    pub fn to_csv(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Text(value) => value.clone(),
        }
    }

    /// Parse a CSV cell written by [`Value::to_csv`]. Integral floats come
    /// back as `Int`.
    pub fn from_csv(cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match cell {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(value) = cell.parse::<i64>() {
            return Value::Int(value);
        }
        match cell.parse::<f64>() {
            Ok(value) => Value::Float(value),
            Err(_) => Value::Text(cell.to_string()),
        }
    }

    /// Parse a CSV cell of a column known to hold `kind`. Text cells are
    /// kept verbatim; a cell that does not parse as `kind` falls back to
    /// [`Value::from_csv`].
    pub fn from_csv_as(cell: &str, kind: ValueKind) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        let parsed = match kind {
            ValueKind::Text => Some(Value::Text(cell.to_string())),
            ValueKind::Bool => cell.parse::<bool>().ok().map(Value::Bool),
            ValueKind::Int => cell.parse::<i64>().ok().map(Value::Int),
            ValueKind::Float => cell.parse::<f64>().ok().map(Value::Float),
        };
        parsed.unwrap_or_else(|| Value::from_csv(cell))
    }

    pub(crate) fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(value) => Some(Value::Bool(*value)),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Value::Int)
                .or_else(|| number.as_f64().map(Value::Float)),
            serde_json::Value::String(value) => Some(Value::Text(value.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

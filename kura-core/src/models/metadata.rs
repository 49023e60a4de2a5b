use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form metadata attached to conversations and summaries.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Scalar::Null),
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => Some(Scalar::Number(n.clone())),
            serde_json::Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }
}

/// Token form used when counting values.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write_number(f, n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Integral floats print without a fraction, so `1.0` and `1` share a token.
fn write_number(f: &mut fmt::Formatter<'_>, n: &serde_json::Number) -> fmt::Result {
    match n.as_f64() {
        Some(x) if n.is_f64() && x.fract() == 0.0 && x.abs() < MAX_SAFE_INTEGER => {
            write!(f, "{}", x as i64)
        }
        _ => write!(f, "{}", n),
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Metadata values are either a scalar or a flat list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    List(Vec<Scalar>),
    Scalar(Scalar),
}

impl MetadataValue {
    /// Returns `None` for nested objects or lists of non-scalars.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Array(items) => items
                .iter()
                .map(Scalar::from_json)
                .collect::<Option<Vec<_>>>()
                .map(MetadataValue::List),
            other => Scalar::from_json(other).map(MetadataValue::Scalar),
        }
    }

    /// The whole value as one token: list elements joined with `", "`.
    pub fn joined_token(&self) -> String {
        match self {
            MetadataValue::Scalar(s) => s.to_string(),
            MetadataValue::List(items) => items
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

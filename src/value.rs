use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value that can cross the boundary between the harness and a driver program
///
/// Test case arguments and expected outputs are restricted to numbers, booleans,
/// strings and homogeneous numeric arrays (see [`Value::is_argument_kind`]).
/// Values parsed back from a driver may nest arrays arbitrarily.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Array(Vec<Value>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("empty output")]
    Empty,
    #[error("output is not a canonical value: {0}")]
    Malformed(String),
    #[error("null is not a supported value")]
    Null,
    #[error("objects are not supported values")]
    Object,
    #[error("number {0} is not representable")]
    Number(String),
}

impl Value {
    /// Parses text under the canonical literal grammar
    ///
    /// The grammar is the JSON literal subset: numbers, quoted strings,
    /// `true`/`false` and bracketed arrays of the same, recursively.
    pub fn parse_canonical(text: &str) -> Result<Self, ValueError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValueError::Empty);
        }
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|_| ValueError::Malformed(abbreviate(text)))?;
        Value::try_from(json)
    }

    /// Encodes the value in the canonical text form drivers print
    pub fn to_canonical(&self) -> String {
        serde_json::Value::from(self.clone()).to_string()
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Whether this value may appear as a test case argument or expected output
    pub fn is_argument_kind(&self) -> bool {
        match self {
            Value::Int(_) | Value::Bool(_) | Value::Str(_) => true,
            Value::Float(f) => f.is_finite(),
            Value::Array(items) => items
                .iter()
                .all(|v| matches!(v, Value::Int(_)) || matches!(v, Value::Float(f) if f.is_finite())),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
        }
    }
}

/// Deep structural equality
///
/// Numbers compare by value, so `5` equals `5.0`. Arrays compare element-wise
/// and order-sensitively. Strings compare byte-for-byte.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                int_equals_float(*a, *b)
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

/// Exact comparison; casting the integer to `f64` would round above 2^53
fn int_equals_float(i: i64, f: f64) -> bool {
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f) && f as i64 == i
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = ValueError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Null => Err(ValueError::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(ValueError::Number(n.to_string()))
                }
            }
            serde_json::Value::String(s) => Ok(Value::Str(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            serde_json::Value::Object(_) => Err(ValueError::Object),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(i) => serde_json::Value::from(i),
            // Non-finite floats have no JSON form
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Str(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

fn abbreviate(text: &str) -> String {
    const MAX_CHARS: usize = 80;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}

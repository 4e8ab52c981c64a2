//! Driver program generation
//!
//! A driver wraps the submitted source with an entry point that calls the
//! exercise function on literal arguments and prints the result in the
//! canonical encoding. Arguments never reach the driver as raw text: each one
//! goes through the target language's literal renderer, which either produces
//! a well-escaped literal or refuses the value.

use std::fmt::Write;

use thiserror::Error;

use super::{Language, LanguageAdapter};
use crate::catalog::is_identifier;
use crate::value::Value;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("{language} drivers cannot pass {kind} arguments")]
    UnsupportedValue {
        language: Language,
        kind: &'static str,
    },
    #[error("non-finite numbers cannot be passed as arguments")]
    NonFinite,
    #[error("'{0}' is not a valid function name")]
    InvalidFunctionName(String),
}

/// A function call with every argument already rendered as a literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub function: String,
    pub arguments: Vec<String>,
}

impl Call {
    pub fn argument_list(&self) -> String {
        self.arguments.join(", ")
    }

    pub fn expression(&self) -> String {
        format!("{}({})", self.function, self.argument_list())
    }
}

/// Builds the complete driver source for one test case
///
/// Identical inputs always yield byte-identical output.
pub fn generate(
    adapter: &dyn LanguageAdapter,
    source: &str,
    function_name: &str,
    arguments: &[Value],
) -> Result<String, GenerateError> {
    let call = build_call(adapter, function_name, arguments)?;
    Ok(adapter.render_driver(source, &call))
}

pub fn build_call(
    adapter: &dyn LanguageAdapter,
    function_name: &str,
    arguments: &[Value],
) -> Result<Call, GenerateError> {
    if !is_identifier(function_name) {
        return Err(GenerateError::InvalidFunctionName(function_name.to_string()));
    }
    let arguments = arguments
        .iter()
        .map(|value| adapter.literal(value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Call {
        function: adapter.function_name(function_name),
        arguments,
    })
}

/// camelCase to snake_case: every ASCII uppercase letter becomes `_` plus
/// its lowercase form (`findMax` -> `find_max`)
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub(super) fn float_literal(f: f64) -> Result<String, GenerateError> {
    if !f.is_finite() {
        return Err(GenerateError::NonFinite);
    }
    // Debug formatting always keeps a decimal point or exponent
    Ok(format!("{f:?}"))
}

/// Double-quoted literal valid in Python, Java and C++
///
/// Control characters use three-digit octal escapes, which all three
/// languages read identically and which cannot swallow a following digit.
pub(super) fn c_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Element type of a numeric array argument, widened as needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum NumericKind {
    Int,
    Long,
    Double,
}

/// Classifies an array for languages with statically typed arrays
pub(super) fn numeric_array_kind(
    language: Language,
    items: &[Value],
) -> Result<NumericKind, GenerateError> {
    let mut kind = NumericKind::Int;
    for item in items {
        match item {
            Value::Int(i) if i32::try_from(*i).is_ok() => {}
            Value::Int(_) => {
                if kind == NumericKind::Int {
                    kind = NumericKind::Long;
                }
            }
            Value::Float(f) if f.is_finite() => kind = NumericKind::Double,
            Value::Float(_) => return Err(GenerateError::NonFinite),
            other => {
                return Err(GenerateError::UnsupportedValue {
                    language,
                    kind: match other {
                        Value::Array(_) => "nested array",
                        Value::Str(_) => "string array",
                        Value::Bool(_) => "boolean array",
                        _ => "mixed array",
                    },
                });
            }
        }
    }
    Ok(kind)
}

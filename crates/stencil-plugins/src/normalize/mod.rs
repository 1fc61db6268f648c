//! All-or-nothing coercion of loosely typed sequences.
//!
//! Plugin responses arrive as untyped JSON. When every element of a sequence
//! is the same scalar kind the sequence is re-expressed with that concrete
//! element type; otherwise it is returned untouched, nulls and ordering
//! included. There is no partial conversion.

use serde::Serialize;
use serde_json::Value;

/// A plugin result sequence after normalisation.
///
/// Serialises as a plain JSON array regardless of variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Normalized {
    /// Every element was text.
    Strings(Vec<String>),
    /// Every element was a number representable as `i64`.
    Integers(Vec<i64>),
    /// Every element was a number only representable as `f64`.
    Floats(Vec<f64>),
    /// Every element was a boolean.
    Booleans(Vec<bool>),
    /// The original elements, unchanged.
    Untyped(Vec<Value>),
}

impl Normalized {
    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Strings(items) => items.len(),
            Self::Integers(items) => items.len(),
            Self::Floats(items) => items.len(),
            Self::Booleans(items) => items.len(),
            Self::Untyped(items) => items.len(),
        }
    }

    /// Returns `true` when the sequence has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` when the elements were given a concrete type.
    #[must_use]
    pub const fn is_typed(&self) -> bool {
        !matches!(self, Self::Untyped(_))
    }

    /// Converts back into generic JSON values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::Strings(items) => items.into_iter().map(Value::from).collect(),
            Self::Integers(items) => items.into_iter().map(Value::from).collect(),
            Self::Floats(items) => items.into_iter().map(Value::from).collect(),
            Self::Booleans(items) => items.into_iter().map(Value::from).collect(),
            Self::Untyped(items) => items,
        }
    }
}

/// Scalar kinds eligible for a uniformly typed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Text,
    Integer,
    Float,
    Boolean,
}

fn kind_of(value: &Value) -> Option<ScalarKind> {
    match value {
        Value::String(_) => Some(ScalarKind::Text),
        Value::Bool(_) => Some(ScalarKind::Boolean),
        Value::Number(number) if number.is_i64() => Some(ScalarKind::Integer),
        Value::Number(number) if number.is_f64() => Some(ScalarKind::Float),
        // Nulls, containers, and integers beyond `i64` never convert.
        Value::Null | Value::Number(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Re-expresses `values` as a uniformly typed sequence when every element
/// shares one scalar kind, or returns them unchanged otherwise.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use stencil_plugins::normalize::{Normalized, normalize};
///
/// let typed = normalize(vec![json!("things"), json!("and"), json!("stuff")]);
/// assert_eq!(typed, Normalized::Strings(vec!["things".into(), "and".into(), "stuff".into()]));
///
/// let untouched = normalize(vec![json!("things"), json!(null), json!("stuff")]);
/// assert!(!untouched.is_typed());
/// ```
#[must_use]
pub fn normalize(values: Vec<Value>) -> Normalized {
    let Some(kind) = values.first().and_then(kind_of) else {
        return Normalized::Untyped(values);
    };
    if values.iter().any(|value| kind_of(value) != Some(kind)) {
        return Normalized::Untyped(values);
    }

    match kind {
        ScalarKind::Text => Normalized::Strings(
            values
                .into_iter()
                .filter_map(|value| match value {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
        ),
        ScalarKind::Integer => {
            Normalized::Integers(values.iter().filter_map(Value::as_i64).collect())
        }
        ScalarKind::Float => Normalized::Floats(values.iter().filter_map(Value::as_f64).collect()),
        ScalarKind::Boolean => {
            Normalized::Booleans(values.iter().filter_map(Value::as_bool).collect())
        }
    }
}

/// Wraps a bare `data` value so callers always receive a sequence.
///
/// Arrays pass through; any other value (including `null`) becomes a
/// one-element sequence.
#[must_use]
pub fn into_sequence(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        other => vec![other],
    }
}

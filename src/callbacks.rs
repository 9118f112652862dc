//! Callback contracts used by widgets, operators and fields.
//!
//! Callbacks are plain function pointers: pure, synchronous, and total over
//! well-formed input. Values are raw JSON as stored in the tree.

use crate::config::{FieldSettings, OperatorDef};
use serde_json::{Map, Value};

/// Widget value formatter for the human query string.
/// `is_for_display` selects a display string over a serialized one.
pub type FormatValueFn = fn(value: &Value, is_for_display: bool) -> String;

/// Widget value formatter for the SQL where rendering.
pub type SqlFormatValueFn = fn(value: &Value) -> String;

/// Widget value formatter for the MongoDB filter rendering.
pub type MongoFormatValueFn = fn(value: &Value) -> Value;

/// Operator formatter for text renderings (SQL where, query string).
pub type FormatOpFn = fn(
    field: &str,
    op: &str,
    value: &FormattedValue,
    op_def: &OperatorDef,
    options: Option<&Map<String, Value>>,
) -> String;

/// Operator formatter for the MongoDB filter rendering.
///
/// With `use_expr` the operands reference other fields or functions: `field`
/// is `$name` and the result is an aggregation expression placed under
/// `$expr`.
pub type MongoFormatOpFn =
    fn(field: &str, op: &str, value: &Value, use_expr: bool, op_def: &OperatorDef) -> Value;

/// Field value validator: `None` when valid, otherwise a user-facing message.
pub type ValidateValueFn = fn(value: &Value, settings: &FieldSettings) -> Option<String>;

/// Right hand side of a rule after value formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum FormattedValue {
    Single(String),
    Many(Vec<String>),
}

impl FormattedValue {
    pub fn first(&self) -> Option<&str> {
        match self {
            FormattedValue::Single(s) => Some(s),
            FormattedValue::Many(items) => items.first().map(String::as_str),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            FormattedValue::Single(s) if index == 0 => Some(s),
            FormattedValue::Single(_) => None,
            FormattedValue::Many(items) => items.get(index).map(String::as_str),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FormattedValue::Single(_) => 1,
            FormattedValue::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for FormattedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormattedValue::Single(s) => write!(f, "{}", s),
            FormattedValue::Many(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// String form of a value: strings unquoted, everything else as JSON.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_string)
            .collect::<Vec<_>>()
            .join(", "),
        v => v.to_string(),
    }
}

/// JSON-serialized form of a value.
pub fn json_string(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// SQL literal for a scalar: quoted strings, bare numbers and booleans.
pub fn sql_escape(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Null => "NULL".to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(sql_escape).collect();
            format!("({})", parts.join(", "))
        }
        v => v.to_string(),
    }
}

/// Strip the quotes `sql_escape` put around a string literal.
pub fn sql_unquote(literal: &str) -> String {
    match literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => literal.to_string(),
    }
}

//! String-to-JSON coercion for parameter values.
//!
//! Parameters arrive as strings; the schema's type hint decides how each value
//! is read before it is validated.

use crate::contract::schema::type_hint;
use crate::contract::CompiledSchema;
use serde_json::{Number, Value};

/// Reads raw parameter values as the JSON instance the schema expects.
///
/// Arrays accept repeated values (`?tag=a&tag=b`) or a single comma-separated
/// value (`?tag=a,b`). Other types use the first value.
pub(crate) fn coerce_values(values: &[String], schema: &CompiledSchema, json_content: bool) -> Value {
    let Some(first) = values.first() else {
        return Value::Null;
    };
    if json_content {
        return serde_json::from_str(first).unwrap_or_else(|_| Value::String(first.clone()));
    }

    match schema.type_hint() {
        Some("array") => {
            let item_hint = schema.schema().get("items").and_then(type_hint);
            let raw: Vec<&str> = if values.len() == 1 {
                first.split(',').collect()
            } else {
                values.iter().map(String::as_str).collect()
            };
            Value::Array(raw.into_iter().map(|v| coerce_scalar(v, item_hint)).collect())
        }
        Some("object") => {
            serde_json::from_str(first).unwrap_or_else(|_| Value::String(first.clone()))
        }
        hint => coerce_scalar(first, hint),
    }
}

/// Reads one string as `hint`, falling back to a JSON string when it does not parse.
pub(crate) fn coerce_scalar(raw: &str, hint: Option<&str>) -> Value {
    let parsed = match hint {
        Some("integer") => raw.parse::<i64>().ok().map(Value::from),
        Some("number") => raw
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)),
        Some("boolean") => match raw {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        Some("null") if raw.is_empty() || raw == "null" => Some(Value::Null),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

#![deny(missing_docs)]

//! # Schema Normalization
//!
//! Rewrites OpenAPI schema dialect quirks into plain JSON Schema before
//! compilation. These functions are conservative and only rewrite fields that
//! the JSON Schema validator would otherwise misread.

use serde_json::{json, Map, Value};

/// Keys whose values are instance data, never schemas.
const DATA_KEYS: [&str; 5] = ["example", "examples", "default", "enum", "const"];

/// Normalizes `nullable` / `x-nullable` schema flags into JSON Schema null unions.
///
/// OpenAPI 3.0 uses `nullable: true` (and Swagger-era documents often use `x-nullable: true`).
/// JSON Schema encodes nullability via `type: [T, "null"]`.
///
/// The flag is rewritten into a `type` union where possible, or the schema is wrapped in
/// `anyOf` when no explicit `type` is present.
pub(crate) fn normalize_nullable_schemas(value: &mut Value) {
    if let Value::Object(map) = value {
        if let Some(replacement) = apply_nullable_flag(map) {
            *value = replacement;
        }
    }

    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if DATA_KEYS.contains(&key.as_str()) {
                    continue;
                }
                normalize_nullable_schemas(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                normalize_nullable_schemas(v);
            }
        }
        _ => {}
    }
}

/// Keywords whose value is a single schema.
const SCHEMA_KEYS: [&str; 12] = [
    "items",
    "additionalItems",
    "additionalProperties",
    "unevaluatedItems",
    "unevaluatedProperties",
    "contains",
    "propertyNames",
    "not",
    "if",
    "then",
    "else",
    "contentSchema",
];

/// Keywords whose value maps names to schemas.
const SCHEMA_MAP_KEYS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    "definitions",
    "$defs",
];

/// Keywords whose value is a list of schemas.
const SCHEMA_LIST_KEYS: [&str; 4] = ["allOf", "anyOf", "oneOf", "prefixItems"];

/// Replaces boolean schemas (`true` / `false`) with object schemas.
///
/// Draft 4 has no boolean schemas, so documents compiled against it need them spelled out.
/// Only schema positions are rewritten; boolean keyword values such as `uniqueItems` or a
/// boolean `additionalProperties` are left alone.
///
/// - `true` becomes `{}` (accepts any instance)
/// - `false` becomes an unsatisfiable object schema
pub(crate) fn normalize_boolean_schemas(value: &mut Value) {
    match value {
        Value::Bool(flag) => *value = bool_schema_replacement(*flag),
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                let key = key.as_str();
                if SCHEMA_KEYS.contains(&key) {
                    // `additionalProperties: false` is a keyword value in every draft.
                    let keyword_bool = matches!(key, "additionalProperties" | "additionalItems");
                    if !(keyword_bool && v.is_boolean()) {
                        normalize_schema_or_list(v);
                    }
                } else if SCHEMA_MAP_KEYS.contains(&key) {
                    if let Some(schemas) = v.as_object_mut() {
                        schemas.values_mut().for_each(normalize_boolean_schemas);
                    }
                } else if SCHEMA_LIST_KEYS.contains(&key) {
                    if let Some(schemas) = v.as_array_mut() {
                        schemas.iter_mut().for_each(normalize_boolean_schemas);
                    }
                }
            }
        }
        _ => {}
    }
}

/// `items` may hold one schema or (Draft 4) a list of them.
fn normalize_schema_or_list(value: &mut Value) {
    match value {
        Value::Array(schemas) => schemas.iter_mut().for_each(normalize_boolean_schemas),
        other => normalize_boolean_schemas(other),
    }
}

/// Closes object schemas that declare `properties` without `additionalProperties`.
///
/// Members of `allOf` / `anyOf` / `oneOf` are left open: closing them would reject
/// properties contributed by sibling branches.
pub(crate) fn close_open_objects(value: &mut Value) {
    close_open_objects_inner(value, false);
}

fn close_open_objects_inner(value: &mut Value, in_composition: bool) {
    match value {
        Value::Object(map) => {
            if !in_composition
                && map.contains_key("properties")
                && !map.contains_key("additionalProperties")
                && !map.contains_key("allOf")
            {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            for (key, v) in map.iter_mut() {
                if DATA_KEYS.contains(&key.as_str()) {
                    continue;
                }
                match key.as_str() {
                    "allOf" | "anyOf" | "oneOf" => {
                        if let Some(items) = v.as_array_mut() {
                            for item in items.iter_mut() {
                                close_open_objects_inner(item, true);
                            }
                        }
                    }
                    "properties" => {
                        if let Some(props) = v.as_object_mut() {
                            for prop in props.values_mut() {
                                close_open_objects_inner(prop, false);
                            }
                        }
                    }
                    _ => close_open_objects_inner(v, false),
                }
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                close_open_objects_inner(v, false);
            }
        }
        _ => {}
    }
}

fn bool_schema_replacement(flag: bool) -> Value {
    if flag {
        Value::Object(Map::new())
    } else {
        json!({ "not": {} })
    }
}

fn apply_nullable_flag(map: &mut Map<String, Value>) -> Option<Value> {
    let mut nullable = false;
    for flag in ["nullable", "x-nullable"] {
        // Only boolean flags; a property map may contain a field named `nullable`.
        if let Some(set) = map.get(flag).and_then(Value::as_bool) {
            nullable |= set;
            map.remove(flag);
        }
    }

    if !nullable {
        return None;
    }

    if let Some(enum_vals) = map.get_mut("enum").and_then(|v| v.as_array_mut()) {
        if !enum_vals.iter().any(Value::is_null) {
            enum_vals.push(Value::Null);
        }
    }

    if let Some(type_val) = map.get_mut("type") {
        match type_val {
            Value::String(s) => {
                if s != "null" {
                    *type_val = Value::Array(vec![
                        Value::String(s.clone()),
                        Value::String("null".to_string()),
                    ]);
                }
            }
            Value::Array(arr) => {
                let has_null = arr.iter().any(|v| v.as_str() == Some("null"));
                if !has_null {
                    arr.push(Value::String("null".to_string()));
                }
            }
            _ => {}
        }
        return None;
    }

    let original = Value::Object(map.clone());
    Some(json!({ "anyOf": [original, { "type": "null" }] }))
}

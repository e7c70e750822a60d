//! # Schema Compilation
//!
//! Turns OpenAPI schema objects into compiled JSON Schema validators.
//!
//! Local `$ref`s are inlined before compilation, so each compiled schema is
//! self-contained. A reference that points back into a schema already being
//! expanded, or that nests deeper than [`MAX_REF_DEPTH`], is replaced by the
//! permissive schema `{}`. External references are treated the same way.

use crate::contract::normalization::{
    close_open_objects, normalize_boolean_schemas, normalize_nullable_schemas,
};
use crate::contract::pointer::{normalize_ref_to_local, resolve_local};
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Maximum nesting of `$ref` expansion.
pub(crate) const MAX_REF_DEPTH: usize = 32;

const DATA_KEYS: [&str; 5] = ["example", "examples", "default", "enum", "const"];

/// JSON Schema dialect used to compile contract schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDraft {
    /// Draft 4 (OpenAPI 3.0).
    Draft4,
    /// Draft 7.
    Draft7,
    /// Draft 2019-09.
    Draft201909,
    /// Draft 2020-12 (OpenAPI 3.1 default).
    Draft202012,
}

impl SchemaDraft {
    fn as_jsonschema(self) -> jsonschema::Draft {
        match self {
            SchemaDraft::Draft4 => jsonschema::Draft::Draft4,
            SchemaDraft::Draft7 => jsonschema::Draft::Draft7,
            SchemaDraft::Draft201909 => jsonschema::Draft::Draft201909,
            SchemaDraft::Draft202012 => jsonschema::Draft::Draft202012,
        }
    }

    /// Maps a `$schema` / `jsonSchemaDialect` URI to a draft.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri.trim_end_matches('#') {
            "https://spec.openapis.org/oas/3.1/dialect/base"
            | "https://json-schema.org/draft/2020-12/schema" => Some(SchemaDraft::Draft202012),
            "https://json-schema.org/draft/2019-09/schema" => Some(SchemaDraft::Draft201909),
            "http://json-schema.org/draft-07/schema" => Some(SchemaDraft::Draft7),
            "http://json-schema.org/draft-04/schema" => Some(SchemaDraft::Draft4),
            _ => None,
        }
    }

    /// Draft implied by the document: `jsonSchemaDialect`, then the `openapi` version.
    pub(crate) fn for_document(document: &Value) -> Self {
        if let Some(draft) = document
            .get("jsonSchemaDialect")
            .and_then(Value::as_str)
            .and_then(SchemaDraft::from_uri)
        {
            return draft;
        }
        match document.get("openapi").and_then(Value::as_str) {
            Some(version) if version.starts_with("3.0") => SchemaDraft::Draft4,
            _ => SchemaDraft::Draft202012,
        }
    }
}

/// A schema ready to validate instances.
#[derive(Clone)]
pub struct CompiledSchema {
    schema: Arc<Value>,
    validator: Arc<jsonschema::Validator>,
}

impl CompiledSchema {
    /// The normalized, self-contained schema that was compiled.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validation failures as `(instance path, message)` pairs, in validator order.
    pub fn errors(&self, instance: &Value) -> Vec<SchemaViolation> {
        if self.is_valid(instance) {
            return Vec::new();
        }
        self.validator
            .iter_errors(instance)
            .map(|error| SchemaViolation {
                instance_path: error.instance_path.as_str().to_string(),
                message: error.to_string(),
            })
            .collect()
    }

    /// True when `instance` satisfies the schema.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// First non-null `type` of the schema.
    pub fn type_hint(&self) -> Option<&str> {
        type_hint(&self.schema)
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// One schema failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer into the instance; empty for the root.
    pub instance_path: String,
    /// Validator message.
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} (at {})", self.message, self.instance_path)
        }
    }
}

/// First non-null type named by `schema`, looking through `anyOf` / `oneOf` / `allOf`.
pub(crate) fn type_hint(schema: &Value) -> Option<&str> {
    match schema.get("type") {
        Some(Value::String(t)) if t != "null" => return Some(t.as_str()),
        Some(Value::Array(types)) => {
            if let Some(t) = types.iter().filter_map(Value::as_str).find(|t| *t != "null") {
                return Some(t);
            }
        }
        _ => {}
    }
    ["anyOf", "oneOf", "allOf"]
        .iter()
        .filter_map(|key| schema.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(type_hint)
}

/// Compiles schema objects found in one document.
pub(crate) struct SchemaCompiler<'a> {
    document: &'a Value,
    self_uris: Vec<&'a str>,
    draft: SchemaDraft,
    nullable_keyword: bool,
    strict_additional_properties: bool,
}

impl<'a> SchemaCompiler<'a> {
    pub(crate) fn new(document: &'a Value, retrieval_uri: Option<&'a str>) -> Self {
        let mut self_uris = Vec::new();
        if let Some(uri) = document.get("$self").and_then(Value::as_str) {
            self_uris.push(uri);
        }
        if let Some(uri) = retrieval_uri {
            self_uris.push(uri);
        }
        let nullable_keyword = document
            .get("openapi")
            .and_then(Value::as_str)
            .is_some_and(|v| v.starts_with("3.0"));
        Self {
            document,
            self_uris,
            draft: SchemaDraft::for_document(document),
            nullable_keyword,
            strict_additional_properties: false,
        }
    }

    pub(crate) fn with_draft(mut self, draft: Option<SchemaDraft>) -> Self {
        if let Some(draft) = draft {
            self.draft = draft;
        }
        self
    }

    pub(crate) fn with_strict_additional_properties(mut self, strict: bool) -> Self {
        self.strict_additional_properties = strict;
        self
    }

    pub(crate) fn draft(&self) -> SchemaDraft {
        self.draft
    }

    /// Resolves a `$ref`-bearing object (parameter, response, header, ...) to its target.
    pub(crate) fn resolve_object(&self, value: &'a Value) -> &'a Value {
        let mut current = value;
        for _ in 0..MAX_REF_DEPTH {
            let Some(target) = current
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| normalize_ref_to_local(r, &self.self_uris))
                .and_then(|local| resolve_local(self.document, &local))
            else {
                break;
            };
            current = target;
        }
        current
    }

    /// Inlines, normalizes and compiles the schema found at `pointer`.
    pub(crate) fn compile(&self, schema: &Value, pointer: &str) -> ConfigResult<CompiledSchema> {
        let mut stack = Vec::new();
        let mut schema = self.inline(schema, &mut stack);

        if self.nullable_keyword {
            normalize_nullable_schemas(&mut schema);
        }
        if self.draft == SchemaDraft::Draft4 {
            normalize_boolean_schemas(&mut schema);
        }
        if self.strict_additional_properties {
            close_open_objects(&mut schema);
        }

        trace!(pointer, "compiling schema");
        let validator = jsonschema::options()
            .with_draft(self.draft.as_jsonschema())
            .build(&schema)
            .map_err(|e| ConfigError::SchemaCompilation {
                pointer: pointer.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CompiledSchema {
            schema: Arc::new(schema),
            validator: Arc::new(validator),
        })
    }

    fn inline(&self, value: &Value, stack: &mut Vec<String>) -> Value {
        match value {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    return self.inline_ref(reference, map, stack);
                }
                let mut out = Map::with_capacity(map.len());
                for (key, v) in map {
                    let v = if DATA_KEYS.contains(&key.as_str()) {
                        v.clone()
                    } else {
                        self.inline(v, stack)
                    };
                    out.insert(key.clone(), v);
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.inline(v, stack)).collect())
            }
            other => other.clone(),
        }
    }

    fn inline_ref(&self, reference: &str, map: &Map<String, Value>, stack: &mut Vec<String>) -> Value {
        let Some(local) = normalize_ref_to_local(reference, &self.self_uris) else {
            trace!(reference, "external reference left unchecked");
            return Value::Object(Map::new());
        };
        if stack.len() >= MAX_REF_DEPTH || stack.contains(&local) {
            trace!(reference, "recursive reference left unchecked");
            return Value::Object(Map::new());
        }
        let Some(target) = resolve_local(self.document, &local) else {
            trace!(reference, "unresolvable reference left unchecked");
            return Value::Object(Map::new());
        };

        stack.push(local);
        let resolved = self.inline(target, stack);

        let siblings: Map<String, Value> = map
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "$ref" | "description" | "summary"))
            .map(|(k, v)| (k.clone(), self.inline(v, stack)))
            .collect();
        stack.pop();

        // 3.0 ignores `$ref` siblings; 3.1 applies them alongside the target.
        if siblings.is_empty() || self.nullable_keyword {
            if self.nullable_keyword && map.get("nullable").and_then(Value::as_bool) == Some(true) {
                if let Value::Object(mut target) = resolved {
                    target.insert("nullable".to_string(), Value::Bool(true));
                    return Value::Object(target);
                }
            }
            return resolved;
        }
        let mut merged = siblings;
        merged.insert("allOf".to_string(), Value::Array(vec![resolved]));
        Value::Object(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(version: &str) -> Value {
        json!({
            "openapi": version,
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "required": ["name", "email"],
                        "properties": {
                            "name": { "type": "string" },
                            "email": { "type": "string" },
                            "manager": { "$ref": "#/components/schemas/User" }
                        }
                    },
                    "Nickname": { "type": "string", "nullable": true }
                }
            }
        })
    }

    #[test]
    fn test_draft_for_document() {
        assert_eq!(SchemaDraft::for_document(&document("3.0.3")), SchemaDraft::Draft4);
        assert_eq!(SchemaDraft::for_document(&document("3.1.0")), SchemaDraft::Draft202012);

        let mut doc = document("3.1.0");
        doc["jsonSchemaDialect"] = json!("http://json-schema.org/draft-07/schema#");
        assert_eq!(SchemaDraft::for_document(&doc), SchemaDraft::Draft7);
    }

    #[test]
    fn test_recursive_ref_compiles() {
        let doc = document("3.0.3");
        let compiler = SchemaCompiler::new(&doc, None);
        let compiled = compiler
            .compile(&json!({ "$ref": "#/components/schemas/User" }), "#/test")
            .unwrap();

        assert!(compiled.is_valid(&json!({ "name": "a", "email": "b", "manager": 5 })));
        let errors = compiled.errors(&json!({ "name": "a" }));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("email"));
        assert_eq!(compiled.type_hint(), Some("object"));
    }

    #[test]
    fn test_nullable_ref_in_3_0() {
        let doc = document("3.0.3");
        let compiler = SchemaCompiler::new(&doc, None);
        let compiled = compiler
            .compile(&json!({ "$ref": "#/components/schemas/Nickname" }), "#/test")
            .unwrap();
        assert!(compiled.is_valid(&json!(null)));
        assert!(compiled.is_valid(&json!("nick")));
        assert!(!compiled.is_valid(&json!(3)));
        assert_eq!(compiled.type_hint(), Some("string"));
    }

    #[test]
    fn test_strict_mode_rejects_unknown_properties() {
        let doc = document("3.1.0");
        let schema = json!({ "$ref": "#/components/schemas/User" });

        let lenient = SchemaCompiler::new(&doc, None).compile(&schema, "#/x").unwrap();
        let strict = SchemaCompiler::new(&doc, None)
            .with_strict_additional_properties(true)
            .compile(&schema, "#/x")
            .unwrap();

        let instance = json!({ "name": "a", "email": "b", "extra": true });
        assert!(lenient.is_valid(&instance));
        assert!(!strict.is_valid(&instance));
    }

    #[test]
    fn test_external_ref_is_permissive() {
        let doc = document("3.1.0");
        let compiled = SchemaCompiler::new(&doc, None)
            .compile(&json!({ "$ref": "common.yaml#/Error" }), "#/x")
            .unwrap();
        assert!(compiled.is_valid(&json!({ "anything": [1, 2] })));
    }

    #[test]
    fn test_invalid_schema_reports_pointer() {
        let doc = document("3.1.0");
        let err = SchemaCompiler::new(&doc, None)
            .compile(&json!({ "type": 12 }), "#/paths/~1users/get")
            .unwrap_err();
        match err {
            ConfigError::SchemaCompilation { pointer, .. } => {
                assert_eq!(pointer, "#/paths/~1users/get")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_type_hint_through_composition() {
        let schema = json!({ "anyOf": [{ "type": "null" }, { "type": ["integer", "null"] }] });
        assert_eq!(type_hint(&schema), Some("integer"));
        assert_eq!(type_hint(&json!({})), None);
    }
}

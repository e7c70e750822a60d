//! Body media selection and decoding, shared by request and response checks.

use crate::contract::media::{
    is_form_media_type, is_json_media_type, is_text_media_type, select_default_media,
    select_media_for_content_type,
};
use crate::contract::schema::type_hint;
use crate::contract::{CompiledSchema, MediaDef};
use crate::engine::findings::{Direction, Findings};
use crate::engine::params::coerce_scalar;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Validates `body` against the media entry selected by `content_type`.
pub(crate) fn check_body(
    findings: &mut Findings,
    content: &IndexMap<String, MediaDef>,
    content_type: Option<&str>,
    body: &str,
) {
    let selected = match content_type {
        Some(actual) => select_media_for_content_type(content, actual),
        None => select_default_media(content),
    };
    let Some((media_key, media)) = selected else {
        if let Some(actual) = content_type {
            let allowed: Vec<&str> = content.keys().map(String::as_str).collect();
            findings.push(
                "contentType.notAllowed",
                format!(
                    "{} Content-Type '{}' does not match any allowed types. Must be one of: [{}]",
                    direction_label(findings.direction()),
                    actual,
                    allowed.join(", ")
                ),
            );
        }
        return;
    };
    let Some(schema) = &media.schema else {
        return;
    };

    let effective = content_type.unwrap_or(media_key);
    match decode(effective, body, schema) {
        Decoded::Instance(instance) => {
            for violation in schema.errors(&instance) {
                findings.push("body.schema", violation.to_string());
            }
        }
        Decoded::InvalidJson(reason) => {
            findings.push("body.invalidJson", format!("Unable to parse JSON body: {}", reason));
        }
        Decoded::Skipped => {}
    }
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Request => "Request",
        Direction::Response => "Response",
    }
}

enum Decoded {
    Instance(Value),
    InvalidJson(String),
    Skipped,
}

fn decode(media_type: &str, body: &str, schema: &CompiledSchema) -> Decoded {
    if is_json_media_type(media_type) {
        return match serde_json::from_str(body) {
            Ok(value) => Decoded::Instance(value),
            Err(e) => Decoded::InvalidJson(e.to_string()),
        };
    }
    if is_form_media_type(media_type) {
        return Decoded::Instance(decode_form(body, schema.schema()));
    }
    if is_text_media_type(media_type) {
        return Decoded::Instance(Value::String(body.to_string()));
    }
    Decoded::Skipped
}

/// Decodes `a=1&b=x&b=y` into an object, reading each field by its property type.
fn decode_form(body: &str, schema: &Value) -> Value {
    let properties = schema.get("properties").and_then(Value::as_object);
    let mut fields: IndexMap<String, Vec<String>> = IndexMap::new();
    for (name, value) in url::form_urlencoded::parse(body.as_bytes()) {
        fields
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let mut out = Map::new();
    for (name, values) in fields {
        let property = properties.and_then(|p| p.get(&name));
        let hint = property.and_then(type_hint);
        let value = if hint == Some("array") || values.len() > 1 {
            let item_hint = property
                .and_then(|p| p.get("items"))
                .and_then(type_hint);
            Value::Array(values.iter().map(|v| coerce_scalar(v, item_hint)).collect())
        } else {
            values
                .first()
                .map(|v| coerce_scalar(v, hint))
                .unwrap_or(Value::Null)
        };
        out.insert(name, value);
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::schema::SchemaCompiler;
    use serde_json::json;

    fn content(media: &str, schema: Value) -> IndexMap<String, MediaDef> {
        let doc = json!({ "openapi": "3.1.0" });
        let compiled = SchemaCompiler::new(&doc, None).compile(&schema, "#/test").unwrap();
        let mut content = IndexMap::new();
        content.insert(media.to_string(), MediaDef { schema: Some(compiled) });
        content
    }

    fn keys(findings: Findings) -> Vec<String> {
        findings.into_inner().into_iter().map(|f| f.key).collect()
    }

    #[test]
    fn test_json_schema_violation() {
        let content = content(
            "application/json",
            json!({ "type": "object", "required": ["email"] }),
        );
        let mut findings = Findings::new(Direction::Request);
        check_body(&mut findings, &content, Some("application/json"), r#"{"name":"A"}"#);
        assert_eq!(keys(findings), ["validation.request.body.schema"]);
    }

    #[test]
    fn test_invalid_json() {
        let content = content("application/json", json!({ "type": "object" }));
        let mut findings = Findings::new(Direction::Response);
        check_body(&mut findings, &content, None, "{not json");
        assert_eq!(keys(findings), ["validation.response.body.invalidJson"]);
    }

    #[test]
    fn test_content_type_not_allowed() {
        let content = content("application/json", json!({ "type": "object" }));
        let mut findings = Findings::new(Direction::Request);
        check_body(&mut findings, &content, Some("text/plain"), "hello");
        let items = findings.into_inner();
        assert_eq!(items[0].key, "validation.request.contentType.notAllowed");
        assert!(items[0].text.starts_with("Request Content-Type 'text/plain'"));
    }

    #[test]
    fn test_form_body_is_coerced() {
        let content = content(
            "application/x-www-form-urlencoded",
            json!({
                "type": "object",
                "required": ["age"],
                "properties": { "age": { "type": "integer" }, "tags": { "type": "array" } }
            }),
        );
        let mut findings = Findings::new(Direction::Request);
        check_body(
            &mut findings,
            &content,
            Some("application/x-www-form-urlencoded"),
            "age=42&tags=a",
        );
        assert!(findings.into_inner().is_empty());

        let mut findings = Findings::new(Direction::Request);
        check_body(
            &mut findings,
            &content,
            Some("application/x-www-form-urlencoded"),
            "age=old",
        );
        assert_eq!(keys(findings), ["validation.request.body.schema"]);
    }

    #[test]
    fn test_binary_media_skipped() {
        let content = content("application/octet-stream", json!({ "type": "string", "maxLength": 1 }));
        let mut findings = Findings::new(Direction::Response);
        check_body(&mut findings, &content, Some("application/octet-stream"), "long payload");
        assert!(findings.into_inner().is_empty());
    }
}

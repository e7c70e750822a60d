//! # Specification Source
//!
//! Reads the contract document from a file path, a `file://` URL, an `http(s)` URL
//! or an inline string, and parses YAML or JSON into a [`serde_json::Value`].

use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Where the contract document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    /// A file path or URL.
    Location(String),
    /// The document text itself.
    Inline(String),
}

impl SpecSource {
    /// Location used in error messages and as the document's retrieval URI.
    pub fn describe(&self) -> &str {
        match self {
            SpecSource::Location(location) => location,
            SpecSource::Inline(_) => "<inline>",
        }
    }
}

/// Reads and parses the document.
pub(crate) fn load_document(source: &SpecSource) -> ConfigResult<Value> {
    let text = match source {
        SpecSource::Inline(text) => text.clone(),
        SpecSource::Location(location) => read_location(location)?,
    };
    parse_document(&text).map_err(|reason| ConfigError::SpecUnreadable {
        location: source.describe().to_string(),
        reason,
    })
}

/// Parses YAML (a superset of JSON) into a JSON value.
pub(crate) fn parse_document(text: &str) -> Result<Value, String> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| format!("Failed to parse OpenAPI YAML: {}", e))?;
    Ok(yaml_to_json(yaml))
}

fn read_location(location: &str) -> ConfigResult<String> {
    let unreadable = |reason: String| ConfigError::SpecUnreadable {
        location: location.to_string(),
        reason,
    };

    match classify(location) {
        LocationKind::File(path) => {
            debug!(path = %path.display(), "reading OpenAPI specification from file");
            std::fs::read_to_string(&path).map_err(|e| unreadable(e.to_string()))
        }
        LocationKind::Remote(url) => fetch_remote(&url).map_err(unreadable),
        LocationKind::Unsupported(scheme) => {
            Err(unreadable(format!("Unsupported URL scheme '{}'", scheme)))
        }
    }
}

enum LocationKind {
    File(PathBuf),
    Remote(String),
    Unsupported(String),
}

fn classify(location: &str) -> LocationKind {
    match Url::parse(location) {
        Ok(url) => match url.scheme() {
            "file" => url
                .to_file_path()
                .map(LocationKind::File)
                .unwrap_or_else(|_| LocationKind::File(PathBuf::from(url.path()))),
            "http" | "https" => LocationKind::Remote(location.to_string()),
            // `C:\specs\api.yaml` parses as scheme `c`.
            scheme if scheme.len() == 1 => LocationKind::File(PathBuf::from(location)),
            scheme => LocationKind::Unsupported(scheme.to_string()),
        },
        Err(_) => LocationKind::File(Path::new(location).to_path_buf()),
    }
}

#[cfg(feature = "remote-spec")]
fn fetch_remote(url: &str) -> Result<String, String> {
    debug!(url, "fetching OpenAPI specification");
    let mut response = ureq::get(url).call().map_err(|e| e.to_string())?;
    response
        .body_mut()
        .read_to_string()
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "remote-spec"))]
fn fetch_remote(_url: &str) -> Result<String, String> {
    Err("remote specifications require the `remote-spec` feature".to_string())
}

/// Converts YAML into JSON, stringifying non-string mapping keys (`200:` becomes `"200"`).
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                if let Some(key) = yaml_key(key) {
                    map.insert(key, yaml_to_json(value));
                }
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Null => Some("null".to_string()),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_integer_keys_become_strings() {
        let doc = parse_document(
            r#"
paths:
  /users:
    get:
      responses:
        200:
          description: ok
        default:
          description: error
"#,
        )
        .unwrap();
        let responses = &doc["paths"]["/users"]["get"]["responses"];
        assert_eq!(responses["200"]["description"], "ok");
        assert!(responses.get("default").is_some());
    }

    #[test]
    fn test_json_text_parses() {
        let doc = parse_document(r#"{"openapi": "3.0.3", "paths": {}}"#).unwrap();
        assert_eq!(doc["openapi"], "3.0.3");
    }

    #[test]
    fn test_load_from_file_path_and_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "openapi: 3.1.0").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let doc = load_document(&SpecSource::Location(path.clone())).unwrap();
        assert_eq!(doc["openapi"], "3.1.0");

        let url = Url::from_file_path(file.path()).unwrap().to_string();
        let doc = load_document(&SpecSource::Location(url)).unwrap();
        assert_eq!(doc["openapi"], "3.1.0");
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = load_document(&SpecSource::Location("/no/such/openapi.yaml".into())).unwrap_err();
        match err {
            ConfigError::SpecUnreadable { location, .. } => {
                assert_eq!(location, "/no/such/openapi.yaml")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = load_document(&SpecSource::Location("ftp://host/spec.yaml".into())).unwrap_err();
        assert!(err.to_string().contains("Unsupported URL scheme 'ftp'"));
    }

    #[test]
    fn test_invalid_yaml_reports_inline_location() {
        let err = load_document(&SpecSource::Inline("paths: [unclosed".into())).unwrap_err();
        assert!(err.to_string().contains("<inline>"));
    }
}

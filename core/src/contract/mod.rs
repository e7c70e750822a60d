//! # Contract
//!
//! The compiled form of an OpenAPI 3.x document: every operation with its
//! parameters, request body and responses, schemas compiled up front.
//!
//! A [`Contract`] is immutable once built and is shared by every validation.

pub(crate) mod media;
pub(crate) mod normalization;
pub mod paths;
pub(crate) mod pointer;
pub mod schema;
pub(crate) mod source;

pub use paths::PathTemplate;
pub use schema::{CompiledSchema, SchemaDraft, SchemaViolation};
pub use source::SpecSource;

use crate::contract::pointer::escape_pointer_segment;
use crate::contract::schema::SchemaCompiler;
use crate::error::{ConfigError, ConfigResult};
use derive_more::Display;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

/// Operation keys of a Path Item Object, in document order of precedence.
const METHODS: [&str; 9] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace", "query",
];

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ParamLocation {
    /// Path template variable.
    #[display("path")]
    Path,
    /// Query string.
    #[display("query")]
    Query,
    /// Request header.
    #[display("header")]
    Header,
    /// Cookie.
    #[display("cookie")]
    Cookie,
}

impl ParamLocation {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }
}

/// A declared parameter.
#[derive(Debug, Clone)]
pub struct ParamDef {
    /// Parameter name.
    pub name: String,
    /// Location.
    pub location: ParamLocation,
    /// Whether the parameter must be present. Path parameters always are.
    pub required: bool,
    /// Value schema, from `schema` or from the single `content` entry.
    pub schema: Option<CompiledSchema>,
    /// The value is a serialized JSON document (`content: application/json`).
    pub json_content: bool,
}

/// A declared media type entry.
#[derive(Debug, Clone, Default)]
pub struct MediaDef {
    /// Schema of the payload; `None` accepts anything.
    pub schema: Option<CompiledSchema>,
}

/// A declared request body.
#[derive(Debug, Clone)]
pub struct BodyDef {
    /// Whether a body must be sent.
    pub required: bool,
    /// Media ranges to definitions, in document order.
    pub content: IndexMap<String, MediaDef>,
}

/// A declared response header.
#[derive(Debug, Clone)]
pub struct HeaderDef {
    /// Header name as written in the document.
    pub name: String,
    /// Whether the header must be present.
    pub required: bool,
    /// Value schema.
    pub schema: Option<CompiledSchema>,
}

/// A declared response.
#[derive(Debug, Clone, Default)]
pub struct ResponseDef {
    /// Media ranges to definitions; empty when the response declares no body.
    pub content: IndexMap<String, MediaDef>,
    /// Declared headers.
    pub headers: Vec<HeaderDef>,
}

/// A single operation (`method` + path template).
#[derive(Debug, Clone)]
pub struct OperationDef {
    /// Upper-case method.
    pub method: String,
    /// Path template the operation belongs to.
    pub path: String,
    /// `operationId`.
    pub operation_id: Option<String>,
    /// Path-level and operation-level parameters, operation-level winning.
    pub parameters: Vec<ParamDef>,
    /// Request body.
    pub request_body: Option<BodyDef>,
    /// Responses keyed by status code, range (`4XX`) or `default`.
    pub responses: IndexMap<String, ResponseDef>,
}

/// A path template and its operations.
#[derive(Debug, Clone)]
pub struct PathDef {
    /// Compiled template.
    pub template: PathTemplate,
    /// Operations keyed by upper-case method.
    pub operations: IndexMap<String, OperationDef>,
}

/// Outcome of looking up `(method, path)`.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// The operation and the decoded path parameters.
    Found {
        /// The matched operation.
        operation: &'a OperationDef,
        /// Path parameter values, percent-decoded.
        path_params: IndexMap<String, String>,
    },
    /// The path exists but not for this method.
    MethodNotAllowed {
        /// Matched template.
        template: &'a str,
        /// Methods the template does declare.
        allowed: Vec<&'a str>,
    },
    /// No template matches the path.
    PathMissing,
}

/// Compilation knobs.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// URI the document was read from, used to resolve self-referencing `$ref`s.
    pub retrieval_uri: Option<String>,
    /// Forced JSON Schema draft.
    pub draft: Option<SchemaDraft>,
    /// Close object schemas that do not mention `additionalProperties`.
    pub strict_additional_properties: bool,
    /// Base paths tried in addition to the ones derived from `servers`.
    pub extra_base_paths: Vec<String>,
}

/// The compiled document.
#[derive(Debug, Clone)]
pub struct Contract {
    paths: Vec<PathDef>,
    base_paths: Vec<String>,
    draft: SchemaDraft,
}

impl Contract {
    /// Validates the document version and compiles every operation.
    pub fn compile(document: &Value, options: &CompileOptions) -> ConfigResult<Self> {
        check_version(document)?;

        let compiler = SchemaCompiler::new(document, options.retrieval_uri.as_deref())
            .with_draft(options.draft)
            .with_strict_additional_properties(options.strict_additional_properties);

        let paths_obj = match document.get("paths") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(ConfigError::InvalidSpecification(
                    "'paths' must be an object".to_string(),
                ))
            }
        };

        let mut paths = Vec::with_capacity(paths_obj.map_or(0, |m| m.len()));
        for (template, item) in paths_obj.into_iter().flatten() {
            let item = compiler.resolve_object(item);
            let base_pointer = format!("#/paths/{}", escape_pointer_segment(template));
            let path_params = item.get("parameters");

            let mut operations = IndexMap::new();
            for method in METHODS {
                let Some(op) = item.get(method) else {
                    continue;
                };
                let pointer = format!("{}/{}", base_pointer, method);
                let def = compile_operation(
                    &compiler,
                    template,
                    method,
                    path_params,
                    op,
                    &pointer,
                )?;
                operations.insert(def.method.clone(), def);
            }

            paths.push(PathDef {
                template: PathTemplate::parse(template),
                operations,
            });
        }

        let mut base_paths = server_base_paths(document);
        for extra in &options.extra_base_paths {
            if !base_paths.contains(extra) {
                base_paths.push(extra.clone());
            }
        }

        let contract = Self {
            paths,
            base_paths,
            draft: compiler.draft(),
        };
        info!(
            paths = contract.paths.len(),
            operations = contract.operation_count(),
            draft = ?contract.draft,
            "compiled OpenAPI contract"
        );
        Ok(contract)
    }

    /// Base paths stripped from request paths before matching.
    pub fn base_paths(&self) -> &[String] {
        &self.base_paths
    }

    /// Draft schemas were compiled with.
    pub fn draft(&self) -> SchemaDraft {
        self.draft
    }

    /// Total number of operations.
    pub fn operation_count(&self) -> usize {
        self.paths.iter().map(|p| p.operations.len()).sum()
    }

    /// Looks up the operation for `method` and `path` (no query string).
    ///
    /// Base-path-stripped candidates are tried before the raw path. Within a
    /// candidate, matching templates are tried from most to fewest literal
    /// segments and the first one declaring `method` wins. The method is only
    /// reported as not allowed when no matching template declares it.
    pub fn resolve(&self, method: &str, path: &str) -> Resolution<'_> {
        let method = method.to_ascii_uppercase();
        let mut not_allowed = None;
        for candidate in paths::candidate_paths(path, &self.base_paths) {
            let mut matching: Vec<(&PathDef, IndexMap<String, String>)> = self
                .paths
                .iter()
                .filter_map(|def| def.template.matches(candidate).map(|params| (def, params)))
                .collect();
            // Stable: equally specific templates keep document order.
            matching.sort_by_key(|(def, _)| std::cmp::Reverse(def.template.literal_count()));

            for (def, path_params) in &matching {
                let def = *def;
                if let Some(operation) = def.operations.get(&method) {
                    debug!(candidate, template = def.template.as_str(), "resolved path");
                    return Resolution::Found {
                        operation,
                        path_params: path_params.clone(),
                    };
                }
            }
            if not_allowed.is_none() {
                not_allowed = matching.first().map(|&(def, _)| Resolution::MethodNotAllowed {
                    template: def.template.as_str(),
                    allowed: def.operations.keys().map(String::as_str).collect(),
                });
            }
        }
        not_allowed.unwrap_or(Resolution::PathMissing)
    }
}

fn check_version(document: &Value) -> ConfigResult<()> {
    if !document.is_object() {
        return Err(ConfigError::InvalidSpecification(
            "document root must be an object".to_string(),
        ));
    }
    if let Some(version) = document.get("swagger").and_then(Value::as_str) {
        return Err(ConfigError::InvalidSpecification(format!(
            "Unsupported OpenAPI version: {}. Only 3.x is supported",
            version
        )));
    }
    match document.get("openapi").and_then(Value::as_str) {
        Some(version) if version.starts_with("3.") => Ok(()),
        Some(version) => Err(ConfigError::InvalidSpecification(format!(
            "Unsupported OpenAPI version: {}. Only 3.x is supported",
            version
        ))),
        None => Err(ConfigError::InvalidSpecification(
            "missing 'openapi' version field".to_string(),
        )),
    }
}

fn compile_operation<'a>(
    compiler: &SchemaCompiler<'a>,
    template: &str,
    method: &str,
    path_params: Option<&'a Value>,
    op: &'a Value,
    pointer: &str,
) -> ConfigResult<OperationDef> {
    let mut parameters: Vec<ParamDef> = Vec::new();
    let sources = [
        (path_params, format!("#/paths/{}/parameters", escape_pointer_segment(template))),
        (op.get("parameters"), format!("{}/parameters", pointer)),
    ];
    for (list, list_pointer) in sources {
        let Some(list) = list.and_then(Value::as_array) else {
            continue;
        };
        for (i, raw) in list.iter().enumerate() {
            let param_pointer = format!("{}/{}", list_pointer, i);
            let Some(param) = compile_parameter(compiler, raw, &param_pointer)? else {
                continue;
            };
            // Operation-level definitions override path-level ones with the same name and location.
            parameters.retain(|p| !(p.name == param.name && p.location == param.location));
            parameters.push(param);
        }
    }

    let request_body = match op.get("requestBody") {
        Some(raw) => {
            let body = compiler.resolve_object(raw);
            Some(BodyDef {
                required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
                content: compile_content(
                    compiler,
                    body.get("content"),
                    &format!("{}/requestBody/content", pointer),
                )?,
            })
        }
        None => None,
    };

    let mut responses = IndexMap::new();
    if let Some(raw_responses) = op.get("responses").and_then(Value::as_object) {
        for (status, raw) in raw_responses {
            let response = compiler.resolve_object(raw);
            let response_pointer =
                format!("{}/responses/{}", pointer, escape_pointer_segment(status));
            let def = ResponseDef {
                content: compile_content(
                    compiler,
                    response.get("content"),
                    &format!("{}/content", response_pointer),
                )?,
                headers: compile_headers(compiler, response.get("headers"), &response_pointer)?,
            };
            responses.insert(status.clone(), def);
        }
    }

    Ok(OperationDef {
        method: method.to_ascii_uppercase(),
        path: template.to_string(),
        operation_id: op
            .get("operationId")
            .and_then(Value::as_str)
            .map(str::to_string),
        parameters,
        request_body,
        responses,
    })
}

fn compile_parameter<'a>(
    compiler: &SchemaCompiler<'a>,
    raw: &'a Value,
    pointer: &str,
) -> ConfigResult<Option<ParamDef>> {
    let param = compiler.resolve_object(raw);
    let (Some(name), Some(location)) = (
        param.get("name").and_then(Value::as_str),
        param
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParamLocation::parse),
    ) else {
        debug!(pointer, "skipping parameter without name or location");
        return Ok(None);
    };

    // Described by dedicated OpenAPI fields rather than header parameters.
    if location == ParamLocation::Header
        && ["accept", "content-type", "authorization"].contains(&name.to_ascii_lowercase().as_str())
    {
        return Ok(None);
    }

    let (schema, json_content) = compile_value_schema(compiler, param, pointer)?;
    Ok(Some(ParamDef {
        name: name.to_string(),
        location,
        required: location == ParamLocation::Path
            || param.get("required").and_then(Value::as_bool).unwrap_or(false),
        schema,
        json_content,
    }))
}

/// Schema of a parameter or header: `schema`, or the first `content` entry.
fn compile_value_schema(
    compiler: &SchemaCompiler<'_>,
    object: &Value,
    pointer: &str,
) -> ConfigResult<(Option<CompiledSchema>, bool)> {
    if let Some(schema) = object.get("schema") {
        let compiled = compiler.compile(schema, &format!("{}/schema", pointer))?;
        return Ok((Some(compiled), false));
    }
    let Some((media, entry)) = object
        .get("content")
        .and_then(Value::as_object)
        .and_then(|content| content.iter().next())
    else {
        return Ok((None, false));
    };
    let json = media::is_json_media_type(media);
    match entry.get("schema") {
        Some(schema) => {
            let schema_pointer = format!(
                "{}/content/{}/schema",
                pointer,
                escape_pointer_segment(media)
            );
            Ok((Some(compiler.compile(schema, &schema_pointer)?), json))
        }
        None => Ok((None, json)),
    }
}

fn compile_content(
    compiler: &SchemaCompiler<'_>,
    content: Option<&Value>,
    pointer: &str,
) -> ConfigResult<IndexMap<String, MediaDef>> {
    let mut out = IndexMap::new();
    let Some(content) = content.and_then(Value::as_object) else {
        return Ok(out);
    };
    for (media_type, entry) in content {
        let schema = match entry.get("schema") {
            Some(schema) => {
                let schema_pointer =
                    format!("{}/{}/schema", pointer, escape_pointer_segment(media_type));
                Some(compiler.compile(schema, &schema_pointer)?)
            }
            None => None,
        };
        out.insert(media_type.clone(), MediaDef { schema });
    }
    Ok(out)
}

fn compile_headers<'a>(
    compiler: &SchemaCompiler<'a>,
    headers: Option<&'a Value>,
    response_pointer: &str,
) -> ConfigResult<Vec<HeaderDef>> {
    let mut out = Vec::new();
    let Some(headers) = headers.and_then(Value::as_object) else {
        return Ok(out);
    };
    for (name, raw) in headers {
        if name.eq_ignore_ascii_case("content-type") {
            continue;
        }
        let header = compiler.resolve_object(raw);
        let pointer = format!("{}/headers/{}", response_pointer, escape_pointer_segment(name));
        let (schema, _) = compile_value_schema(compiler, header, &pointer)?;
        out.push(HeaderDef {
            name: name.clone(),
            required: header.get("required").and_then(Value::as_bool).unwrap_or(false),
            schema,
        });
    }
    Ok(out)
}

/// Path components of the document-level `servers` URLs, variables substituted with defaults.
fn server_base_paths(document: &Value) -> Vec<String> {
    let mut out = Vec::new();
    let Some(servers) = document.get("servers").and_then(Value::as_array) else {
        return out;
    };
    for server in servers {
        let Some(url) = server.get("url").and_then(Value::as_str) else {
            continue;
        };
        let mut url = url.to_string();
        if let Some(vars) = server.get("variables").and_then(Value::as_object) {
            for (name, var) in vars {
                if let Some(default) = var.get("default").and_then(Value::as_str) {
                    url = url.replace(&format!("{{{}}}", name), default);
                }
            }
        }
        let path = match Url::parse(&url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => {
                // Relative server URL, e.g. `/v1` or `//host/v1`.
                let without_authority = url
                    .strip_prefix("//")
                    .and_then(|rest| rest.find('/').map(|i| &rest[i..]))
                    .unwrap_or(&url);
                without_authority.to_string()
            }
        };
        let path = path.trim_end_matches('/');
        if !path.is_empty() && path.starts_with('/') && !out.iter().any(|p| p == path) {
            out.push(path.to_string());
        }
    }
    out
}

use oav_core::whitelist::rules;
use oav_core::{
    ConfigError, ConfigMode, EngineBuilder, Level, NormalizedRequest, NormalizedResponse,
    ValidationEngine, ValidatorConfig,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

const USERS_SPEC: &str = r##"
openapi: 3.0.3
info:
  title: Users API
  version: 1.0.0
servers:
  - url: https://api.example.com/v1
paths:
  /users:
    get:
      operationId: listUsers
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
            minimum: 1
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: "#/components/schemas/User"
    post:
      operationId: createUser
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/NewUser"
      responses:
        "201":
          description: created
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/User"
  /users/{id}:
    get:
      operationId: getUser
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: integer
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/User"
        "404":
          description: not found
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Error"
components:
  schemas:
    NewUser:
      type: object
      required: [name, email]
      properties:
        name:
          type: string
        email:
          type: string
        nickname:
          type: string
          nullable: true
    User:
      allOf:
        - $ref: "#/components/schemas/NewUser"
        - type: object
          required: [id]
          properties:
            id:
              type: integer
    Error:
      type: object
      required: [code, message]
      properties:
        code:
          type: string
        message:
          type: string
"##;

struct SpecFile {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

fn spec_file() -> SpecFile {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openapi.yaml");
    fs::write(&path, USERS_SPEC).unwrap();
    SpecFile { _dir: dir, path }
}

fn declarative_engine(configure: impl FnOnce(&mut ValidatorConfig)) -> ValidationEngine {
    let spec = spec_file();
    let mut config = ValidatorConfig::new();
    config
        .specification_url(spec.path.to_string_lossy())
        .unwrap();
    configure(&mut config);
    config.build_engine().unwrap()
}

fn json_request(method: &str, path: &str, body: &str) -> NormalizedRequest {
    NormalizedRequest::new(method, path)
        .with_header("Content-Type", "application/json")
        .with_body(body)
}

fn json_response(status: u16, body: &str) -> NormalizedResponse {
    NormalizedResponse::new(status)
        .with_header("Content-Type", "application/json")
        .with_body(body)
}

#[test]
fn test_missing_email_is_an_error() {
    let engine = declarative_engine(|_| {});
    let report = engine.validate_request(&json_request("POST", "/users", r#"{"name":"A"}"#));

    assert!(report.has_errors());
    let keys: Vec<&str> = report.messages().iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, ["validation.request.body.schema"]);
    assert!(report.messages()[0].text.contains("email"));
}

#[test]
fn test_conforming_request_has_no_errors() {
    let engine = declarative_engine(|_| {});
    let report = engine.validate_request(&json_request(
        "POST",
        "/users",
        r#"{"name":"A","email":"a@b.com"}"#,
    ));
    assert!(!report.has_errors());
    assert!(report.is_empty());
}

#[test]
fn test_nullable_field_accepts_null() {
    let engine = declarative_engine(|_| {});
    let report = engine.validate_request(&json_request(
        "POST",
        "/users",
        r#"{"name":"A","email":"a@b.com","nickname":null}"#,
    ));
    assert!(report.is_empty());
}

#[test]
fn test_server_base_path_is_stripped() {
    let engine = declarative_engine(|_| {});
    let request = NormalizedRequest::new("GET", "/v1/users").with_query_param("limit", ["0"]);
    let report = engine.validate_request(&request);

    let keys: Vec<&str> = report.messages().iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, ["validation.request.parameter.schema"]);
    assert_eq!(report.messages()[0].location.as_deref(), Some("GET /v1/users"));
}

#[test]
fn test_whitelisted_404_is_suppressed() {
    let engine = declarative_engine(|config| {
        config
            .whitelist("not found responses", |ctx| {
                ctx.response.status_code == Some(404)
            })
            .unwrap();
    });
    let body = r#"{"error":"gone"}"#;

    let not_found = engine.validate_response("/users/7", "GET", &json_response(404, body));
    assert!(!not_found.has_errors());

    let ok = engine.validate_response("/users/7", "GET", &json_response(200, body));
    assert!(ok.has_errors());
}

#[test]
fn test_suppression_is_order_independent() {
    let build = |first_404: bool| {
        declarative_engine(|config| {
            let never = |_: &oav_core::RuleContext<'_>| false;
            let is_404 = |ctx: &oav_core::RuleContext<'_>| ctx.response.status_code == Some(404);
            if first_404 {
                config.whitelist("404", is_404).unwrap().whitelist("never", never).unwrap();
            } else {
                config.whitelist("never", never).unwrap().whitelist("404", is_404).unwrap();
            }
        })
    };
    let a = build(true);
    let b = build(false);
    for status in [200u16, 404] {
        let response = json_response(status, r#"{"error":"gone"}"#);
        assert_eq!(
            a.validate_response("/users/7", "GET", &response),
            b.validate_response("/users/7", "GET", &response)
        );
    }
}

#[test]
fn test_undocumented_status_and_path() {
    let engine = declarative_engine(|_| {});

    let report = engine.validate_response("/users/7", "GET", &json_response(500, "{}"));
    assert_eq!(report.messages()[0].key, "validation.response.status.unknown");
    assert_eq!(
        report.messages()[0].text,
        "Response status 500 not documented for GET /users/{id}"
    );

    let report = engine.validate_request(&NormalizedRequest::new("GET", "/accounts"));
    assert!(report.has_errors());
    assert_eq!(report.messages()[0].operation, None);
}

#[test]
fn test_all_of_response_schema() {
    let engine = declarative_engine(|_| {});
    let ok = engine.validate_response(
        "/users/7",
        "GET",
        &json_response(200, r#"{"id":7,"name":"A","email":"a@b.com"}"#),
    );
    assert!(ok.is_empty());

    let missing_id = engine.validate_response(
        "/users/7",
        "GET",
        &json_response(200, r#"{"name":"A","email":"a@b.com"}"#),
    );
    assert!(missing_id.has_errors());
}

#[test]
fn test_mixed_configuration_fails_before_traffic() {
    let spec = spec_file();
    let mut config = ValidatorConfig::new();
    config
        .specification_url(spec.path.to_string_lossy())
        .unwrap();

    let err = config
        .engine_builder(|builder| {
            builder.with_level("validation.response", Level::Warn);
        })
        .unwrap_err();
    match err {
        ConfigError::MixedModes { active, attempted } => {
            assert_eq!(active, ConfigMode::Declarative);
            assert_eq!(attempted, ConfigMode::Delegated);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_delegated_builder_with_rules_and_levels() {
    let mut config = ValidatorConfig::new();
    config
        .engine_builder(|builder| {
            builder
                .with_inline_specification(USERS_SPEC)
                .with_whitelist_rule(
                    "legacy clients",
                    rules::all_of([rules::method_is("POST"), rules::message_contains("email")]),
                )
                .with_level("validation.request.parameter", Level::Warn);
        })
        .unwrap();
    let engine = config.build_engine().unwrap();

    let report = engine.validate_request(&json_request("POST", "/users", r#"{"name":"A"}"#));
    assert!(report.is_empty());

    let request = NormalizedRequest::new("GET", "/users").with_query_param("limit", ["zero"]);
    let report = engine.validate_request(&request);
    assert!(!report.has_errors());
    assert_eq!(report.messages()[0].level, Level::Warn);
}

#[test]
fn test_strict_additional_properties() {
    let mut builder = EngineBuilder::new();
    builder
        .with_inline_specification(USERS_SPEC)
        .with_strict_additional_properties(true);
    let engine = builder.build().unwrap();

    let report = engine.validate_request(&json_request(
        "POST",
        "/users",
        r#"{"name":"A","email":"a@b.com","admin":true}"#,
    ));
    assert!(report.has_errors());
}

#[test]
fn test_same_request_same_report() {
    let engine = declarative_engine(|_| {});
    let request = json_request("POST", "/users", r#"{"email":1}"#);
    assert_eq!(engine.validate_request(&request), engine.validate_request(&request));
}

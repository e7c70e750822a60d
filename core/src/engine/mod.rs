#![deny(missing_docs)]

//! # Validation Engine
//!
//! Binds a compiled [`Contract`] to a [`Whitelist`] and per-key severity
//! overrides, and turns normalized traffic into [`Report`]s.
//!
//! The engine is built once and shared read-only; validating the same input
//! twice yields equal reports.
//!
//! ```
//! use oav_core::engine::EngineBuilder;
//! use oav_core::model::NormalizedRequest;
//!
//! let spec = r#"
//! openapi: 3.0.3
//! info: { title: Users, version: "1" }
//! paths:
//!   /users:
//!     post:
//!       requestBody:
//!         required: true
//!         content:
//!           application/json:
//!             schema: { type: object, required: [name, email] }
//!       responses:
//!         "201": { description: created }
//! "#;
//!
//! let engine = EngineBuilder::new()
//!     .with_inline_specification(spec)
//!     .build()
//!     .unwrap();
//! let request = NormalizedRequest::new("POST", "/users")
//!     .with_header("Content-Type", "application/json")
//!     .with_body(r#"{"name":"A"}"#);
//! assert!(engine.validate_request(&request).has_errors());
//! ```

mod body;
mod findings;
mod levels;
mod params;
mod request;
mod response;

pub use levels::LevelResolver;

use crate::contract::source::load_document;
use crate::contract::{CompileOptions, Contract, Resolution, SchemaDraft, SpecSource};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{NormalizedRequest, NormalizedResponse, Operation};
use crate::report::{Level, Message, Report};
use crate::whitelist::{RuleContext, RuleMatcher, Whitelist};
use findings::{Direction, Findings};
use tracing::{debug, info, trace};

/// Low-level engine configuration.
///
/// This is what the delegated configuration mode hands out; the declarative
/// setters of [`ValidatorConfig`](crate::config::ValidatorConfig) write into it too.
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    source: Option<SpecSource>,
    whitelist: Whitelist,
    levels: LevelResolver,
    draft: Option<SchemaDraft>,
    strict_additional_properties: bool,
    base_paths: Vec<String>,
}

impl EngineBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the specification from a path or URL.
    pub fn with_specification_url(&mut self, location: impl Into<String>) -> &mut Self {
        self.source = Some(SpecSource::Location(location.into()));
        self
    }

    /// Uses the given document text as the specification.
    pub fn with_inline_specification(&mut self, document: impl Into<String>) -> &mut Self {
        self.source = Some(SpecSource::Inline(document.into()));
        self
    }

    /// Adds a whitelist rule.
    pub fn with_whitelist_rule(&mut self, name: impl Into<String>, matcher: RuleMatcher) -> &mut Self {
        self.whitelist.push(name, matcher);
        self
    }

    /// Appends every rule of `whitelist`.
    pub fn with_whitelist(&mut self, whitelist: Whitelist) -> &mut Self {
        self.whitelist.extend(whitelist);
        self
    }

    /// Overrides the level of `key` and every key below it.
    pub fn with_level(&mut self, key: impl Into<String>, level: Level) -> &mut Self {
        self.levels.set(key, level);
        self
    }

    /// Forces the JSON Schema draft instead of deriving it from the document.
    pub fn with_schema_draft(&mut self, draft: SchemaDraft) -> &mut Self {
        self.draft = Some(draft);
        self
    }

    /// Treats object schemas without `additionalProperties` as closed.
    pub fn with_strict_additional_properties(&mut self, strict: bool) -> &mut Self {
        self.strict_additional_properties = strict;
        self
    }

    /// Strips `base_path` from request paths before matching, in addition to `servers`.
    pub fn with_base_path(&mut self, base_path: impl Into<String>) -> &mut Self {
        let base_path = base_path.into();
        let trimmed = base_path.trim_end_matches('/');
        if !trimmed.is_empty() {
            self.base_paths.push(trimmed.to_string());
        }
        self
    }

    /// True once a specification source was set.
    pub fn has_specification(&self) -> bool {
        self.source.is_some()
    }

    /// The configured whitelist.
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Loads and compiles the specification.
    pub fn build(&self) -> ConfigResult<ValidationEngine> {
        let source = self
            .source
            .as_ref()
            .ok_or(ConfigError::MissingSpecification)?;
        let document = load_document(source)?;

        let options = CompileOptions {
            retrieval_uri: match source {
                SpecSource::Location(location) => Some(location.clone()),
                SpecSource::Inline(_) => None,
            },
            draft: self.draft,
            strict_additional_properties: self.strict_additional_properties,
            extra_base_paths: self.base_paths.clone(),
        };
        let contract = Contract::compile(&document, &options)?;

        info!(
            specification = source.describe(),
            operations = contract.operation_count(),
            draft = ?contract.draft(),
            base_paths = ?contract.base_paths(),
            whitelist_rules = self.whitelist.len(),
            "validation engine ready"
        );
        Ok(ValidationEngine {
            contract,
            whitelist: self.whitelist.clone(),
            levels: self.levels.clone(),
        })
    }
}

/// Validates normalized traffic against the compiled contract.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    contract: Contract,
    whitelist: Whitelist,
    levels: LevelResolver,
}

impl ValidationEngine {
    /// The compiled contract.
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// The finalized whitelist.
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Validates an outgoing request.
    pub fn validate_request(&self, request: &NormalizedRequest) -> Report {
        let method = request.method.as_deref().unwrap_or_default();
        let path = request_path(request);
        let mut findings = Findings::new(Direction::Request);

        let operation = match self.contract.resolve(method, path) {
            Resolution::Found {
                operation,
                path_params,
            } => {
                request::check_request(operation, &path_params, request, &mut findings);
                Some(Operation::new(operation.operation_id.clone()))
            }
            other => {
                push_unresolved(&mut findings, other, method, path);
                None
            }
        };

        self.finish_report(findings, operation, request, &NormalizedResponse::default())
    }

    /// Validates a response to `method path`.
    pub fn validate_response(
        &self,
        path: &str,
        method: &str,
        response: &NormalizedResponse,
    ) -> Report {
        let request = NormalizedRequest::new(method, path);
        self.validate_exchange(&request, response)
    }

    /// Validates a response, exposing the full originating request to whitelist rules.
    pub fn validate_exchange(
        &self,
        request: &NormalizedRequest,
        response: &NormalizedResponse,
    ) -> Report {
        let method = request.method.as_deref().unwrap_or_default();
        let path = request_path(request);
        let mut findings = Findings::new(Direction::Response);

        let operation = match self.contract.resolve(method, path) {
            Resolution::Found { operation, .. } => {
                response::check_response(operation, response, &mut findings);
                Some(Operation::new(operation.operation_id.clone()))
            }
            other => {
                push_unresolved(&mut findings, other, method, path);
                None
            }
        };

        self.finish_report(findings, operation, request, response)
    }

    /// Applies levels and the whitelist, then builds the report.
    fn finish_report(
        &self,
        findings: Findings,
        operation: Option<Operation>,
        request: &NormalizedRequest,
        response: &NormalizedResponse,
    ) -> Report {
        let direction = findings.direction();
        let view = operation.clone().unwrap_or_default();
        let location = format!(
            "{} {}",
            request.method.as_deref().unwrap_or_default(),
            request_path(request)
        );

        let mut messages = Vec::new();
        for finding in findings.into_inner() {
            let level = self.levels.level_for(&finding.key);
            if level == Level::Ignore {
                trace!(key = %finding.key, "finding ignored by level override");
                continue;
            }
            let message = Message {
                key: finding.key,
                level,
                text: finding.text,
                operation: operation.clone(),
                location: Some(location.clone()),
            };
            let ctx = RuleContext {
                operation: &view,
                request,
                response,
                message: &message,
            };
            if let Some(rule) = self.whitelist.matching_rule(&ctx) {
                debug!(rule, key = %message.key, "finding suppressed by whitelist");
                continue;
            }
            messages.push(message);
        }

        debug!(%direction, %location, findings = messages.len(), "validated");
        Report::from_messages(messages)
    }
}

fn request_path(request: &NormalizedRequest) -> &str {
    let path = request.path.as_deref().unwrap_or_default();
    path.split_once('?').map_or(path, |(path, _)| path)
}

fn push_unresolved(findings: &mut Findings, resolution: Resolution<'_>, method: &str, path: &str) {
    match resolution {
        Resolution::MethodNotAllowed { template, allowed } => findings.push(
            "operation.notAllowed",
            format!(
                "{} operation not allowed on path '{}'. Allowed: {}",
                method,
                template,
                allowed.join(", ")
            ),
        ),
        _ => findings.push(
            "path.missing",
            format!("No API path found that matches request '{}'", path),
        ),
    }
}

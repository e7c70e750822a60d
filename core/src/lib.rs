#![deny(missing_docs)]

//! # OAV Core
//!
//! Validates HTTP client traffic against an OpenAPI 3.x contract.
//!
//! Requests and responses are captured by a [`tower`] layer, normalized into the
//! [`model`] types, checked by the [`engine`] against the compiled [`contract`],
//! filtered through the [`whitelist`] and handed to a [`reporter`].

/// Shared error types.
pub mod error;

/// Normalized traffic snapshots.
pub mod model;

/// Findings and reports.
pub mod report;

/// Suppression rules.
pub mod whitelist;

/// Compiled OpenAPI documents.
pub mod contract;

/// Request and response validation.
pub mod engine;

/// Declarative / delegated configuration.
pub mod config;

/// Report sinks.
pub mod reporter;

/// Tower interception layer.
pub mod pipeline;

pub use config::{ConfigMode, ValidatorConfig};
pub use engine::{EngineBuilder, ValidationEngine};
pub use error::{ConfigError, ValidatorError, ValidatorResult};
pub use model::{NormalizedRequest, NormalizedResponse, Operation};
pub use pipeline::{OpenApiValidationLayer, OpenApiValidationService};
pub use report::{Level, Message, Report};
pub use reporter::{AssertReporter, CallbackReporter, ErrorReporter, NoopReporter, TextReporter};
pub use whitelist::{RuleContext, RuleMatcher, Whitelist};

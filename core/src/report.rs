#![deny(missing_docs)]

//! # Validation Report
//!
//! The ordered list of findings produced for one request or one response.

use crate::model::Operation;
use derive_more::Display;
use serde::Serialize;
use std::fmt;

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Dropped before it reaches a report.
    #[display("IGNORE")]
    Ignore,
    /// Informational.
    #[display("INFO")]
    Info,
    /// Reported, but does not make `has_errors()` true.
    #[display("WARN")]
    Warn,
    /// A conformance violation.
    #[display("ERROR")]
    Error,
}

/// A single unsuppressed finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Dotted finding kind, e.g. `validation.request.body.schema`.
    pub key: String,
    /// Resolved severity.
    pub level: Level,
    /// Human readable description.
    pub text: String,
    /// Operation the finding belongs to, when one was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    /// `METHOD /path` of the exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Message {
    /// Builds an error-level message with no operation or location.
    pub fn error(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            level: Level::Error,
            text: text.into(),
            operation: None,
            location: None,
        }
    }

    /// True for error-level messages.
    pub fn is_error(&self) -> bool {
        self.level >= Level::Error
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.level)?;
        if let Some(location) = &self.location {
            write!(f, "[{}]", location)?;
        }
        if let Some(id) = self.operation.as_ref().and_then(|op| op.id.as_deref()) {
            write!(f, "[{}]", id)?;
        }
        write!(f, " {} ({})", self.text, self.key)
    }
}

/// Findings for one validated request or response.
///
/// Serializes as `{"messages": [...]}` for machine-readable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    messages: Vec<Message>,
}

impl Report {
    /// A report without findings.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps already-filtered messages.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Messages in the order they were found.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True iff any message is error-level.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(Message::is_error)
    }

    /// True when the report carries no messages at all.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", message)?;
        }
        Ok(())
    }
}

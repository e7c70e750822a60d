#![deny(missing_docs)]

//! # Error Handling
//!
//! Fatal errors raised while configuring the validator or while capturing a call.
//! Conformance findings are never errors: they travel in a [`Report`](crate::report::Report).

use crate::config::ConfigMode;
use derive_more::{Display, From};

/// Setup-time failures. Any of these aborts construction of the validating client.
#[derive(Debug, Display)]
pub enum ConfigError {
    /// Declarative and delegated configuration were mixed.
    #[display(
        "Validator is already configured in {active} mode, {attempted} configuration is not allowed. \
         Use either the declarative setters (`specification_url`, `whitelist`) or `engine_builder`, not both"
    )]
    MixedModes {
        /// The mode entered first.
        active: ConfigMode,
        /// The mode the rejected call belongs to.
        attempted: ConfigMode,
    },

    /// A setter was called after `finalize()`.
    #[display("Validator configuration is frozen and can no longer be changed")]
    Frozen,

    /// No specification location (or inline document) was configured.
    #[display("Missing required configuration key 'specification_url'")]
    MissingSpecification,

    /// The specification could not be read from its location.
    #[display("Unable to read OpenAPI specification at '{location}': {reason}")]
    SpecUnreadable {
        /// The configured location.
        location: String,
        /// Underlying failure.
        reason: String,
    },

    /// The document was read but is not a usable OpenAPI 3.x document.
    #[display("Invalid OpenAPI specification: {_0}")]
    InvalidSpecification(String),

    /// A schema in the document could not be compiled.
    #[display("Unable to compile schema at '{pointer}': {reason}")]
    SchemaCompilation {
        /// JSON pointer of the offending schema.
        pointer: String,
        /// Compiler message.
        reason: String,
    },
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for ConfigError {}

/// Top-level error for the validator crate.
#[derive(Debug, Display, From)]
pub enum ValidatorError {
    /// Setup-time failure.
    #[display("Configuration Error: {_0}")]
    Config(ConfigError),

    /// A request body the validator cannot turn into text.
    #[from(ignore)]
    #[display("Unsupported payload (content type '{content_type}'): {reason}")]
    UnsupportedPayload {
        /// Declared `Content-Type` of the request, or `<none>`.
        content_type: String,
        /// Why the payload was rejected.
        reason: String,
    },
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for ValidatorError {}

/// Result alias for configuration steps.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result alias using [`ValidatorError`].
pub type ValidatorResult<T> = Result<T, ValidatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_conversion() {
        let err: ValidatorError = ConfigError::MissingSpecification.into();
        assert!(matches!(
            err,
            ValidatorError::Config(ConfigError::MissingSpecification)
        ));
    }

    #[test]
    fn test_mixed_modes_names_active_mode() {
        let err = ConfigError::MixedModes {
            active: ConfigMode::Declarative,
            attempted: ConfigMode::Delegated,
        };
        let msg = err.to_string();
        assert!(msg.contains("already configured in declarative mode"));
        assert!(msg.contains("delegated configuration is not allowed"));
    }

    #[test]
    fn test_unsupported_payload_display() {
        let err = ValidatorError::UnsupportedPayload {
            content_type: "application/octet-stream".into(),
            reason: "body is not valid UTF-8".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported payload (content type 'application/octet-stream'): body is not valid UTF-8"
        );
    }
}

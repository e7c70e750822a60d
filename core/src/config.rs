#![deny(missing_docs)]

//! # Validator Configuration
//!
//! Two mutually exclusive ways to configure the validator:
//!
//! - **declarative**: [`ValidatorConfig::specification_url`] and
//!   [`ValidatorConfig::whitelist`];
//! - **delegated** (advanced): [`ValidatorConfig::engine_builder`], direct access
//!   to the [`EngineBuilder`].
//!
//! The first call from either family fixes the mode; a call from the other
//! family fails with [`ConfigError::MixedModes`]. The reporter is shared by both.
//!
//! ```
//! use oav_core::config::ValidatorConfig;
//!
//! let mut config = ValidatorConfig::new();
//! config.specification_url("openapi.yaml").unwrap();
//! let err = config.engine_builder(|builder| {
//!     builder.with_strict_additional_properties(true);
//! });
//! assert!(err.is_err());
//! ```

use crate::engine::{EngineBuilder, ValidationEngine};
use crate::error::{ConfigError, ConfigResult};
use crate::pipeline::OpenApiValidationLayer;
use crate::reporter::{AssertReporter, ErrorReporter};
use crate::whitelist::{RuleContext, RuleMatcher, Whitelist};
use derive_more::Display;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which configuration family is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum ConfigMode {
    /// Nothing configured yet.
    #[default]
    #[display("unconfigured")]
    Unconfigured,
    /// `specification_url` / `whitelist`.
    #[display("declarative")]
    Declarative,
    /// `engine_builder`.
    #[display("delegated")]
    Delegated,
}

/// Builder for the validating layer.
pub struct ValidatorConfig {
    mode: ConfigMode,
    builder: EngineBuilder,
    whitelist: Whitelist,
    specification_url: Option<String>,
    reporter: Arc<dyn ErrorReporter>,
    finalized: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            mode: ConfigMode::Unconfigured,
            builder: EngineBuilder::new(),
            whitelist: Whitelist::new(),
            specification_url: None,
            reporter: Arc::new(AssertReporter),
            finalized: false,
        }
    }
}

impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("mode", &self.mode)
            .field("specification_url", &self.specification_url)
            .field("whitelist_rules", &self.whitelist.len())
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

impl ValidatorConfig {
    /// Unconfigured, reporting through [`AssertReporter`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> ConfigMode {
        self.mode
    }

    /// True after [`finalize`](Self::finalize).
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Sets the specification location (file path or URL). Declarative.
    pub fn specification_url(&mut self, location: impl Into<String>) -> ConfigResult<&mut Self> {
        self.enter(ConfigMode::Declarative)?;
        self.specification_url = Some(location.into());
        Ok(self)
    }

    /// Adds a named whitelist rule from a plain predicate. Declarative.
    pub fn whitelist<F>(&mut self, name: impl Into<String>, predicate: F) -> ConfigResult<&mut Self>
    where
        F: Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.whitelist_rule(name, RuleMatcher::from_fn(predicate))
    }

    /// Adds a named whitelist rule. Declarative.
    pub fn whitelist_rule(
        &mut self,
        name: impl Into<String>,
        matcher: RuleMatcher,
    ) -> ConfigResult<&mut Self> {
        self.enter(ConfigMode::Declarative)?;
        self.whitelist.push(name, matcher);
        Ok(self)
    }

    /// Grants direct access to the engine builder. Delegated; intended for advanced use.
    pub fn engine_builder<F>(&mut self, configure: F) -> ConfigResult<&mut Self>
    where
        F: FnOnce(&mut EngineBuilder),
    {
        self.enter(ConfigMode::Delegated)?;
        configure(&mut self.builder);
        Ok(self)
    }

    /// Installs the reporter. Allowed in either mode.
    pub fn reporter(&mut self, reporter: impl ErrorReporter + 'static) -> ConfigResult<&mut Self> {
        self.ensure_open()?;
        self.reporter = Arc::new(reporter);
        Ok(self)
    }

    /// Merges the declarative settings into the builder, checks a specification is set
    /// and freezes the configuration. Calling it again does nothing.
    pub fn finalize(&mut self) -> ConfigResult<&mut Self> {
        if self.finalized {
            return Ok(self);
        }
        if let Some(location) = self.specification_url.take() {
            self.builder.with_specification_url(location);
        }
        let whitelist = std::mem::take(&mut self.whitelist);
        self.builder.with_whitelist(whitelist);

        if !self.builder.has_specification() {
            return Err(ConfigError::MissingSpecification);
        }
        self.finalized = true;
        debug!(mode = %self.mode, rules = self.builder.whitelist().len(), "validator configuration finalized");
        Ok(self)
    }

    /// Finalizes and builds the engine.
    pub fn build_engine(&mut self) -> ConfigResult<ValidationEngine> {
        self.finalize()?;
        self.builder.build()
    }

    /// Finalizes and builds the tower layer.
    pub fn into_layer(mut self) -> ConfigResult<OpenApiValidationLayer> {
        let engine = self.build_engine()?;
        Ok(OpenApiValidationLayer::from_parts(
            Arc::new(engine),
            Arc::clone(&self.reporter),
        ))
    }

    fn ensure_open(&self) -> ConfigResult<()> {
        if self.finalized {
            return Err(ConfigError::Frozen);
        }
        Ok(())
    }

    fn enter(&mut self, attempted: ConfigMode) -> ConfigResult<()> {
        self.ensure_open()?;
        match self.mode {
            ConfigMode::Unconfigured => {
                self.mode = attempted;
                Ok(())
            }
            active if active == attempted => Ok(()),
            active => Err(ConfigError::MixedModes { active, attempted }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NoopReporter;

    const SPEC: &str = r#"
openapi: 3.1.0
info: { title: t, version: "1" }
paths:
  /ping:
    get:
      responses:
        "200": { description: pong }
"#;

    #[test]
    fn test_declarative_then_delegated_fails() {
        let mut config = ValidatorConfig::new();
        config.specification_url("spec.yaml").unwrap();
        let err = config.engine_builder(|_| {}).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MixedModes {
                active: ConfigMode::Declarative,
                attempted: ConfigMode::Delegated
            }
        ));
        assert_eq!(config.mode(), ConfigMode::Declarative);
    }

    #[test]
    fn test_delegated_then_declarative_fails() {
        let mut config = ValidatorConfig::new();
        config
            .engine_builder(|builder| {
                builder.with_inline_specification(SPEC);
            })
            .unwrap();
        assert!(config.whitelist("any", |_| true).is_err());
        assert!(config.specification_url("spec.yaml").is_err());
        assert_eq!(config.mode(), ConfigMode::Delegated);
    }

    #[test]
    fn test_reporter_is_mode_neutral() {
        let mut config = ValidatorConfig::new();
        config.reporter(NoopReporter).unwrap();
        assert_eq!(config.mode(), ConfigMode::Unconfigured);
        config.engine_builder(|_| {}).unwrap();
        config.reporter(NoopReporter).unwrap();
    }

    #[test]
    fn test_finalize_requires_specification() {
        let mut config = ValidatorConfig::new();
        config.whitelist("any", |_| true).unwrap();
        assert!(matches!(
            config.finalize().unwrap_err(),
            ConfigError::MissingSpecification
        ));
    }

    #[test]
    fn test_finalize_is_idempotent_and_freezes() {
        let mut config = ValidatorConfig::new();
        config
            .engine_builder(|builder| {
                builder.with_inline_specification(SPEC);
            })
            .unwrap();
        config.finalize().unwrap();
        config.finalize().unwrap();
        assert!(config.is_finalized());
        assert!(matches!(
            config.engine_builder(|_| {}).unwrap_err(),
            ConfigError::Frozen
        ));
        assert!(matches!(
            config.reporter(NoopReporter).unwrap_err(),
            ConfigError::Frozen
        ));
    }

    #[test]
    fn test_declarative_whitelist_reaches_engine() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), SPEC).unwrap();

        let mut config = ValidatorConfig::new();
        config
            .specification_url(file.path().to_string_lossy())
            .unwrap()
            .whitelist("pong", |ctx| ctx.request.path.as_deref() == Some("/pong"))
            .unwrap();
        let engine = config.build_engine().unwrap();
        assert_eq!(engine.whitelist().len(), 1);
        assert_eq!(engine.contract().operation_count(), 1);
    }

    #[test]
    fn test_unreadable_specification_fails_at_build() {
        let mut config = ValidatorConfig::new();
        config.specification_url("/definitely/missing.yaml").unwrap();
        assert!(matches!(
            config.build_engine().unwrap_err(),
            ConfigError::SpecUnreadable { .. }
        ));
    }
}

#![deny(missing_docs)]

//! # Interception Pipeline
//!
//! A [`tower::Layer`] that validates every request before it is sent and every
//! response before it is handed back, without altering either.
//!
//! Per call the service moves through
//! `Pending → BodyCaptured → RequestValidated → InFlight → ResponseCaptured →
//! ResponseValidated → Delivered`. Request bodies are collected once and
//! forwarded as the same [`Bytes`]; response bodies are collected, validated
//! and returned around the same buffer, so callers see them byte-identical.
//! If the inner call fails, response validation never runs.

mod capture;

use crate::config::ValidatorConfig;
use crate::engine::ValidationEngine;
use crate::error::ConfigResult;
use crate::reporter::ErrorReporter;
use bytes::Bytes;
use derive_more::Display;
use http::{Request, Response};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{BoxError, Layer, Service};
use tracing::debug;

#[derive(Debug, Clone, Copy, Display)]
enum Stage {
    #[display("body-captured")]
    BodyCaptured,
    #[display("request-validated")]
    RequestValidated,
    #[display("in-flight")]
    InFlight,
    #[display("response-captured")]
    ResponseCaptured,
    #[display("response-validated")]
    ResponseValidated,
    #[display("delivered")]
    Delivered,
}

fn enter(stage: Stage, method: &http::Method, path: &str) {
    debug!(%stage, %method, path, "openapi validation");
}

/// Layer wrapping a client service with contract validation.
#[derive(Clone)]
pub struct OpenApiValidationLayer {
    engine: Arc<ValidationEngine>,
    reporter: Arc<dyn ErrorReporter>,
}

impl OpenApiValidationLayer {
    /// Finalizes `config` and builds the engine. Fails before any traffic flows.
    pub fn new(config: ValidatorConfig) -> ConfigResult<Self> {
        config.into_layer()
    }

    /// Assembles a layer from an already built engine and reporter.
    pub fn from_parts(engine: Arc<ValidationEngine>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { engine, reporter }
    }

    /// The shared engine.
    pub fn engine(&self) -> &Arc<ValidationEngine> {
        &self.engine
    }
}

impl fmt::Debug for OpenApiValidationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenApiValidationLayer")
            .field("operations", &self.engine.contract().operation_count())
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for OpenApiValidationLayer {
    type Service = OpenApiValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OpenApiValidationService {
            inner,
            engine: Arc::clone(&self.engine),
            reporter: Arc::clone(&self.reporter),
        }
    }
}

/// Service produced by [`OpenApiValidationLayer`].
#[derive(Clone)]
pub struct OpenApiValidationService<S> {
    inner: S,
    engine: Arc<ValidationEngine>,
    reporter: Arc<dyn ErrorReporter>,
}

impl<S: fmt::Debug> fmt::Debug for OpenApiValidationService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenApiValidationService")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for OpenApiValidationService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    ReqBody: Body + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Into<BoxError>,
    ResBody: Body + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let engine = Arc::clone(&self.engine);
        let reporter = Arc::clone(&self.reporter);

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let method = parts.method.clone();
            let path = parts.uri.path().to_string();

            let bytes = body.collect().await.map_err(Into::<BoxError>::into)?.to_bytes();
            enter(Stage::BodyCaptured, &method, &path);

            let request = capture::normalize_request(&parts, &bytes)?;
            let report = engine.validate_request(&request);
            reporter.report_if_errors(&report);
            enter(Stage::RequestValidated, &method, &path);

            enter(Stage::InFlight, &method, &path);
            let response = inner
                .call(Request::from_parts(parts, Full::new(bytes)))
                .await
                .map_err(Into::<BoxError>::into)?;

            let (parts, body) = response.into_parts();
            let bytes = body.collect().await.map_err(Into::<BoxError>::into)?.to_bytes();
            enter(Stage::ResponseCaptured, &method, &path);

            let captured = capture::normalize_response(&parts, &bytes);
            let report = engine.validate_exchange(&request, &captured);
            reporter.report_if_errors(&report);
            enter(Stage::ResponseValidated, &method, &path);

            enter(Stage::Delivered, &method, &path);
            Ok(Response::from_parts(parts, Full::new(bytes)))
        })
    }
}

#![deny(missing_docs)]

//! # Error Reporters
//!
//! Sinks that turn a [`Report`] into an observable outcome: a test failure,
//! log lines, or whatever a callback does with it.

mod assert;
mod callback;
mod text;

pub use assert::AssertReporter;
pub use callback::{CallbackReporter, NoopReporter};
pub use text::TextReporter;

use crate::report::Report;
use std::sync::Arc;

/// Receives every report produced by the pipeline.
pub trait ErrorReporter: Send + Sync {
    /// Handles a report. Called only for reports that carry errors when invoked
    /// through [`report_if_errors`](ErrorReporter::report_if_errors).
    fn report(&self, report: &Report);

    /// Forwards `report` to [`report`](ErrorReporter::report) when it has error-level messages.
    fn report_if_errors(&self, report: &Report) {
        if report.has_errors() {
            self.report(report);
        }
    }
}

impl<R: ErrorReporter + ?Sized> ErrorReporter for Arc<R> {
    fn report(&self, report: &Report) {
        (**self).report(report)
    }
}

impl<R: ErrorReporter + ?Sized> ErrorReporter for Box<R> {
    fn report(&self, report: &Report) {
        (**self).report(report)
    }
}

use crate::report::Report;
use crate::reporter::ErrorReporter;

/// Test sink: panics once, listing every message of the report on its own line.
///
/// ```should_panic
/// use oav_core::report::{Message, Report};
/// use oav_core::reporter::{AssertReporter, ErrorReporter};
///
/// let report = Report::from_messages(vec![Message::error("validation.request.body.schema", "bad")]);
/// AssertReporter.report(&report);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertReporter;

impl AssertReporter {
    /// One failure entry per message.
    pub fn failures(report: &Report) -> Vec<String> {
        report
            .messages()
            .iter()
            .enumerate()
            .map(|(i, message)| format!("  {}. {}", i + 1, message))
            .collect()
    }
}

impl ErrorReporter for AssertReporter {
    fn report(&self, report: &Report) {
        let failures = Self::failures(report);
        if failures.is_empty() {
            return;
        }
        panic!(
            "OpenAPI validation report ({} failures):\n{}",
            failures.len(),
            failures.join("\n")
        );
    }
}

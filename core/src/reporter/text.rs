use crate::report::Report;
use crate::reporter::ErrorReporter;
use std::fmt;
use std::sync::Arc;

type Sink = dyn Fn(&[String]) + Send + Sync;

/// Renders each message as a line and hands the lines to a callback.
#[derive(Clone)]
pub struct TextReporter {
    sink: Arc<Sink>,
}

impl TextReporter {
    /// Forwards rendered lines to `sink`.
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Emits each line as a `tracing` warning.
    pub fn tracing() -> Self {
        Self::new(|lines| {
            for line in lines {
                tracing::warn!(target: "oav_core::report", "{}", line);
            }
        })
    }
}

impl ErrorReporter for TextReporter {
    fn report(&self, report: &Report) {
        let lines: Vec<String> = report.messages().iter().map(ToString::to_string).collect();
        (self.sink)(&lines);
    }
}

impl fmt::Debug for TextReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TextReporter(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Message;
    use std::sync::Mutex;

    #[test]
    fn test_lines_reach_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let reporter = TextReporter::new(move |lines| {
            captured.lock().unwrap().extend_from_slice(lines);
        });

        reporter.report(&Report::from_messages(vec![
            Message::error("validation.request.path.missing", "No API path found"),
        ]));
        assert_eq!(
            *seen.lock().unwrap(),
            ["[ERROR] No API path found (validation.request.path.missing)"]
        );
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        TextReporter::tracing().report(&Report::from_messages(vec![Message::error(
            "validation.response.status.unknown",
            "Response status 418 not documented",
        )]));
    }
}

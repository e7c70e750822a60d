use crate::report::Report;
use crate::reporter::ErrorReporter;
use std::fmt;
use std::sync::Arc;

/// Adapter over any `Fn(&Report)`.
#[derive(Clone)]
pub struct CallbackReporter {
    callback: Arc<dyn Fn(&Report) + Send + Sync>,
}

impl CallbackReporter {
    /// Wraps `callback`.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Report) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl ErrorReporter for CallbackReporter {
    fn report(&self, report: &Report) {
        (self.callback)(report)
    }
}

impl fmt::Debug for CallbackReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallbackReporter(..)")
    }
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _report: &Report) {}
}

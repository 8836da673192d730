//! The logger collaborator handed to each call.
//!
//! Every call emits exactly two info lines through a `CallLogger`:
//! `"<METHOD> <url>"` before sending and `"<status> <final url>"` after.
//! `TracingLogger` forwards them to `tracing`.

/// Sink for the per-call info lines.
pub trait CallLogger {
    fn info(&self, message: &str);
}

/// Emits `tracing` info events under the `svc_core::dispatch` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl CallLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "svc_core::dispatch", "{message}");
    }
}

impl<F> CallLogger for F
where
    F: Fn(&str),
{
    fn info(&self, message: &str) {
        self(message)
    }
}

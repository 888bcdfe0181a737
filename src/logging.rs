use std::fmt;

/// Endpoint-scoped logging for the verification layer.
///
/// Every event carries the request's `method` and `path` so that log lines
/// from concurrent requests can be told apart. Parameter values are never
/// logged, only parameter names.
#[derive(Debug, Clone, Copy)]
pub struct VerifyLog<'a> {
    method: &'a str,
    path: &'a str,
}

impl<'a> VerifyLog<'a> {
    /// Creates a logger for one endpoint.
    pub fn new(method: &'a str, path: &'a str) -> Self {
        Self { method, path }
    }

    /// Logs a trace-level message.
    pub fn trace(&self, args: fmt::Arguments<'_>) {
        tracing::trace!(method = %self.method, path = %self.path, "{}", args);
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(method = %self.method, path = %self.path, "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(method = %self.method, path = %self.path, "{}", args);
    }
}

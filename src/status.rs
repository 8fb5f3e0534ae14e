//! Fire-and-forget progress reporting.

/// Receives human-readable progress text such as `Searching: Naruto`.
pub trait StatusSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Forwards status messages to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn report(&self, message: &str) {
        tracing::info!(target: "anisource::status", "{message}");
    }
}

/// Discards status messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn report(&self, _message: &str) {}
}

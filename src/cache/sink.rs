//! Diagnostic sink for worker processing failures.
//!
//! The background worker never terminates on a bad instruction: each failure
//! is handed to the cache's [`DiagnosticSink`] and the worker moves on. The
//! default sink forwards to `tracing`; tests install recording sinks to
//! assert on reported failures.

use crate::error::WorkerError;

/// Receiver for instruction-processing failures.
///
/// Implementations must be cheap and non-blocking: `report` runs on the
/// worker thread, between instructions.
pub trait DiagnosticSink: Send + Sync {
    /// Called once per instruction the worker failed to process.
    fn report(&self, error: &WorkerError);
}

/// Default sink, forwarding failures to `tracing::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, error: &WorkerError) {
        tracing::warn!(target: "ringcache", %error, "worker failed to process instruction");
    }
}

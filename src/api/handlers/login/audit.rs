//! Log sink for login outcomes.

use tracing::{info, warn};

/// Minimal logging capability handed to the login handler.
///
/// Implementations receive fixed event descriptions only; request emails and
/// passwords are never passed through.
pub trait AuditLog: Send + Sync {
    fn info(&self, event: &str);
    fn warn(&self, event: &str);
}

/// Forwards audit events to `tracing` under the `passgate::audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn info(&self, event: &str) {
        info!(target: "passgate::audit", "{event}");
    }

    fn warn(&self, event: &str) {
        warn!(target: "passgate::audit", "{event}");
    }
}

//! Best-effort diagnostic output from compute units.
//!
//! Units log plain text through a [`DiagnosticSink`]. Delivery is never
//! guaranteed and never fails loudly: a sink that cannot deliver simply
//! drops the message.

use std::sync::{Arc, OnceLock};

/// Destination for unit log lines.
pub trait DiagnosticSink: Send + Sync {
    /// Log one message. Must not block and must not panic.
    fn log(&self, message: &str);
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Forwards unit messages to `tracing` under the `ponder::unit` target.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    context: &'static str,
}

impl TracingSink {
    /// Create a sink tagging every line with the given context name.
    pub const fn new(context: &'static str) -> Self {
        Self { context }
    }
}

impl DiagnosticSink for TracingSink {
    fn log(&self, message: &str) {
        let message = message.trim_end();
        if !message.is_empty() {
            tracing::debug!(target: "ponder::unit", context = self.context, "{message}");
        }
    }
}

/// Swallows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn log(&self, _message: &str) {}
}

/// Drops messages until a real sink is attached.
///
/// A unit may try to log before its context finished setting up; those
/// lines are lost rather than treated as an error.
#[derive(Default)]
pub struct DeferredSink {
    target: OnceLock<SharedSink>,
}

impl DeferredSink {
    /// Create an unattached sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the destination. Only the first call has any effect.
    ///
    /// Returns `false` if a sink was already attached.
    pub fn attach(&self, sink: SharedSink) -> bool {
        self.target.set(sink).is_ok()
    }

    /// Whether a destination has been attached.
    pub fn is_attached(&self) -> bool {
        self.target.get().is_some()
    }
}

impl DiagnosticSink for DeferredSink {
    fn log(&self, message: &str) {
        if let Some(sink) = self.target.get() {
            sink.log(message);
        }
    }
}

impl std::fmt::Debug for DeferredSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredSink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl DiagnosticSink for Collect {
        fn log(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn deferred_drops_until_attached() {
        let collect = Arc::new(Collect::default());
        let deferred = DeferredSink::new();

        deferred.log("early");
        assert!(!deferred.is_attached());

        assert!(deferred.attach(collect.clone()));
        deferred.log("late");

        assert_eq!(*collect.0.lock().unwrap(), vec!["late".to_string()]);
    }

    #[test]
    fn deferred_attach_only_once() {
        let deferred = DeferredSink::new();
        assert!(deferred.attach(Arc::new(NullSink)));
        assert!(!deferred.attach(Arc::new(NullSink)));
    }

    #[test]
    fn null_and_tracing_sinks_never_panic() {
        NullSink.log("anything");
        TracingSink::new("worker").log("");
        TracingSink::new("worker").log("searching\n");
    }
}

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SettingsError;

/// Sink for failures a slot recovers from.
///
/// Invoked synchronously from `get`/`set`. A reporter must not panic and
/// must not write to the slot that is reporting.
#[derive(Clone)]
pub struct ErrorReporter(Arc<dyn Fn(&SettingsError) + Send + Sync>);

impl ErrorReporter {
    /// Wrap a closure as a reporter.
    pub fn new(report: impl Fn(&SettingsError) + Send + Sync + 'static) -> Self {
        Self(Arc::new(report))
    }

    /// Reporter that logs each failure as a `tracing` warning.
    ///
    /// This is the reporter a [`SlotConfig::default`] uses.
    pub fn tracing() -> Self {
        Self::new(|err| {
            warn!(key = err.key().unwrap_or_default(), error = %err, "setting access failed");
        })
    }

    /// Deliver a failure to the reporter.
    pub fn report(&self, err: &SettingsError) {
        (self.0)(err)
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorReporter(..)")
    }
}

/// What observers see when a write is dropped because it failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DroppedWritePolicy {
    /// Observers are not notified; they keep the last persisted value.
    #[default]
    Suppress,
    /// Observers receive the value the caller tried to write, even though
    /// the store still holds the previous one.
    NotifyIntended,
}

/// Per-slot configuration.
#[derive(Clone, Debug)]
pub struct SlotConfig {
    /// Where recovered failures go. `None` discards them.
    pub reporter: Option<ErrorReporter>,
    /// Notification behavior for failed writes.
    pub dropped_write: DroppedWritePolicy,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            reporter: Some(ErrorReporter::tracing()),
            dropped_write: DroppedWritePolicy::default(),
        }
    }
}

impl SlotConfig {
    /// A configuration that discards every failure.
    pub fn silent() -> Self {
        Self {
            reporter: None,
            ..Default::default()
        }
    }

    /// Replace the reporter.
    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Replace the dropped-write policy.
    pub fn with_dropped_write(mut self, policy: DroppedWritePolicy) -> Self {
        self.dropped_write = policy;
        self
    }
}

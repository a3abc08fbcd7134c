//! Weak bindings from a subscription onto a shared target.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::channel::Subscription;
use crate::error::{Result, SettingsError};

/// A running binding created by [`Subscription::bind_weak`].
///
/// The binding holds its target only weakly. It ends on its own once the
/// target is gone, and is aborted when cancelled or dropped.
#[derive(Debug)]
pub struct WeakBinding {
    task: JoinHandle<()>,
}

impl WeakBinding {
    /// Stop applying values. The underlying subscription is detached.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// `true` until the binding has been cancelled or its target dropped.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for WeakBinding {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<V: Send + 'static> Subscription<V> {
    /// Apply every value delivered to this subscription to `target`.
    ///
    /// Only a `Weak` reference to `target` is kept, so the binding never
    /// extends its lifetime. When a value arrives after the target has been
    /// dropped, the binding ends and the subscription detaches.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind_weak<T, F>(mut self, target: &Arc<T>, apply: F) -> Result<WeakBinding>
    where
        T: Send + Sync + 'static,
        F: Fn(&T, V) + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| SettingsError::NoRuntime)?;
        let target = Arc::downgrade(target);

        let task = handle.spawn(async move {
            while let Some(value) = self.recv().await {
                let Some(target) = target.upgrade() else {
                    trace!("binding target dropped");
                    break;
                };
                apply(&target, value);
            }
            self.detach();
        });

        Ok(WeakBinding { task })
    }
}

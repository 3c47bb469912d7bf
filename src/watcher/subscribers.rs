use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use tracing::warn;

/// A subscription handle that unsubscribes when dropped.
///
/// Holding the handle keeps the callback registered; dropping it removes
/// the subscription deterministically, so repeated setup/teardown cycles
/// never leak subscribers.
pub struct CallbackHandle {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

struct Entry<T> {
    id: usize,
    callback: Arc<dyn Fn(&T) + Send + Sync>,
}

struct RegistryInner<T> {
    next_id: AtomicUsize,
    entries: Mutex<Vec<Entry<T>>>,
    failures: AtomicU64,
}

/// A list of subscribers notified about one kind of event.
///
/// A panicking callback is caught, logged and counted; it never aborts
/// the remaining subscribers or the operation that triggered the
/// notification.
pub struct CallbackRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

impl<T> Clone for CallbackRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallbackRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicUsize::new(1),
                entries: Mutex::new(Vec::new()),
                failures: AtomicU64::new(0),
            }),
        }
    }

    /// How many callbacks have failed since the registry was created.
    pub fn failure_count(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// How many subscribers are currently registered.
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> CallbackRegistry<T> {
    /// Registers a callback and returns the handle that owns the
    /// subscription.
    pub fn register(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> CallbackHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                id,
                callback: Arc::new(callback),
            });

        let registry: Weak<RegistryInner<T>> = Arc::downgrade(&self.inner);
        CallbackHandle {
            cleanup: Some(Box::new(move || {
                if let Some(inner) = registry.upgrade() {
                    inner
                        .entries
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|entry| entry.id != id);
                }
            })),
        }
    }

    /// Invokes every subscriber with `event`, after copying the list out
    /// of the lock so callbacks can re-enter the registry freely.
    ///
    /// Returns the number of callbacks that panicked during this call.
    pub fn notify(&self, event: &T) -> usize {
        let callbacks: Vec<Arc<dyn Fn(&T) + Send + Sync>> = {
            let entries = self
                .inner
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            entries.iter().map(|e| Arc::clone(&e.callback)).collect()
        };

        let mut failed = 0;
        for callback in callbacks {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!("config subscriber callback panicked; continuing with remaining subscribers");
                failed += 1;
            }
        }

        if failed > 0 {
            self.inner.failures.fetch_add(failed as u64, Ordering::Relaxed);
        }
        failed
    }
}

//! The subscription cell: value access, mutation, and notification dispatch.
//!
//! [`SubCell<T>`] pairs a [`Store`] slot with a subscriber set. Every write —
//! [`set`](SubCell::set), [`set_with`](SubCell::set_with),
//! [`update`](SubCell::update), [`mutate`](SubCell::mutate) — ends in exactly
//! one dispatch pass carrying the value that write produced. There is no
//! equality short-circuit: writing a value equal to the current one still
//! notifies.
//!
//! Dispatch snapshots the subscriber set, then invokes each subscriber in
//! registration order. Synchronous callback bodies run inline; futures
//! returned by async subscribers are spawned onto the current tokio runtime
//! and never awaited, so a writer returns without waiting on subscriber work.
//! A panicking subscriber is caught and reported via `tracing`, and delivery
//! continues with the rest of the snapshot.

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::cell::subscriber::{Subscriber, SubscriberSet};
use crate::store::{ReadStore, Store};

// ---------------------------------------------------------------------------
// SubCell
// ---------------------------------------------------------------------------

/// A shared value container with change notification.
///
/// Cloning a `SubCell` creates a new handle to the **same** cell: clones see
/// the same value and share one subscriber set. The cell has no teardown;
/// removing subscribers when they are no longer wanted is the caller's
/// responsibility.
pub struct SubCell<T> {
    store: Store<T>,
    subscribers: Arc<SubscriberSet<T>>,
}

impl<T> Clone for SubCell<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SubCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCell")
            .field("store", &self.store)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T> SubCell<T> {
    /// Create a cell over a shallow store.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::over(Store::new(initial))
    }

    /// Create a cell over a deep store, so in-place edits are visible to
    /// store-level version tracking. Notification semantics are unaffected.
    #[must_use]
    pub fn new_deep(initial: T) -> Self {
        Self::over(Store::new_deep(initial))
    }

    fn over(store: Store<T>) -> Self {
        Self {
            store,
            subscribers: Arc::new(SubscriberSet::new()),
        }
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.store.with(f)
    }

    /// A non-writable view of the underlying store.
    #[must_use]
    pub fn read(&self) -> ReadStore<T> {
        self.store.reader()
    }

    /// Store version number. See [`Store::version`] for what it tracks.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// Whether the underlying store tracks in-place edits.
    #[must_use]
    pub fn is_deep(&self) -> bool {
        self.store.is_deep()
    }

    /// Register a subscriber handle.
    ///
    /// Idempotent: registering a handle that is already present changes
    /// nothing and returns `false`.
    pub fn subscribe(&self, sub: &Subscriber<T>) -> bool {
        self.subscribers.insert(sub)
    }

    /// Unregister a subscriber handle.
    ///
    /// Returns whether it was registered; unregistering an absent handle is
    /// a no-op, not an error.
    pub fn unsubscribe(&self, sub: &Subscriber<T>) -> bool {
        self.subscribers.remove(sub)
    }

    /// Wrap a synchronous callback in a new handle, register it, and return
    /// the handle for later removal.
    pub fn subscribe_fn(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscriber<T> {
        let sub = Subscriber::new(f);
        self.subscribe(&sub);
        sub
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Run one dispatch pass with `value`.
    ///
    /// Works on a snapshot of the subscriber set: registry changes made from
    /// inside a subscriber take effect from the next pass. No registry or
    /// store lock is held while subscribers run, so subscribers may freely
    /// read the cell, write it (the nested pass completes inline), or change
    /// registrations.
    fn dispatch(&self, value: &T) {
        let snapshot = self.subscribers.snapshot();
        for sub in &snapshot {
            // The snapshot is private to this pass, so a panicking callback
            // cannot leave shared state half-written.
            match catch_unwind(AssertUnwindSafe(|| sub.invoke(value))) {
                Ok(Some(continuation)) => match Handle::try_current() {
                    Ok(rt) => {
                        rt.spawn(continuation);
                    }
                    Err(_) => {
                        tracing::warn!(
                            "async subscriber continuation dropped: no tokio runtime on this thread"
                        );
                    }
                },
                Ok(None) => {}
                Err(payload) => {
                    tracing::warn!(
                        panic = panic_message(payload.as_ref()),
                        "subscriber panicked during dispatch; remaining subscribers still notified"
                    );
                }
            }
        }
    }
}

impl<T: Clone> SubCell<T> {
    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.store.get()
    }

    /// Replace the value, then notify.
    ///
    /// The dispatch pass carries the value written by this call, not a later
    /// re-read of the store.
    pub fn set(&self, value: T) {
        let announced = value.clone();
        self.store.set(value);
        self.dispatch(&announced);
    }

    /// Replace the value with a transform of the current one, then notify.
    pub fn set_with(&self, f: impl FnOnce(&T) -> T) {
        let next = self.store.with(f);
        self.set(next);
    }

    /// Edit the value in place, then notify with the edited value.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let after = self.store.with_mut(|value| {
            f(value);
            value.clone()
        });
        self.dispatch(&after);
    }

    /// Asynchronously mutate the value: clone the current value, await the
    /// mutator on it, write the result back, then notify with the result.
    ///
    /// The await is the only suspension point and no lock is held across it.
    /// Writes interleaved during the suspension race with the write-back and
    /// the last write wins; there is no version check.
    pub async fn mutate<F, Fut>(&self, f: F)
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = T>,
    {
        let current = self.store.get();
        let next = f(current).await;
        self.set(next);
    }

    /// Manually run one dispatch pass with the current value.
    ///
    /// Safe no-op when no subscribers are registered.
    pub fn trigger(&self) {
        let current = self.store.get();
        self.dispatch(&current);
    }

    /// Wrap an asynchronous callback in a new handle, register it, and return
    /// the handle for later removal. See [`Subscriber::new_async`].
    pub fn subscribe_async<F, Fut>(&self, f: F) -> Subscriber<T>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let sub = Subscriber::new_async(f);
        self.subscribe(&sub);
        sub
    }
}

/// Best-effort text of a panic payload, for the dispatch warning.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

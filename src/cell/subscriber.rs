//! Subscriber handles and the registration set.
//!
//! A [`Subscriber`] wraps a callback behind a shared pointer; that pointer is
//! the subscriber's identity. Registering the same handle twice counts once
//! (set semantics), while two handles built from byte-identical closures stay
//! distinct. Callers keep the handle around to unregister later.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Pending work returned by an async subscriber. The dispatcher spawns it and
/// never awaits it.
pub(crate) type Continuation = Pin<Box<dyn Future<Output = ()> + Send>>;

type Callback<T> = dyn Fn(&T) -> Option<Continuation> + Send + Sync;

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

/// A registered (or registrable) callback, invoked with each new value.
///
/// Cloning a `Subscriber` clones the handle, not the callback: all clones
/// share one identity, so any of them can be used to unregister.
pub struct Subscriber<T> {
    callback: Arc<Callback<T>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}

impl<T> Subscriber<T> {
    /// Wrap a synchronous callback.
    pub fn new(f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        let callback: Arc<Callback<T>> = Arc::new(move |value: &T| {
            f(value);
            None
        });
        Self { callback }
    }

    /// Wrap an asynchronous callback.
    ///
    /// The closure runs synchronously during dispatch and hands back a future
    /// over a clone of the dispatched value; that future is spawned onto the
    /// current tokio runtime without being awaited.
    pub fn new_async<F, Fut>(f: F) -> Self
    where
        T: Clone,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: Arc<Callback<T>> = Arc::new(move |value: &T| {
            let fut: Continuation = Box::pin(f(value.clone()));
            Some(fut)
        });
        Self { callback }
    }

    /// Whether two handles refer to the same registered callback.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    pub(crate) fn invoke(&self, value: &T) -> Option<Continuation> {
        (self.callback)(value)
    }
}

// ---------------------------------------------------------------------------
// SubscriberSet
// ---------------------------------------------------------------------------

/// Insertion-ordered, duplicate-free set of subscriber handles.
///
/// Dispatch works on a snapshot of the set, so changes made while a pass is
/// running only affect subsequent passes.
pub(crate) struct SubscriberSet<T> {
    entries: Mutex<Vec<Subscriber<T>>>,
}

impl<T> SubscriberSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Insert a handle. Returns `false` (and changes nothing) if the same
    /// handle is already registered.
    pub(crate) fn insert(&self, sub: &Subscriber<T>) -> bool {
        let mut entries = self.entries.lock().expect("subscriber set lock poisoned");
        if entries.iter().any(|existing| existing.same(sub)) {
            return false;
        }
        entries.push(sub.clone());
        true
    }

    /// Remove a handle if present. Returns whether it was registered.
    pub(crate) fn remove(&self, sub: &Subscriber<T>) -> bool {
        let mut entries = self.entries.lock().expect("subscriber set lock poisoned");
        let before = entries.len();
        entries.retain(|existing| !existing.same(sub));
        entries.len() != before
    }

    /// Copy the current entries, in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Subscriber<T>> {
        self.entries
            .lock()
            .expect("subscriber set lock poisoned")
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("subscriber set lock poisoned")
            .len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn handle_clones_share_identity() {
        let a = Subscriber::<i32>::new(|_| {});
        let b = a.clone();
        assert!(a.same(&b));
    }

    #[test]
    fn distinct_handles_differ_even_with_identical_closures() {
        let a = Subscriber::<i32>::new(|_| {});
        let b = Subscriber::<i32>::new(|_| {});
        assert!(!a.same(&b));
    }

    #[test]
    fn sync_invoke_runs_callback_and_returns_no_continuation() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in = Arc::clone(&hits);
        let sub = Subscriber::new(move |value: &i32| {
            hits_in.fetch_add(*value as usize, Ordering::SeqCst);
        });
        assert!(sub.invoke(&3).is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn async_invoke_returns_a_continuation() {
        let sub = Subscriber::new_async(|_value: i32| async {});
        // The continuation is inert until spawned; dropping it here is fine.
        assert!(sub.invoke(&1).is_some());
    }

    #[test]
    fn insert_is_idempotent_per_handle() {
        let set = SubscriberSet::new();
        let sub = Subscriber::<i32>::new(|_| {});
        assert!(set.insert(&sub));
        assert!(!set.insert(&sub));
        assert_eq!(set.len(), 1);

        // A clone is the same handle.
        assert!(!set.insert(&sub.clone()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let set = SubscriberSet::new();
        let registered = Subscriber::<i32>::new(|_| {});
        let stranger = Subscriber::<i32>::new(|_| {});
        set.insert(&registered);

        assert!(!set.remove(&stranger));
        assert_eq!(set.len(), 1);
        assert!(set.remove(&registered));
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn snapshot_is_isolated_from_later_changes() {
        let set = SubscriberSet::new();
        let first = Subscriber::<i32>::new(|_| {});
        set.insert(&first);

        let snapshot = set.snapshot();
        let second = Subscriber::<i32>::new(|_| {});
        set.insert(&second);
        set.remove(&first);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].same(&first));
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let set = SubscriberSet::new();
        let subs: Vec<_> = (0..4).map(|_| Subscriber::<i32>::new(|_| {})).collect();
        for sub in &subs {
            set.insert(sub);
        }
        let snapshot = set.snapshot();
        for (taken, original) in snapshot.iter().zip(&subs) {
            assert!(taken.same(original));
        }
    }
}

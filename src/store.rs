//! Observable value store: versioned slots with optional deep tracking.
//!
//! [`Store<T>`] is the raw storage primitive a [`crate::cell::SubCell`] layers
//! subscriber notification on top of. It owns a single value slot behind
//! shared, reference-counted storage, counts mutations in a version number,
//! and hands out non-writable [`ReadStore`] views for consumers that should
//! observe but never mutate.
//!
//! The `deep` flag is fixed at construction and controls what the version
//! number tracks: a wholesale [`Store::set`] always bumps it, while an
//! in-place edit through [`Store::with_mut`] bumps it only on a deep store.
//! Shallow stores stay blind to nested mutation, which keeps dirty-checking
//! cheap for values that are only ever replaced outright.

use std::fmt;
use std::sync::{Arc, RwLock};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct Slot<T> {
    value: T,
    version: u64,
}

struct Shared<T> {
    slot: RwLock<Slot<T>>,
    deep: bool,
}

/// A shared, version-tracked value slot.
///
/// Cloning a `Store` creates a new handle to the **same** slot: both handles
/// see the same value and version. All locking is internal and never held
/// across user-visible suspension points.
pub struct Store<T> {
    shared: Arc<Shared<T>>,
}

// Manual Clone: shares the same slot, no T: Clone bound.
impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.read().expect("store lock poisoned");
        f.debug_struct("Store")
            .field("value", &slot.value)
            .field("version", &slot.version)
            .field("deep", &self.shared.deep)
            .finish()
    }
}

impl<T> Store<T> {
    /// Create a shallow store: only wholesale replacement is version-tracked.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_tracking(value, false)
    }

    /// Create a deep store: in-place edits are version-tracked too.
    #[must_use]
    pub fn new_deep(value: T) -> Self {
        Self::with_tracking(value, true)
    }

    fn with_tracking(value: T, deep: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: RwLock::new(Slot { value, version: 0 }),
                deep,
            }),
        }
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let slot = self.shared.slot.read().expect("store lock poisoned");
        f(&slot.value)
    }

    /// Replace the stored value. Always bumps the version.
    pub fn set(&self, value: T) {
        let mut slot = self.shared.slot.write().expect("store lock poisoned");
        slot.value = value;
        slot.version += 1;
    }

    /// Edit the stored value in place.
    ///
    /// Bumps the version only on a deep store; a shallow store does not see
    /// nested mutation.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut slot = self.shared.slot.write().expect("store lock poisoned");
        let out = f(&mut slot.value);
        if self.shared.deep {
            slot.version += 1;
        }
        out
    }

    /// Current version number. Starts at 0, increments on each tracked write.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.slot.read().expect("store lock poisoned").version
    }

    /// Whether in-place edits are version-tracked.
    #[must_use]
    pub fn is_deep(&self) -> bool {
        self.shared.deep
    }

    /// A non-writable view of the same slot.
    #[must_use]
    pub fn reader(&self) -> ReadStore<T> {
        ReadStore {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> Store<T> {
    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.shared
            .slot
            .read()
            .expect("store lock poisoned")
            .value
            .clone()
    }
}

// ---------------------------------------------------------------------------
// ReadStore
// ---------------------------------------------------------------------------

/// Read-only handle to a [`Store`] slot.
///
/// Tracks the same underlying value as the store it was created from, but
/// exposes no write surface: the only way to change the value is through a
/// writable handle.
pub struct ReadStore<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ReadStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.read().expect("store lock poisoned");
        f.debug_struct("ReadStore")
            .field("value", &slot.value)
            .field("version", &slot.version)
            .finish()
    }
}

impl<T> ReadStore<T> {
    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let slot = self.shared.slot.read().expect("store lock poisoned");
        f(&slot.value)
    }

    /// Current version number of the underlying slot.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.slot.read().expect("store lock poisoned").version
    }
}

impl<T: Clone> ReadStore<T> {
    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.shared
            .slot
            .read()
            .expect("store lock poisoned")
            .value
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

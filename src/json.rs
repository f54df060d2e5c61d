//! JSON-valued cells: the dynamically-typed boundary.
//!
//! A [`JsonCell`] holds a [`serde_json::Value`] and mirrors the typed
//! [`SubCell`](crate::cell::SubCell) surface. For statically-typed callers
//! the compiler already rules out a missing initial value or an in-place
//! edit of a non-editable target; at a dynamic boundary (state fed from
//! config files, scripts, or IPC) those conditions are real runtime inputs,
//! so this module keeps the runtime guards:
//!
//! - construction from `null` fails with [`JsonCellError::MissingInitial`];
//! - [`update`](JsonCell::update) and [`mutate`](JsonCell::mutate) require
//!   the current value to be a composite (object or array) and fail with
//!   [`JsonCellError::NotComposite`] otherwise, without writing or
//!   notifying.
//!
//! Only construction is guarded against `null`: a later `set(Value::Null)`
//! is accepted, and in-place mutation simply becomes unavailable until a
//! composite value is set again.

use std::future::Future;

use serde_json::Value;

use crate::cell::{SubCell, Subscriber};
use crate::store::ReadStore;

/// Errors from the dynamically-typed cell surface.
#[derive(Debug, thiserror::Error)]
pub enum JsonCellError {
    #[error("an initial value is required, got null")]
    MissingInitial,
    #[error("in-place mutation requires an object or array, got {kind}")]
    NotComposite { kind: &'static str },
}

/// Name of a JSON value's runtime type, for error messages.
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_composite(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

// ---------------------------------------------------------------------------
// JsonCell
// ---------------------------------------------------------------------------

/// A subscription cell over a JSON value, with runtime type guards.
///
/// Clones share the same cell, exactly like [`SubCell`].
#[derive(Debug, Clone)]
pub struct JsonCell {
    cell: SubCell<Value>,
}

impl JsonCell {
    /// Create a cell over a shallow store. Fails on `null`.
    pub fn new(initial: Value) -> Result<Self, JsonCellError> {
        Self::guard_initial(&initial)?;
        Ok(Self {
            cell: SubCell::new(initial),
        })
    }

    /// Create a cell over a deep store. Fails on `null`.
    pub fn new_deep(initial: Value) -> Result<Self, JsonCellError> {
        Self::guard_initial(&initial)?;
        Ok(Self {
            cell: SubCell::new_deep(initial),
        })
    }

    fn guard_initial(initial: &Value) -> Result<(), JsonCellError> {
        if initial.is_null() {
            return Err(JsonCellError::MissingInitial);
        }
        Ok(())
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> Value {
        self.cell.get()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        self.cell.with(f)
    }

    /// Replace the value, then notify.
    pub fn set(&self, value: Value) {
        self.cell.set(value);
    }

    /// Replace the value with a transform of the current one, then notify.
    pub fn set_with(&self, f: impl FnOnce(&Value) -> Value) {
        self.cell.set_with(f);
    }

    /// A non-writable view of the underlying store.
    #[must_use]
    pub fn read(&self) -> ReadStore<Value> {
        self.cell.read()
    }

    /// Edit the value in place, then notify with the edited value.
    ///
    /// Fails without writing or notifying when the current value is not a
    /// composite.
    pub fn update(&self, f: impl FnOnce(&mut Value)) -> Result<(), JsonCellError> {
        self.guard_composite()?;
        self.cell.update(f);
        Ok(())
    }

    /// Asynchronously mutate the value, then notify with the result.
    ///
    /// The composite guard runs before the mutator: on a scalar nothing is
    /// invoked, written, or dispatched. See [`SubCell::mutate`] for the
    /// suspension semantics.
    pub async fn mutate<F, Fut>(&self, f: F) -> Result<(), JsonCellError>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Value>,
    {
        self.guard_composite()?;
        self.cell.mutate(f).await;
        Ok(())
    }

    fn guard_composite(&self) -> Result<(), JsonCellError> {
        self.cell.with(|value| {
            if is_composite(value) {
                Ok(())
            } else {
                Err(JsonCellError::NotComposite {
                    kind: kind_of(value),
                })
            }
        })
    }

    /// Register a subscriber handle. Idempotent per handle.
    pub fn subscribe(&self, sub: &Subscriber<Value>) -> bool {
        self.cell.subscribe(sub)
    }

    /// Unregister a subscriber handle. No-op if absent.
    pub fn unsubscribe(&self, sub: &Subscriber<Value>) -> bool {
        self.cell.unsubscribe(sub)
    }

    /// Wrap, register, and return a synchronous subscriber.
    pub fn subscribe_fn(&self, f: impl Fn(&Value) + Send + Sync + 'static) -> Subscriber<Value> {
        self.cell.subscribe_fn(f)
    }

    /// Wrap, register, and return an asynchronous subscriber.
    pub fn subscribe_async<F, Fut>(&self, f: F) -> Subscriber<Value>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cell.subscribe_async(f)
    }

    /// Manually run one dispatch pass with the current value.
    pub fn trigger(&self) {
        self.cell.trigger();
    }

    /// Store version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.cell.version()
    }

    /// Whether the underlying store tracks in-place edits.
    #[must_use]
    pub fn is_deep(&self) -> bool {
        self.cell.is_deep()
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    fn logging_cell(initial: Value) -> (JsonCell, Arc<Mutex<Vec<Value>>>) {
        let cell = JsonCell::new(initial).expect("non-null initial");
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        cell.subscribe_fn(move |value| sink.lock().unwrap().push(value.clone()));
        (cell, log)
    }

    #[test]
    fn null_initial_is_rejected() {
        assert!(matches!(
            JsonCell::new(Value::Null),
            Err(JsonCellError::MissingInitial)
        ));
        assert!(matches!(
            JsonCell::new_deep(Value::Null),
            Err(JsonCellError::MissingInitial)
        ));
    }

    #[test]
    fn scalar_initial_is_accepted() {
        let cell = JsonCell::new(json!("hello")).unwrap();
        assert_eq!(cell.get(), json!("hello"));
    }

    #[test]
    fn set_and_set_with_notify() {
        let (cell, log) = logging_cell(json!("hello"));
        cell.set(json!("world"));
        cell.set_with(|v| json!(format!("{}!", v.as_str().unwrap())));
        assert_eq!(cell.get(), json!("world!"));
        assert_eq!(*log.lock().unwrap(), vec![json!("world"), json!("world!")]);
    }

    #[test]
    fn update_on_scalar_fails_without_dispatch() {
        let (cell, log) = logging_cell(json!(5));
        let result = cell.update(|v| *v = json!(6));
        assert!(matches!(
            result,
            Err(JsonCellError::NotComposite { kind: "a number" })
        ));
        assert_eq!(cell.get(), json!(5));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn update_on_object_edits_and_notifies() {
        let (cell, log) = logging_cell(json!({"a": 1}));
        cell.update(|v| v["a"] = json!(2)).unwrap();
        assert_eq!(cell.get(), json!({"a": 2}));
        assert_eq!(*log.lock().unwrap(), vec![json!({"a": 2})]);
    }

    #[test]
    fn mutate_on_scalar_fails_without_running_mutator() {
        let (cell, log) = logging_cell(json!("text"));
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in = Arc::clone(&ran);
        let result = tokio_test::block_on(cell.mutate(move |v| {
            ran_in.store(true, Ordering::SeqCst);
            async move { v }
        }));
        assert!(matches!(
            result,
            Err(JsonCellError::NotComposite { kind: "a string" })
        ));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(cell.get(), json!("text"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn mutate_on_object_writes_back_and_notifies_once() {
        let (cell, log) = logging_cell(json!({"a": 1}));
        tokio_test::block_on(cell.mutate(|mut value| async move {
            value["a"] = json!(2);
            value
        }))
        .unwrap();
        assert_eq!(cell.get(), json!({"a": 2}));
        assert_eq!(*log.lock().unwrap(), vec![json!({"a": 2})]);
    }

    #[test]
    fn mutate_on_array_is_allowed() {
        let (cell, log) = logging_cell(json!([1, 2]));
        tokio_test::block_on(cell.mutate(|mut value| async move {
            value.as_array_mut().unwrap().push(json!(3));
            value
        }))
        .unwrap();
        assert_eq!(cell.get(), json!([1, 2, 3]));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn set_null_disables_in_place_mutation() {
        let (cell, _log) = logging_cell(json!({"a": 1}));
        cell.set(Value::Null);
        let result = cell.update(|_| {});
        assert!(matches!(
            result,
            Err(JsonCellError::NotComposite { kind: "null" })
        ));
    }

    #[test]
    fn error_messages_name_the_kind() {
        let err = JsonCell::new(json!(true)).unwrap().update(|_| {}).unwrap_err();
        assert_eq!(
            err.to_string(),
            "in-place mutation requires an object or array, got a boolean"
        );
        assert_eq!(
            JsonCellError::MissingInitial.to_string(),
            "an initial value is required, got null"
        );
    }

    #[test]
    fn read_view_and_version() {
        let cell = JsonCell::new(json!({"n": 0})).unwrap();
        let view = cell.read();
        cell.set(json!({"n": 1}));
        assert_eq!(view.get(), json!({"n": 1}));
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn deep_cell_tracks_updates() {
        let cell = JsonCell::new_deep(json!({"n": 0})).unwrap();
        assert!(cell.is_deep());
        cell.update(|v| v["n"] = json!(1)).unwrap();
        assert_eq!(cell.version(), 1);
    }
}

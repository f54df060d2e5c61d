//! # subcell
//!
//! Shared subscription cells: observable values with change notification.
//!
//! A [`SubCell<T>`] owns a current value and a set of subscribers. Reading
//! never notifies; every write — wholesale replacement, transform, in-place
//! edit, or async mutation — runs exactly one dispatch pass that hands the
//! written value to each registered subscriber. Subscribers can be plain
//! closures or async callbacks whose futures are spawned fire-and-forget on
//! the current tokio runtime.
//!
//! ## Core Systems
//!
//! - **[`store`]** — Observable value store: versioned slots with optional
//!   deep tracking and non-writable [`ReadStore`] views
//! - **[`cell`]** — The subscription cell: subscriber registry, snapshot
//!   dispatch, mutation protocol
//! - **[`json`]** — JSON-valued cells keeping runtime type guards for
//!   dynamically-typed callers
//!
//! ## Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use subcell::SubCell;
//!
//! let cell = SubCell::new(String::from("hello"));
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&log);
//! cell.subscribe_fn(move |value| sink.lock().unwrap().push(value.clone()));
//!
//! cell.set(String::from("world"));
//! cell.set_with(|value| format!("{value}!"));
//!
//! assert_eq!(cell.get(), "world!");
//! assert_eq!(*log.lock().unwrap(), ["world", "world!"]);
//! ```

pub mod cell;
pub mod json;
pub mod store;

pub use cell::{SubCell, Subscriber};
pub use json::{JsonCell, JsonCellError};
pub use store::{ReadStore, Store};

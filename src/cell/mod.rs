//! Subscription cells: subscriber registry and notification dispatch.
//!
//! - [`SubCell`] — shared value container whose writes each trigger one
//!   dispatch pass over the registered subscribers.
//! - [`Subscriber`] — callback handle with pointer identity; registration is
//!   a set operation keyed on the handle.

pub mod sub_cell;
pub mod subscriber;

pub use sub_cell::SubCell;
pub use subscriber::Subscriber;

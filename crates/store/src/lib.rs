//! Sieve Store - Client-side record store with live filtered views.
//!
//! This crate wires the record store, the view registry and an optional
//! fetch adapter together behind one `Store` handle.
//!
//! # Core Components
//!
//! - `Store`: Loads and mutates records, and creates filtered views
//! - `FilterConfig`: Predicate, optional server query and adapter options
//! - `PendingFilter`: A view whose server fetch may still be outstanding
//! - `Adapter`: Fetches records for a server query
//! - `StoreConfig`: Store-wide settings
//!
//! # Example
//!
//! ```rust
//! use sieve_store::{FilterConfig, Store, StoreConfig};
//!
//! let store = Store::new(StoreConfig::default());
//! store.define_model("post");
//!
//! let is_unread = |post: &sieve_store::Record| post.get("unread").and_then(|v| v.as_bool()) == Some(true);
//! let unread = store
//!     .filter("post", FilterConfig::new(is_unread))
//!     .unwrap()
//!     .view()
//!     .clone();
//!
//! let id = store.create_record("post", [("unread", true)]).unwrap();
//! assert_eq!(unread.len(), 1);
//!
//! store.set_attribute(id, "unread", false).unwrap();
//! assert_eq!(unread.len(), 0);
//! ```

pub mod adapter;
pub mod config;
pub mod pending;
pub mod store;

pub use adapter::Adapter;
pub use config::{FilterConfig, StoreConfig};
pub use pending::PendingFilter;
pub use store::Store;

// Re-export commonly used types from dependencies
pub use sieve_core::{
    Document, Error, Query, Record, RecordData, RecordId, RecordState, Result, TypeKey, Value,
};
pub use sieve_reactive::{ChangeSet, Predicate, SubscriptionId, View, ViewState};

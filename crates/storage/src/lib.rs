//! Sieve Storage - In-memory superset collections for Sieve.
//!
//! This crate provides the record store that derived views read from:
//!
//! - `RecordCollection`: All records of one model type, ordered by id
//! - `RecordStore`: Every collection of a store, plus document push and
//!   record lifecycle mutations
//! - `SharedRecordStore`: A cloneable handle implementing `RecordSource`
//!   with short-lived borrows
//!
//! # Example
//!
//! ```rust
//! use sieve_core::RecordData;
//! use sieve_storage::RecordStore;
//!
//! let mut store = RecordStore::new();
//! store.register_type("person");
//!
//! store
//!     .push(RecordData::new("1", "person").attribute("name", "Tom Dale"))
//!     .unwrap();
//!
//! let tom = store.peek("person", "1").unwrap();
//! assert_eq!(tom.get_str("name"), Some("Tom Dale"));
//! ```

#![no_std]

extern crate alloc;

pub mod collection;
pub mod shared;
pub mod store;

pub use collection::RecordCollection;
pub use shared::SharedRecordStore;
pub use store::{RecordStore, Touched};

//! Sieve Reactive - Live filtered views over a record store.
//!
//! A filtered view holds the members of one model type's superset that
//! satisfy a caller predicate, and keeps that membership current as records
//! are created, loaded, updated, deleted or unloaded.
//!
//! # Core Concepts
//!
//! - `View`: A read-only, live list of the records matching a predicate
//! - `ChangeSet`: Membership changes delivered to subscribers (added, removed, modified)
//! - `ViewRegistry`: Routes record changes to the views of their type
//! - `BatchScheduler` / `BatchScope`: Coalesce many changes into one recomputation
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use sieve_core::Record;
//! use sieve_reactive::ViewRegistry;
//! use sieve_storage::SharedRecordStore;
//!
//! let store = SharedRecordStore::new();
//! store.borrow_mut().register_type("person");
//! let registry = ViewRegistry::new(Rc::new(store.clone()));
//!
//! let view = registry
//!     .create_view(
//!         "person",
//!         Rc::new(|r: &Record| r.get_str("name").is_some_and(|n| n.contains('a'))),
//!         None,
//!     )
//!     .unwrap();
//! view.subscribe(|changes| println!("{} entered", changes.added.len()));
//!
//! let mut attributes = std::collections::BTreeMap::new();
//! attributes.insert("name".into(), "Dale".into());
//! let touched = store.borrow_mut().create_record("person", attributes).unwrap();
//! registry.notify_record_changed(touched.type_key, touched.id);
//!
//! assert_eq!(view.len(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod batch;
pub mod change_set;
pub mod registry;
pub mod subscription;
pub mod view;

pub use batch::{BatchScheduler, BatchScope, PendingWork, Work};
pub use change_set::ChangeSet;
pub use registry::ViewRegistry;
pub use subscription::{
    ChangeCallback, LengthCallback, Listener, Subscription, SubscriptionId, SubscriptionManager,
};
pub use view::{FilteredView, Predicate, View, ViewId, ViewState};

// Re-export commonly used types from dependencies
pub use sieve_core::{Record, RecordId, TypeKey};

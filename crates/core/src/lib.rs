//! Sieve Core - Record types and collaborator contracts for Sieve.
//!
//! This crate provides the foundational types shared by the record store and
//! the live filtered-view engine:
//!
//! - `Value`: Attribute values carried by records
//! - `Record`: An immutable snapshot of one record with identity and liveness
//! - `RecordData` / `Document`: Resource documents pushed into a store
//! - `RecordSource`: The read-only contract a store exposes to derived views
//! - `Error`: Error types shared across the workspace
//!
//! # Example
//!
//! ```rust
//! use sieve_core::{Record, RecordState, Value};
//!
//! let record = Record::new(1, 0)
//!     .with_attribute("name", "Scumbag Dale")
//!     .with_relationship("bestFriend", Some(2));
//!
//! assert!(record.is_live());
//! assert_eq!(record.get_str("name"), Some("Scumbag Dale"));
//! assert_eq!(record.related("bestFriend"), Some(2));
//! assert_eq!(record.state(), RecordState::Loaded);
//! assert_eq!(record.get("missing"), None::<&Value>);
//! ```

#![no_std]

extern crate alloc;

mod document;
mod error;
mod record;
mod source;
mod value;

pub use document::{Document, DocumentData, RecordData, RelationshipData, ResourceIdentifier};
pub use error::{Error, Result};
pub use record::{Record, RecordId, RecordState, TypeKey};
pub use source::RecordSource;
pub use value::{Query, Value};

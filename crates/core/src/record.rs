//! Record structure for Sieve.
//!
//! A `Record` is an immutable snapshot of one member of a superset
//! collection. Stores replace the snapshot on every mutation, so an
//! `Rc<Record>` held by a derived view can be compared by pointer to detect
//! that the record changed underneath it.

use crate::value::Value;
use alloc::collections::BTreeMap;
use alloc::string::String;

/// Unique identifier for a record within one store.
///
/// Identifiers are assigned monotonically, so ascending id order is also the
/// order in which records entered the store.
pub type RecordId = u64;

/// Key identifying one superset collection (one model type).
pub type TypeKey = u32;

/// Liveness of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordState {
    /// Populated with data.
    Loaded,
    /// Reserved by identity but not yet populated (for example pending a fetch).
    Empty,
    /// Marked deleted; still present in the superset until unloaded.
    Deleted,
}

/// A record in a superset collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    id: RecordId,
    type_key: TypeKey,
    /// Server-side identity, if the record came from a pushed document.
    remote_id: Option<String>,
    state: RecordState,
    /// Incremented on each update.
    version: u64,
    attributes: BTreeMap<String, Value>,
    relationships: BTreeMap<String, Option<RecordId>>,
}

impl Record {
    /// Creates a new loaded record with no attributes.
    /// Version defaults to 1 for new records.
    pub fn new(id: RecordId, type_key: TypeKey) -> Self {
        Self {
            id,
            type_key,
            remote_id: None,
            state: RecordState::Loaded,
            version: 1,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Creates an empty placeholder record for a known remote identity.
    pub fn placeholder(id: RecordId, type_key: TypeKey, remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            state: RecordState::Empty,
            ..Self::new(id, type_key)
        }
    }

    /// Sets the remote identity.
    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    /// Sets an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets a relationship.
    pub fn with_relationship(mut self, name: impl Into<String>, target: Option<RecordId>) -> Self {
        self.relationships.insert(name.into(), target);
        self
    }

    /// Returns the record ID.
    #[inline]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the type key of the superset this record belongs to.
    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Returns the remote identity, if any.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    /// Returns the liveness state.
    #[inline]
    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Returns the version number.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the record is neither deleted nor a placeholder.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.state == RecordState::Loaded
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.state == RecordState::Deleted
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.state == RecordState::Empty
    }

    /// Gets an attribute value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Gets a string attribute by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns the target of a relationship, None if unset or null.
    pub fn related(&self, name: &str) -> Option<RecordId> {
        self.relationships.get(name).copied().flatten()
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn relationships(&self) -> &BTreeMap<String, Option<RecordId>> {
        &self.relationships
    }

    /// Sets an attribute value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Sets a relationship target.
    pub fn set_relationship(&mut self, name: impl Into<String>, target: Option<RecordId>) {
        self.relationships.insert(name.into(), target);
    }

    /// Sets the liveness state.
    pub fn set_state(&mut self, state: RecordState) {
        self.state = state;
    }

    /// Sets the remote identity.
    pub fn set_remote_id(&mut self, remote_id: impl Into<String>) {
        self.remote_id = Some(remote_id.into());
    }

    /// Increments the version number and returns the new value.
    #[inline]
    pub fn increment_version(&mut self) -> u64 {
        self.version = self.version.wrapping_add(1);
        self.version
    }
}

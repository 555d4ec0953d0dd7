//! Record storage for one model type.
//!
//! This module provides the `RecordCollection` struct which holds the
//! superset of one type, keyed by record id, plus the remote id index used to
//! upsert pushed documents.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use sieve_core::{Record, RecordId, TypeKey};

/// All records of one model type.
pub struct RecordCollection {
    type_key: TypeKey,
    model_name: String,
    /// Record ID -> current snapshot. Ascending id order is superset order.
    records: BTreeMap<RecordId, Rc<Record>>,
    /// Remote id -> record ID.
    remote_ids: HashMap<String, RecordId>,
}

impl RecordCollection {
    /// Creates an empty collection.
    pub fn new(type_key: TypeKey, model_name: impl Into<String>) -> Self {
        Self {
            type_key,
            model_name: model_name.into(),
            records: BTreeMap::new(),
            remote_ids: HashMap::new(),
        }
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    #[inline]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Returns the number of records, placeholders and deleted ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gets a record snapshot by ID.
    pub fn get(&self, id: RecordId) -> Option<Rc<Record>> {
        self.records.get(&id).cloned()
    }

    /// Returns true if the collection holds the record.
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// Looks up a record ID by remote id.
    pub fn lookup(&self, remote_id: &str) -> Option<RecordId> {
        self.remote_ids.get(remote_id).copied()
    }

    /// Inserts or replaces a record, returning the stored snapshot.
    pub fn put(&mut self, record: Record) -> Rc<Record> {
        if let Some(remote_id) = record.remote_id() {
            self.remote_ids.insert(remote_id.into(), record.id());
        }
        let record = Rc::new(record);
        self.records.insert(record.id(), record.clone());
        record
    }

    /// Removes a record, returning its last snapshot.
    pub fn remove(&mut self, id: RecordId) -> Option<Rc<Record>> {
        let removed = self.records.remove(&id)?;
        if let Some(remote_id) = removed.remote_id() {
            self.remote_ids.remove(remote_id);
        }
        Some(removed)
    }

    /// Iterates over current snapshots in superset order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Record>> {
        self.records.values()
    }

    /// Returns current snapshots in superset order.
    pub fn snapshot(&self) -> Vec<Rc<Record>> {
        self.records.values().cloned().collect()
    }
}

//! Record store for Sieve.
//!
//! This module provides the `RecordStore` struct which manages one
//! `RecordCollection` per model type and applies every mutation the
//! filtered views must hear about. Each mutation returns the records it
//! touched so the caller can route change signals to derived views.

use crate::collection::RecordCollection;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use sieve_core::{
    Error, Record, RecordData, RecordId, RecordSource, RecordState, Result, TypeKey, Value,
};

/// A record touched by a store mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Touched {
    pub type_key: TypeKey,
    pub id: RecordId,
}

/// Superset collections of every registered model type.
pub struct RecordStore {
    /// Indexed by type key.
    collections: Vec<RecordCollection>,
    /// Model name -> type key.
    names: HashMap<String, TypeKey>,
    /// Record ID -> owning type key.
    owners: HashMap<RecordId, TypeKey>,
    /// Relationship target -> records pointing at it.
    referrers: HashMap<RecordId, BTreeSet<RecordId>>,
    next_id: RecordId,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            collections: Vec::new(),
            names: HashMap::new(),
            owners: HashMap::new(),
            referrers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a model type, returning its key. Idempotent.
    pub fn register_type(&mut self, name: &str) -> TypeKey {
        if let Some(&key) = self.names.get(name) {
            return key;
        }
        let key = self.collections.len() as TypeKey;
        self.collections.push(RecordCollection::new(key, name));
        self.names.insert(name.into(), key);
        key
    }

    /// Resolves a model name to its type key.
    pub fn resolve_type(&self, name: &str) -> Result<TypeKey> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| Error::unknown_type(name))
    }

    /// Returns the model name of a type key.
    pub fn model_name(&self, key: TypeKey) -> Option<&str> {
        self.collection(key).map(RecordCollection::model_name)
    }

    /// Gets the collection of a type.
    pub fn collection(&self, key: TypeKey) -> Option<&RecordCollection> {
        self.collections.get(key as usize)
    }

    /// Returns the number of registered types.
    pub fn type_count(&self) -> usize {
        self.collections.len()
    }

    /// Returns the number of records of a type.
    pub fn len(&self, key: TypeKey) -> usize {
        self.collection(key).map(RecordCollection::len).unwrap_or(0)
    }

    /// Returns true if no type holds any record.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Returns all records of a type in superset order.
    pub fn all(&self, key: TypeKey) -> Vec<Rc<Record>> {
        self.collection(key)
            .map(RecordCollection::snapshot)
            .unwrap_or_default()
    }

    /// Gets a record by ID, whatever its type.
    pub fn get(&self, id: RecordId) -> Option<Rc<Record>> {
        let key = self.type_of(id)?;
        self.collection(key)?.get(id)
    }

    /// Returns the type key owning a record.
    pub fn type_of(&self, id: RecordId) -> Option<TypeKey> {
        self.owners.get(&id).copied()
    }

    /// Returns the records whose relationships point at `id`, in id order.
    pub fn referrers_of(&self, id: RecordId) -> Vec<Touched> {
        self.referrers
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|&id| {
                let type_key = self.type_of(id)?;
                Some(Touched { type_key, id })
            })
            .collect()
    }

    /// Returns the records pointing at any of `touched` that are not
    /// themselves touched. A change to a related record can change how a
    /// predicate reading through the relationship sees these records.
    pub fn dependents(&self, touched: &[Touched]) -> Vec<Touched> {
        let mut seen: BTreeSet<RecordId> = touched.iter().map(|t| t.id).collect();
        let mut dependents = Vec::new();
        for t in touched {
            for referrer in self.referrers_of(t.id) {
                if seen.insert(referrer.id) {
                    dependents.push(referrer);
                }
            }
        }
        dependents
    }

    /// Gets a record by model name and remote id.
    pub fn peek(&self, name: &str, remote_id: &str) -> Option<Rc<Record>> {
        let collection = self.collection(self.resolve_type(name).ok()?)?;
        collection.get(collection.lookup(remote_id)?)
    }

    /// Loads a resource, creating or updating the record with its remote id.
    ///
    /// Related records that are not yet known are reserved as placeholders.
    /// Returns every touched record, placeholders first.
    pub fn push(&mut self, data: RecordData) -> Result<Vec<Touched>> {
        let key = self.resolve_type(&data.model)?;
        if data.id.is_empty() {
            return Err(Error::invalid_document(format!(
                "resource of type '{}' has an empty id",
                data.model
            )));
        }

        let mut touched = Vec::new();
        let mut relationships = BTreeMap::new();
        for (name, linkage) in data.relationships {
            let target = match linkage.data {
                Some(ident) => Some(self.reserve_into(&ident.model, &ident.id, &mut touched)?),
                None => None,
            };
            relationships.insert(name, target);
        }

        let existing = {
            let collection = &self.collections[key as usize];
            collection.lookup(&data.id).and_then(|id| collection.get(id))
        };
        let mut record = match existing {
            Some(existing) => {
                let mut record = (*existing).clone();
                record.increment_version();
                record
            }
            None => Record::new(self.allocate_id(), key).with_remote_id(data.id),
        };
        record.set_state(RecordState::Loaded);
        for (name, value) in data.attributes {
            record.set_attribute(name, value);
        }
        for (name, target) in relationships {
            record.set_relationship(name, target);
        }

        touched.push(self.store(key, record));
        Ok(touched)
    }

    /// Creates a local record with no remote id.
    pub fn create_record(
        &mut self,
        name: &str,
        attributes: BTreeMap<String, Value>,
    ) -> Result<Touched> {
        let key = self.resolve_type(name)?;
        let mut record = Record::new(self.allocate_id(), key);
        for (name, value) in attributes {
            record.set_attribute(name, value);
        }
        Ok(self.store(key, record))
    }

    /// Reserves an empty placeholder for a remote id, or returns the existing
    /// record with that id.
    pub fn reserve(&mut self, name: &str, remote_id: &str) -> Result<Touched> {
        let mut touched = Vec::new();
        let id = self.reserve_into(name, remote_id, &mut touched)?;
        let type_key = self.resolve_type(name)?;
        Ok(Touched { type_key, id })
    }

    /// Sets an attribute on a record.
    pub fn set_attribute(&mut self, id: RecordId, name: &str, value: Value) -> Result<Touched> {
        self.update(id, |record| record.set_attribute(name, value))
    }

    /// Points a relationship at another record, or clears it.
    pub fn set_relationship(
        &mut self,
        id: RecordId,
        name: &str,
        target: Option<RecordId>,
    ) -> Result<Touched> {
        if let Some(target) = target {
            if !self.owners.contains_key(&target) {
                return Err(Error::record_not_found(target));
            }
        }
        self.update(id, |record| record.set_relationship(name, target))
    }

    /// Marks a record deleted. It stays in the superset until unloaded.
    pub fn delete_record(&mut self, id: RecordId) -> Result<Touched> {
        self.update(id, |record| record.set_state(RecordState::Deleted))
    }

    /// Removes a record from its superset.
    pub fn unload_record(&mut self, id: RecordId) -> Result<Touched> {
        let type_key = self.owners.remove(&id).ok_or_else(|| Error::record_not_found(id))?;
        if let Some(removed) = self.collections[type_key as usize].remove(id) {
            self.unlink(&removed);
        }
        Ok(Touched { type_key, id })
    }

    /// Replaces a record's snapshot with a mutated copy.
    fn update(&mut self, id: RecordId, mutate: impl FnOnce(&mut Record)) -> Result<Touched> {
        let current = self.get(id).ok_or_else(|| Error::record_not_found(id))?;
        let mut record = (*current).clone();
        mutate(&mut record);
        record.increment_version();
        Ok(self.store(record.type_key(), record))
    }

    fn reserve_into(
        &mut self,
        name: &str,
        remote_id: &str,
        touched: &mut Vec<Touched>,
    ) -> Result<RecordId> {
        let key = self.resolve_type(name)?;
        if let Some(id) = self.collections[key as usize].lookup(remote_id) {
            return Ok(id);
        }
        let record = Record::placeholder(self.allocate_id(), key, remote_id);
        let stored = self.store(key, record);
        touched.push(stored);
        Ok(stored.id)
    }

    fn store(&mut self, key: TypeKey, record: Record) -> Touched {
        let id = record.id();
        if let Some(previous) = self.collections[key as usize].get(id) {
            self.unlink(&previous);
        }
        for target in record.relationships().values().flatten() {
            self.referrers.entry(*target).or_default().insert(id);
        }
        self.owners.insert(id, key);
        self.collections[key as usize].put(record);
        Touched { type_key: key, id }
    }

    /// Drops the inverse edges of a record's relationships.
    fn unlink(&mut self, record: &Record) {
        for target in record.relationships().values().flatten() {
            if let Some(referrers) = self.referrers.get_mut(target) {
                referrers.remove(&record.id());
                if referrers.is_empty() {
                    self.referrers.remove(target);
                }
            }
        }
    }

    fn allocate_id(&mut self) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl RecordSource for RecordStore {
    fn resolve_type(&self, name: &str) -> Result<TypeKey> {
        RecordStore::resolve_type(self, name)
    }

    fn model_name(&self, key: TypeKey) -> Option<String> {
        RecordStore::model_name(self, key).map(Into::into)
    }

    fn all_members_of(&self, key: TypeKey) -> Vec<Rc<Record>> {
        self.all(key)
    }

    fn record(&self, key: TypeKey, id: RecordId) -> Option<Rc<Record>> {
        self.collection(key)?.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_core::Document;

    fn people() -> RecordStore {
        let mut store = RecordStore::new();
        store.register_type("person");
        store
    }

    #[test]
    fn test_register_type_is_idempotent() {
        let mut store = RecordStore::new();
        let a = store.register_type("person");
        let b = store.register_type("person");
        let c = store.register_type("post");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.type_count(), 2);
        assert_eq!(store.model_name(c), Some("post"));
    }

    #[test]
    fn test_resolve_unknown_type() {
        let store = people();
        assert_eq!(
            store.resolve_type("dog"),
            Err(Error::UnknownType { name: "dog".into() })
        );
    }

    #[test]
    fn test_push_creates_then_updates() {
        let mut store = people();
        let first = store
            .push(RecordData::new("1", "person").attribute("name", "Tom Dale"))
            .unwrap();
        let second = store
            .push(RecordData::new("1", "person").attribute("name", "Yehuda Katz"))
            .unwrap();

        assert_eq!(first, second);
        let person = store.peek("person", "1").unwrap();
        assert_eq!(person.get_str("name"), Some("Yehuda Katz"));
        assert_eq!(person.version(), 2);
        assert_eq!(store.len(first[0].type_key), 1);
    }

    #[test]
    fn test_push_reserves_related_placeholders() {
        let mut store = people();
        let touched = store
            .push(
                RecordData::new("1", "person")
                    .attribute("name", "Scumbag Dale")
                    .relationship("bestFriend", Some(("2", "person"))),
            )
            .unwrap();

        assert_eq!(touched.len(), 2);
        let katz = store.peek("person", "2").unwrap();
        assert!(katz.is_placeholder());
        let dale = store.peek("person", "1").unwrap();
        assert_eq!(dale.related("bestFriend"), Some(katz.id()));

        // Loading the placeholder keeps its identity
        store
            .push(RecordData::new("2", "person").attribute("name", "Scumbag Katz"))
            .unwrap();
        let loaded = store.peek("person", "2").unwrap();
        assert_eq!(loaded.id(), katz.id());
        assert!(loaded.is_live());
    }

    #[test]
    fn test_push_document_from_json() {
        let mut store = people();
        let doc: Document = serde_json::from_str(
            r#"{"data": [{"id": "1", "type": "person", "attributes": {"name": "A"}},
                         {"id": "2", "type": "person", "attributes": {"name": "B"}}]}"#,
        )
        .unwrap();
        for data in doc.into_records() {
            store.push(data).unwrap();
        }
        let key = store.resolve_type("person").unwrap();
        let names: Vec<_> = store
            .all(key)
            .iter()
            .map(|r| String::from(r.get_str("name").unwrap()))
            .collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn test_push_rejects_empty_id_and_unknown_type() {
        let mut store = people();
        assert!(matches!(
            store.push(RecordData::new("", "person")),
            Err(Error::InvalidDocument { .. })
        ));
        assert!(matches!(
            store.push(RecordData::new("1", "dog")),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn test_create_and_mutate_record() {
        let mut store = people();
        let touched = store.create_record("person", BTreeMap::new()).unwrap();
        store
            .set_attribute(touched.id, "name", Value::from("Scumbag Koz"))
            .unwrap();

        let record = store.get(touched.id).unwrap();
        assert_eq!(record.get_str("name"), Some("Scumbag Koz"));
        assert_eq!(record.remote_id(), None);
        assert_eq!(record.version(), 2);
    }

    #[test]
    fn test_set_relationship_requires_target() {
        let mut store = people();
        let a = store.create_record("person", BTreeMap::new()).unwrap();
        assert_eq!(
            store.set_relationship(a.id, "bestFriend", Some(99)),
            Err(Error::RecordNotFound { id: 99 })
        );
        let b = store.create_record("person", BTreeMap::new()).unwrap();
        store.set_relationship(a.id, "bestFriend", Some(b.id)).unwrap();
        assert_eq!(store.get(a.id).unwrap().related("bestFriend"), Some(b.id));
    }

    #[test]
    fn test_delete_then_unload() {
        let mut store = people();
        let touched = store.create_record("person", BTreeMap::new()).unwrap();

        store.delete_record(touched.id).unwrap();
        assert!(store.get(touched.id).unwrap().is_deleted());
        assert_eq!(store.len(touched.type_key), 1);

        store.unload_record(touched.id).unwrap();
        assert!(store.get(touched.id).is_none());
        assert_eq!(store.len(touched.type_key), 0);
        assert!(store.is_empty());
        assert_eq!(
            store.unload_record(touched.id),
            Err(Error::RecordNotFound { id: touched.id })
        );
    }

    #[test]
    fn test_referrers_follow_relationships() {
        let mut store = people();
        let dale = store.create_record("person", BTreeMap::new()).unwrap();
        let katz = store.create_record("person", BTreeMap::new()).unwrap();
        let bryn = store.create_record("person", BTreeMap::new()).unwrap();

        store.set_relationship(dale.id, "bestFriend", Some(katz.id)).unwrap();
        store.set_relationship(bryn.id, "bestFriend", Some(katz.id)).unwrap();
        assert_eq!(store.referrers_of(katz.id), [dale, bryn]);
        assert!(store.referrers_of(dale.id).is_empty());

        // Retargeting moves the edge
        store.set_relationship(bryn.id, "bestFriend", Some(dale.id)).unwrap();
        assert_eq!(store.referrers_of(katz.id), [dale]);
        assert_eq!(store.referrers_of(dale.id), [bryn]);

        store.unload_record(dale.id).unwrap();
        assert!(store.referrers_of(katz.id).is_empty());
    }

    #[test]
    fn test_dependents_skip_touched_records() {
        let mut store = people();
        let touched = store
            .push(
                RecordData::new("1", "person")
                    .attribute("name", "Scumbag Dale")
                    .relationship("bestFriend", Some(("2", "person"))),
            )
            .unwrap();
        let katz = touched[0];
        let dale = touched[1];

        assert_eq!(store.dependents(&[katz]), [dale]);
        assert!(store.dependents(&touched).is_empty());
    }

    #[test]
    fn test_reserve_returns_existing() {
        let mut store = people();
        let placeholder = store.reserve("person", "7").unwrap();
        let again = store.reserve("person", "7").unwrap();
        assert_eq!(placeholder, again);
        assert!(store.get(placeholder.id).unwrap().is_placeholder());
    }

    #[test]
    fn test_record_source_scopes_by_type() {
        let mut store = people();
        let post = store.register_type("post");
        let person = store.create_record("person", BTreeMap::new()).unwrap();

        assert!(RecordSource::record(&store, person.type_key, person.id).is_some());
        assert!(RecordSource::record(&store, post, person.id).is_none());
        assert_eq!(store.all_members_of(post).len(), 0);
    }
}

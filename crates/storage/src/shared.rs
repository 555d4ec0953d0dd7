//! Shared handle to a record store.

use crate::store::RecordStore;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Ref, RefCell, RefMut};
use sieve_core::{Record, RecordId, RecordSource, Result, TypeKey};

/// A cloneable handle to a `RecordStore`.
///
/// Every `RecordSource` call borrows the store only for its own duration,
/// so predicates evaluated by views can read the store through another clone
/// of the handle.
#[derive(Clone, Default)]
pub struct SharedRecordStore {
    inner: Rc<RefCell<RecordStore>>,
}

impl SharedRecordStore {
    /// Creates a handle to an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing store.
    pub fn from_store(store: RecordStore) -> Self {
        Self {
            inner: Rc::new(RefCell::new(store)),
        }
    }

    /// Borrows the store immutably.
    ///
    /// # Panics
    ///
    /// Panics if the store is currently borrowed mutably.
    pub fn borrow(&self) -> Ref<'_, RecordStore> {
        self.inner.borrow()
    }

    /// Borrows the store mutably.
    ///
    /// # Panics
    ///
    /// Panics if the store is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, RecordStore> {
        self.inner.borrow_mut()
    }

    /// Gets a record by ID.
    pub fn get(&self, id: RecordId) -> Option<Rc<Record>> {
        self.inner.borrow().get(id)
    }

    /// Gets a record by model name and remote id.
    pub fn peek(&self, name: &str, remote_id: &str) -> Option<Rc<Record>> {
        self.inner.borrow().peek(name, remote_id)
    }
}

impl RecordSource for SharedRecordStore {
    fn resolve_type(&self, name: &str) -> Result<TypeKey> {
        self.inner.borrow().resolve_type(name)
    }

    fn model_name(&self, key: TypeKey) -> Option<String> {
        self.inner.borrow().model_name(key).map(Into::into)
    }

    fn all_members_of(&self, key: TypeKey) -> Vec<Rc<Record>> {
        self.inner.borrow().all(key)
    }

    fn record(&self, key: TypeKey, id: RecordId) -> Option<Rc<Record>> {
        RecordSource::record(&*self.inner.borrow(), key, id)
    }
}

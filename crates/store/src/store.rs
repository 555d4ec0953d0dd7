//! Store - Main entry point for records and their filtered views.
//!
//! This module provides the `Store` struct which owns the record store, the
//! view registry and the optional fetch adapter, and routes every record
//! mutation to the views of the touched types.

use crate::adapter::Adapter;
use crate::config::{FilterConfig, StoreConfig};
use crate::pending::PendingFilter;
use futures::future::{self, FutureExt};
use sieve_core::{Document, Error, Record, RecordData, RecordId, Result, TypeKey, Value};
use sieve_reactive::{Predicate, ViewRegistry};
use sieve_storage::{SharedRecordStore, Touched};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

pub(crate) struct StoreInner {
    records: SharedRecordStore,
    registry: ViewRegistry,
    adapter: Option<Rc<dyn Adapter>>,
    config: StoreConfig,
    destroyed: Cell<bool>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if !self.destroyed.replace(true) {
            self.registry.teardown();
        }
    }
}

/// A client-side record store with live filtered views.
///
/// Clones share the same store. Dropping the last clone tears down every
/// view, as `destroy` does.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Store {
    /// Creates a store without a fetch adapter.
    pub fn new(config: StoreConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a store whose filters with a query fetch through `adapter`.
    pub fn with_adapter(config: StoreConfig, adapter: impl Adapter + 'static) -> Self {
        Self::build(config, Some(Rc::new(adapter)))
    }

    fn build(config: StoreConfig, adapter: Option<Rc<dyn Adapter>>) -> Self {
        let records = SharedRecordStore::new();
        let registry = ViewRegistry::new(Rc::new(records.clone()));
        Self {
            inner: Rc::new(StoreInner {
                records,
                registry,
                adapter,
                config,
                destroyed: Cell::new(false),
            }),
        }
    }

    pub(crate) fn from_weak(inner: &Weak<StoreInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn downgrade(&self) -> Weak<StoreInner> {
        Rc::downgrade(&self.inner)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Returns the underlying record store.
    ///
    /// Mutations made through it directly do not reach any view; signal
    /// them through `registry()`.
    pub fn records(&self) -> &SharedRecordStore {
        &self.inner.records
    }

    /// Returns the view registry.
    pub fn registry(&self) -> &ViewRegistry {
        &self.inner.registry
    }

    /// Registers a model type. Idempotent.
    pub fn define_model(&self, name: &str) -> TypeKey {
        self.inner.records.borrow_mut().register_type(name)
    }

    /// Gets a record by ID.
    pub fn record(&self, id: RecordId) -> Option<Rc<Record>> {
        self.inner.records.get(id)
    }

    /// Gets a record by model name and remote id.
    pub fn peek_record(&self, name: &str, remote_id: &str) -> Option<Rc<Record>> {
        self.inner.records.peek(name, remote_id)
    }

    /// Returns every record of a type, in creation order.
    pub fn peek_all(&self, name: &str) -> Result<Vec<Rc<Record>>> {
        let records = self.inner.records.borrow();
        let key = records.resolve_type(name)?;
        Ok(records.all(key))
    }

    /// Loads one resource, returning the id of the loaded record.
    ///
    /// Related records that are not loaded yet become placeholders.
    pub fn push(&self, data: RecordData) -> Result<RecordId> {
        let touched = self.inner.records.borrow_mut().push(data)?;
        let id = touched.last().map(|t| t.id);
        self.notify(&touched);
        id.ok_or_else(|| Error::invalid_document("push produced no record"))
    }

    /// Loads every resource of a document, returning the loaded ids in
    /// document order.
    ///
    /// With `batch_pushes` the whole document reaches the views as one batch;
    /// a resource that fails to load discards the batch.
    pub fn push_document(&self, document: Document) -> Result<Vec<RecordId>> {
        let resources = document.into_records();
        debug!(resources = resources.len(), "pushing document");
        self.push_all(resources)
    }

    pub(crate) fn push_all(&self, resources: Vec<RecordData>) -> Result<Vec<RecordId>> {
        let push = || -> Result<Vec<RecordId>> {
            resources.into_iter().map(|data| self.push(data)).collect()
        };
        if self.inner.config.batch_pushes {
            self.inner.registry.run_batched(push)
        } else {
            push()
        }
    }

    /// Creates a local record.
    pub fn create_record<I, K, V>(&self, name: &str, attributes: I) -> Result<RecordId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let attributes: BTreeMap<String, Value> = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let touched = self
            .inner
            .records
            .borrow_mut()
            .create_record(name, attributes)?;
        self.notify(&[touched]);
        Ok(touched.id)
    }

    /// Reserves a placeholder for a remote id that is not loaded yet.
    pub fn reserve_record(&self, name: &str, remote_id: &str) -> Result<RecordId> {
        let touched = self.inner.records.borrow_mut().reserve(name, remote_id)?;
        self.notify(&[touched]);
        Ok(touched.id)
    }

    /// Sets an attribute on a record.
    pub fn set_attribute(&self, id: RecordId, name: &str, value: impl Into<Value>) -> Result<()> {
        let touched = self
            .inner
            .records
            .borrow_mut()
            .set_attribute(id, name, value.into())?;
        self.notify(&[touched]);
        Ok(())
    }

    /// Points a relationship at another record, or clears it.
    pub fn set_relationship(
        &self,
        id: RecordId,
        name: &str,
        target: Option<RecordId>,
    ) -> Result<()> {
        let touched = self
            .inner
            .records
            .borrow_mut()
            .set_relationship(id, name, target)?;
        self.notify(&[touched]);
        Ok(())
    }

    /// Marks a record deleted.
    pub fn delete_record(&self, id: RecordId) -> Result<()> {
        let touched = self.inner.records.borrow_mut().delete_record(id)?;
        self.notify(&[touched]);
        Ok(())
    }

    /// Removes a record from the store.
    pub fn unload_record(&self, id: RecordId) -> Result<()> {
        let touched = self.inner.records.borrow_mut().unload_record(id)?;
        self.notify(&[touched]);
        Ok(())
    }

    /// Signals the touched records and every record related to them.
    ///
    /// More than one signal is delivered as one batch when `batch_pushes`
    /// is set.
    fn notify(&self, touched: &[Touched]) {
        if self.is_destroyed() {
            return;
        }
        let dependents = self.inner.records.borrow().dependents(touched);
        let signals = || {
            for t in touched.iter().chain(&dependents) {
                self.inner.registry.notify_record_changed(t.type_key, t.id);
            }
        };
        if self.inner.config.batch_pushes && touched.len() + dependents.len() > 1 {
            let scope = self.inner.registry.batch();
            signals();
            scope.commit();
        } else {
            signals();
        }
    }

    /// Runs `op` as one batch: views are recomputed and notified once, after
    /// it returns. Nested calls join the outermost batch.
    ///
    /// If `op` fails the queued view updates of the outermost batch are
    /// discarded, though its record mutations stay applied.
    pub fn run_batched<R>(&self, op: impl FnOnce(&Store) -> Result<R>) -> Result<R> {
        self.inner.registry.run_batched(|| op(self))
    }

    /// Creates a live filtered view of a model type.
    ///
    /// The view's local membership is ready immediately through
    /// `PendingFilter::view`. If the config carries a query, the adapter is
    /// asked for matching records, and the view stays pending until
    /// `PendingFilter::resolve` has loaded them.
    pub fn filter(&self, type_name: &str, config: FilterConfig) -> Result<PendingFilter> {
        if type_name.trim().is_empty() {
            return Err(Error::invalid_type_name(
                "a model name is required to create a filter",
            ));
        }
        if self.is_destroyed() {
            return Err(Error::view_destroyed(type_name));
        }

        let FilterConfig {
            predicate,
            query,
            options,
        } = config;
        let predicate: Predicate = match predicate {
            Some(predicate) => predicate,
            None => {
                if self.inner.config.warn_on_unfiltered {
                    warn!(
                        model = type_name,
                        "no filter was provided; to filter to all of a type, use peek_all"
                    );
                }
                Rc::new(|_: &Record| true)
            }
        };

        let registry = &self.inner.registry;
        let Some(query) = query else {
            let view = registry.create_view(type_name, predicate, None)?;
            return Ok(PendingFilter::ready(view, self.downgrade()));
        };

        let view = registry.create_pending_view(type_name, predicate, Some(query.clone()))?;
        let model = view.model_name();
        let options = options.unwrap_or_default();
        let fetch = match &self.inner.adapter {
            Some(adapter) => adapter.query(&model, &query, &options),
            None => future::ready(Err(Error::fetch(model.as_str(), "no adapter is configured")))
                .boxed_local(),
        };
        debug!(view = view.id(), model = %model, "fetching records for filter");
        Ok(PendingFilter::fetching(view, fetch, self.downgrade()))
    }

    /// Destroys every filtered view. Idempotent.
    ///
    /// Records stay readable and writable, but no view observes them.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        self.inner.registry.teardown();
        debug!("destroyed store");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_reactive::ViewState;

    fn people() -> Store {
        let store = Store::default();
        store.define_model("person");
        store
    }

    fn named(name: &str) -> [(&'static str, Value); 1] {
        [("name", Value::from(name))]
    }

    #[test]
    fn test_filter_rejects_empty_name() {
        let store = people();
        let err = store.filter("", FilterConfig::all()).unwrap_err();
        assert!(matches!(err, Error::InvalidTypeName { .. }));
    }

    #[test]
    fn test_filter_unknown_type() {
        let store = people();
        let err = store.filter("comment", FilterConfig::all()).unwrap_err();
        assert_eq!(err, Error::unknown_type("comment"));
    }

    #[test]
    fn test_filter_without_query_is_ready() {
        let store = people();
        store.create_record("person", named("Dale")).unwrap();

        let pending = store.filter("person", FilterConfig::all()).unwrap();
        assert!(!pending.is_fetching());
        assert_eq!(pending.view().state(), ViewState::Ready);
        assert_eq!(pending.view().len(), 1);
    }

    #[test]
    fn test_mutations_reach_views() {
        let store = people();
        let view = store
            .filter(
                "person",
                FilterConfig::new(|r| r.get_str("name") == Some("Dale")),
            )
            .unwrap()
            .view()
            .clone();

        let id = store.create_record("person", named("Dale")).unwrap();
        assert_eq!(view.ids(), [id]);

        store.set_attribute(id, "name", "Katz").unwrap();
        assert!(view.is_empty());

        store.set_attribute(id, "name", "Dale").unwrap();
        store.delete_record(id).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn test_unload_removes_member() {
        let store = people();
        let id = store.create_record("person", named("Dale")).unwrap();
        let view = store.filter("person", FilterConfig::all()).unwrap().view().clone();
        assert_eq!(view.len(), 1);

        store.unload_record(id).unwrap();
        assert!(view.is_empty());
        assert!(store.record(id).is_none());
    }

    #[test]
    fn test_mutating_missing_record_fails() {
        let store = people();
        assert_eq!(
            store.set_attribute(42, "name", "Dale"),
            Err(Error::record_not_found(42))
        );
        assert_eq!(store.delete_record(42), Err(Error::record_not_found(42)));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let store = people();
        let view = store.filter("person", FilterConfig::all()).unwrap().view().clone();
        store.destroy();
        store.destroy();
        assert!(store.is_destroyed());
        assert!(view.is_destroyed());
        assert!(store.registry().is_empty());

        store.create_record("person", named("Dale")).unwrap();
        assert!(view.is_empty());
        assert_eq!(store.peek_all("person").unwrap().len(), 1);
        assert!(store.filter("person", FilterConfig::all()).is_err());
    }

    #[test]
    fn test_dropping_store_destroys_views() {
        let store = people();
        let view = store.filter("person", FilterConfig::all()).unwrap().view().clone();
        drop(store);
        assert_eq!(view.state(), ViewState::Destroyed);
    }
}

//! View registry - routes record changes to the filtered views of each type.
//!
//! The registry owns an index from type key to the views of that type, in
//! registration order. A change signal recomputes every affected view, then
//! delivers notifications in two passes: all membership listeners first,
//! then length listeners of views whose length changed. Inside a batch scope
//! signals are queued and applied once when the outermost scope commits.

use crate::batch::{BatchScheduler, BatchScope, Work};
use crate::change_set::ChangeSet;
use crate::view::{FilteredView, Predicate, View, ViewId};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use sieve_core::{Query, RecordId, RecordSource, Result, TypeKey};
use tracing::{debug, trace};

pub(crate) struct RegistryInner {
    source: Rc<dyn RecordSource>,
    index: RefCell<HashMap<TypeKey, Vec<View>>>,
    scheduler: BatchScheduler,
    next_id: Cell<ViewId>,
}

/// Tracks live filtered views per model type.
///
/// Clones share the same registry.
#[derive(Clone)]
pub struct ViewRegistry {
    inner: Rc<RegistryInner>,
}

impl ViewRegistry {
    /// Creates a registry reading supersets from `source`.
    pub fn new(source: Rc<dyn RecordSource>) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                source,
                index: RefCell::new(HashMap::new()),
                scheduler: BatchScheduler::new(),
                next_id: Cell::new(1),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<RegistryInner>) -> Self {
        Self { inner }
    }

    /// Returns the record source.
    pub fn source(&self) -> &Rc<dyn RecordSource> {
        &self.inner.source
    }

    /// Returns the batching scheduler.
    pub fn scheduler(&self) -> &BatchScheduler {
        &self.inner.scheduler
    }

    /// Creates a ready view over a model type and registers it.
    ///
    /// The view's membership is computed before this returns.
    pub fn create_view(
        &self,
        type_name: &str,
        predicate: Predicate,
        query: Option<Query>,
    ) -> Result<View> {
        let view = self.create_pending_view(type_name, predicate, query)?;
        view.mark_ready();
        Ok(view)
    }

    /// Creates a registered view that stays pending until `View::settle`.
    ///
    /// Its membership already reflects the records present locally.
    pub fn create_pending_view(
        &self,
        type_name: &str,
        predicate: Predicate,
        query: Option<Query>,
    ) -> Result<View> {
        let source = &self.inner.source;
        let type_key = source.resolve_type(type_name)?;
        let model_name = source
            .model_name(type_key)
            .unwrap_or_else(|| type_name.into());

        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let view = View::new(
            FilteredView::new(id, type_key, model_name, predicate, query),
            Rc::downgrade(&self.inner),
        );
        self.register(&view);
        debug!(view = id, model = type_name, members = view.len(), "created filtered view");
        Ok(view)
    }

    /// Returns the views registered for a type, in registration order.
    ///
    /// Creates an empty entry for the type on first use.
    pub fn views_for(&self, type_key: TypeKey) -> Vec<View> {
        self.inner
            .index
            .borrow_mut()
            .entry(type_key)
            .or_default()
            .clone()
    }

    /// Adds a view to its type's entry and computes its membership.
    ///
    /// Registering an already registered view only rescans it. Destroyed
    /// views are ignored.
    pub fn register(&self, view: &View) {
        if view.is_destroyed() {
            return;
        }
        {
            let mut index = self.inner.index.borrow_mut();
            let views = index.entry(view.type_key()).or_default();
            if !views.iter().any(|v| v.id() == view.id()) {
                views.push(view.clone());
            }
        }
        // Initial membership is not a change; nobody is notified.
        view.recompute(&*self.inner.source, &Work::Rescan);
    }

    /// Removes a view from its type's entry.
    ///
    /// Returns false if the view was not registered.
    pub fn unregister(&self, view: &View) -> bool {
        let mut index = self.inner.index.borrow_mut();
        match index.get_mut(&view.type_key()) {
            Some(views) => {
                let before = views.len();
                views.retain(|v| v.id() != view.id());
                views.len() < before
            }
            None => false,
        }
    }

    /// Signals that the superset of a type changed in unknown ways.
    ///
    /// Every view of the type rescans.
    pub fn notify_changed(&self, type_key: TypeKey) {
        self.dispatch(type_key, Work::Rescan);
    }

    /// Signals that one record of a type was created, updated, loaded,
    /// deleted or unloaded.
    pub fn notify_record_changed(&self, type_key: TypeKey, id: RecordId) {
        self.dispatch(type_key, Work::record(id));
    }

    fn dispatch(&self, type_key: TypeKey, work: Work) {
        let scheduler = &self.inner.scheduler;
        if scheduler.is_batching() {
            trace!(type_key, "queued view update");
            scheduler.queue(type_key, work);
            return;
        }
        let plan = self
            .views_for(type_key)
            .into_iter()
            .map(|view| (view, work.clone()))
            .collect();
        self.apply(plan);
    }

    /// Rescans one view, now or at flush time.
    pub(crate) fn refresh_view(&self, view: &View) {
        let scheduler = &self.inner.scheduler;
        if scheduler.is_batching() {
            scheduler.queue_view(view.type_key(), view.id());
        } else {
            self.apply(alloc::vec![(view.clone(), Work::Rescan)]);
        }
    }

    /// Opens a batch scope.
    pub fn batch(&self) -> BatchScope {
        BatchScope::open(self.clone())
    }

    /// Opens a batch scope without a guard. Pair with `end`.
    pub fn begin(&self) {
        self.inner.scheduler.enter();
    }

    /// Closes a scope opened with `begin`, flushing if it was the outermost.
    pub fn end(&self) {
        if self.inner.scheduler.exit() {
            self.flush();
        }
    }

    /// Returns true while a batch scope is open.
    pub fn is_batching(&self) -> bool {
        self.inner.scheduler.is_batching()
    }

    /// Returns true if batched work awaits a flush.
    pub fn has_pending(&self) -> bool {
        self.inner.scheduler.has_pending()
    }

    /// Runs an operation inside a batch scope.
    ///
    /// On success the scope commits. On failure the scope is abandoned and,
    /// if it was the outermost one, its queued work is discarded.
    pub fn run_batched<R, E>(
        &self,
        op: impl FnOnce() -> core::result::Result<R, E>,
    ) -> core::result::Result<R, E> {
        let scope = self.batch();
        let result = op()?;
        scope.commit();
        Ok(result)
    }

    /// Applies all queued work. Called when the outermost scope commits.
    pub(crate) fn flush(&self) {
        let pending = self.inner.scheduler.take();
        if pending.is_empty() {
            return;
        }
        let mut plan = Vec::new();
        for &type_key in pending.types() {
            for view in self.views_for(type_key) {
                if let Some(work) = pending.work_for(type_key, view.id()) {
                    plan.push((view, work));
                }
            }
        }
        trace!(views = plan.len(), "flushing batched view updates");
        self.apply(plan);
    }

    fn apply(&self, plan: Vec<(View, Work)>) {
        let source = self.inner.source.clone();
        let outcomes: Vec<(View, ChangeSet)> = plan
            .into_iter()
            .filter_map(|(view, work)| {
                let changes = view.recompute(&*source, &work)?;
                Some((view, changes))
            })
            .collect();

        for (view, changes) in &outcomes {
            view.deliver_members(changes);
        }
        for (view, changes) in &outcomes {
            if changes.length_changed() {
                view.deliver_len(changes.current_len);
            }
        }
    }

    /// Destroys every registered view exactly once and empties the index.
    ///
    /// Queued batch work is dropped.
    pub fn teardown(&self) {
        let index = core::mem::take(&mut *self.inner.index.borrow_mut());
        self.inner.scheduler.discard();

        let mut views: Vec<View> = index.into_values().flatten().collect();
        views.sort_by_key(View::id);
        for view in &views {
            view.destroy();
        }
        debug!(views = views.len(), "tore down view registry");
    }

    /// Returns the number of registered views.
    pub fn view_count(&self) -> usize {
        self.inner.index.borrow().values().map(Vec::len).sum()
    }

    /// Returns the number of views registered for a type.
    pub fn views_for_type_count(&self, type_key: TypeKey) -> usize {
        self.inner
            .index
            .borrow()
            .get(&type_key)
            .map_or(0, Vec::len)
    }

    /// Returns the number of types with an index entry.
    pub fn type_count(&self) -> usize {
        self.inner.index.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.view_count() == 0
    }
}

//! Filtered view implementation.
//!
//! A `FilteredView` holds the members of one model type's superset that
//! satisfy a predicate. Members are kept sorted by record id, which matches
//! the superset's order since ids are allocated monotonically. The `View`
//! handle shares one view between its owner and the registry.

use crate::batch::Work;
use crate::change_set::ChangeSet;
use crate::registry::{RegistryInner, ViewRegistry};
use crate::subscription::{SubscriptionId, SubscriptionManager};
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use sieve_core::{Error, Query, Record, RecordId, RecordSource, Result, TypeKey};
use tracing::{debug, trace};

/// Unique identifier for a view within its registry.
pub type ViewId = u64;

/// Decides whether a record belongs to a view.
pub type Predicate = Rc<dyn Fn(&Record) -> bool>;

/// Lifecycle of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    /// Created, waiting for a server fetch to settle.
    Pending,
    /// Members reflect the superset.
    Ready,
    /// Being torn down.
    Destroying,
    /// Torn down. Membership is empty and no longer updated.
    Destroyed,
}

/// The state of one filtered view.
pub struct FilteredView {
    id: ViewId,
    type_key: TypeKey,
    model_name: String,
    predicate: Predicate,
    query: Option<Query>,
    /// Sorted by record id.
    members: Vec<Rc<Record>>,
    state: ViewState,
    subscriptions: SubscriptionManager,
}

impl FilteredView {
    /// Creates an empty pending view.
    pub fn new(
        id: ViewId,
        type_key: TypeKey,
        model_name: impl Into<String>,
        predicate: Predicate,
        query: Option<Query>,
    ) -> Self {
        Self {
            id,
            type_key,
            model_name: model_name.into(),
            predicate,
            query,
            members: Vec::new(),
            state: ViewState::Pending,
            subscriptions: SubscriptionManager::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ViewId {
        self.id
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    #[inline]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    #[inline]
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    #[inline]
    pub fn state(&self) -> ViewState {
        self.state
    }

    /// Returns true once teardown has started.
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        matches!(self.state, ViewState::Destroying | ViewState::Destroyed)
    }

    /// Returns the members, sorted by record id.
    #[inline]
    pub fn members(&self) -> &[Rc<Record>] {
        &self.members
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns true if the record is live and satisfies the predicate.
    pub fn accepts(&self, record: &Record) -> bool {
        accepts(&self.predicate, record)
    }

    /// Replaces the predicate. Membership is stale until the next rescan.
    pub fn set_predicate(&mut self, predicate: Predicate) {
        self.predicate = predicate;
    }

    /// Moves a pending view to ready. Other states are left alone.
    pub fn mark_ready(&mut self) {
        if self.state == ViewState::Pending {
            self.state = ViewState::Ready;
        }
    }

    /// Rebuilds membership from the whole superset.
    pub fn rescan(&mut self, source: &dyn RecordSource) -> ChangeSet {
        let evaluation = Evaluation::run(&self.predicate, self.type_key, source, &Work::Rescan);
        self.apply(evaluation)
    }

    /// Re-evaluates individual records against the predicate.
    ///
    /// Records missing from the superset, or now belonging to another type,
    /// leave the view.
    pub fn refresh<I>(&mut self, source: &dyn RecordSource, ids: I) -> ChangeSet
    where
        I: IntoIterator<Item = RecordId>,
    {
        let evaluation = Evaluation::records(&self.predicate, self.type_key, source, ids);
        self.apply(evaluation)
    }

    /// Merges evaluated records into the membership.
    fn apply(&mut self, evaluation: Evaluation) -> ChangeSet {
        match evaluation {
            Evaluation::Scan(members) => {
                let changes = ChangeSet::between(&self.members, &members);
                self.members = members;
                trace!(view = self.id, members = self.members.len(), "rescanned view");
                changes
            }
            Evaluation::Records(evaluated) => self.apply_records(evaluated),
        }
    }

    fn apply_records(&mut self, evaluated: Vec<(RecordId, Option<Rc<Record>>)>) -> ChangeSet {
        let mut changes = ChangeSet {
            previous_len: self.members.len(),
            ..ChangeSet::default()
        };
        for (id, current) in evaluated {
            let position = self.members.binary_search_by_key(&id, |r| r.id());
            match (position, current) {
                (Ok(index), Some(record)) => {
                    if !Rc::ptr_eq(&self.members[index], &record) {
                        let old = core::mem::replace(&mut self.members[index], record.clone());
                        changes.modify(old, record);
                    }
                }
                (Ok(index), None) => changes.remove(self.members.remove(index)),
                (Err(index), Some(record)) => {
                    self.members.insert(index, record.clone());
                    changes.add(record);
                }
                (Err(_), None) => {}
            }
            trace!(view = self.id, record = id, "re-evaluated record");
        }
        changes.current_len = self.members.len();
        changes
    }

    /// Returns the subscriptions.
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Returns the subscriptions mutably.
    pub fn subscriptions_mut(&mut self) -> &mut SubscriptionManager {
        &mut self.subscriptions
    }

    fn finish_destroy(&mut self) {
        self.members.clear();
        self.subscriptions.clear();
        self.state = ViewState::Destroyed;
    }
}

fn accepts(predicate: &Predicate, record: &Record) -> bool {
    record.is_live() && predicate(record)
}

/// Predicate results computed apart from the view they will be merged into.
enum Evaluation {
    /// Every accepted record of the type, in superset order.
    Scan(Vec<Rc<Record>>),
    /// Each record's accepted snapshot, or None if it should leave.
    Records(Vec<(RecordId, Option<Rc<Record>>)>),
}

impl Evaluation {
    fn run(
        predicate: &Predicate,
        type_key: TypeKey,
        source: &dyn RecordSource,
        work: &Work,
    ) -> Self {
        match work {
            Work::Rescan => Self::Scan(
                source
                    .all_members_of(type_key)
                    .into_iter()
                    .filter(|record| accepts(predicate, record))
                    .collect(),
            ),
            Work::Records(ids) => Self::records(predicate, type_key, source, ids.iter().copied()),
        }
    }

    fn records<I>(
        predicate: &Predicate,
        type_key: TypeKey,
        source: &dyn RecordSource,
        ids: I,
    ) -> Self
    where
        I: IntoIterator<Item = RecordId>,
    {
        Self::Records(
            ids.into_iter()
                .map(|id| {
                    let current = source
                        .record(type_key, id)
                        .filter(|record| accepts(predicate, record));
                    (id, current)
                })
                .collect(),
        )
    }
}

/// A shared handle to a filtered view.
///
/// Clones refer to the same view. The view behaves like a read-only list of
/// records: every mutating list operation fails with `Error::ImmutableView`.
#[derive(Clone)]
pub struct View {
    id: ViewId,
    type_key: TypeKey,
    inner: Rc<RefCell<FilteredView>>,
    registry: Weak<RegistryInner>,
}

impl View {
    pub(crate) fn new(view: FilteredView, registry: Weak<RegistryInner>) -> Self {
        Self {
            id: view.id,
            type_key: view.type_key,
            inner: Rc::new(RefCell::new(view)),
            registry,
        }
    }

    #[inline]
    pub fn id(&self) -> ViewId {
        self.id
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Returns the model name the view filters.
    pub fn model_name(&self) -> String {
        self.inner.borrow().model_name.clone()
    }

    /// Returns the server query the view was created with, if any.
    pub fn query(&self) -> Option<Query> {
        self.inner.borrow().query.clone()
    }

    pub fn state(&self) -> ViewState {
        self.inner.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ViewState::Ready
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().is_destroyed()
    }

    /// Returns a snapshot of the members, sorted by record id.
    pub fn current_members(&self) -> Vec<Rc<Record>> {
        self.inner.borrow().members.clone()
    }

    /// Returns the ids of the members.
    pub fn ids(&self) -> Vec<RecordId> {
        self.inner.borrow().members.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Returns the member at a position.
    pub fn get(&self, index: usize) -> Option<Rc<Record>> {
        self.inner.borrow().members.get(index).cloned()
    }

    /// Returns true if the record is a member.
    pub fn contains(&self, id: RecordId) -> bool {
        self.inner
            .borrow()
            .members
            .binary_search_by_key(&id, |r| r.id())
            .is_ok()
    }

    /// Replaces the predicate and schedules a rescan of this view.
    ///
    /// Inside a batch the rescan runs at flush time; otherwise it runs now.
    /// Calling this on a destroyed view does nothing.
    pub fn set_predicate<F>(&self, predicate: F)
    where
        F: Fn(&Record) -> bool + 'static,
    {
        self.set_shared_predicate(Rc::new(predicate));
    }

    /// Like `set_predicate`, for an already shared predicate.
    pub fn set_shared_predicate(&self, predicate: Predicate) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.is_destroyed() {
                return;
            }
            inner.set_predicate(predicate);
        }
        if let Some(registry) = self.registry() {
            registry.refresh_view(self);
        }
    }

    /// Subscribes to membership changes.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeSet) + 'static,
    {
        self.inner.borrow_mut().subscriptions.subscribe(callback)
    }

    /// Subscribes to length changes.
    pub fn subscribe_len<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(usize) + 'static,
    {
        self.inner.borrow_mut().subscriptions.subscribe_len(callback)
    }

    /// Unsubscribes by ID.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().subscriptions.unsubscribe(id)
    }

    /// Returns the number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }

    /// Splices the member list. Always fails: views are read-only.
    pub fn replace(&self, _index: usize, _remove: usize, _records: Vec<Rc<Record>>) -> Result<()> {
        Err(Error::immutable_view(self.model_name()))
    }

    /// Inserts a member. Always fails: views are read-only.
    pub fn insert_at(&self, index: usize, record: Rc<Record>) -> Result<()> {
        self.replace(index, 0, alloc::vec![record])
    }

    /// Removes a member. Always fails: views are read-only.
    pub fn remove_at(&self, index: usize) -> Result<()> {
        self.replace(index, 1, Vec::new())
    }

    /// Completes a pending view once its server fetch has been pushed.
    ///
    /// Marks the view ready and rescans it. Fails if the view was destroyed
    /// in the meantime; a destroyed view is never revived.
    pub fn settle(&self) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.is_destroyed() {
                return Err(Error::view_destroyed(inner.model_name.clone()));
            }
            inner.mark_ready();
        }
        match self.registry() {
            Some(registry) => {
                registry.refresh_view(self);
                Ok(())
            }
            None => Err(Error::view_destroyed(self.model_name())),
        }
    }

    /// Destroys the view. Idempotent.
    ///
    /// The view leaves its registry, its members and subscriptions are
    /// cleared, and its predicate is never evaluated again.
    pub fn destroy(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.is_destroyed() {
                return;
            }
            inner.state = ViewState::Destroying;
        }
        if let Some(registry) = self.registry() {
            registry.unregister(self);
        }
        self.inner.borrow_mut().finish_destroy();
        debug!(view = self.id, "destroyed filtered view");
    }

    /// Returns true if both handles refer to the same view.
    pub fn ptr_eq(&self, other: &View) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn registry(&self) -> Option<ViewRegistry> {
        self.registry.upgrade().map(ViewRegistry::from_inner)
    }

    pub(crate) fn mark_ready(&self) {
        self.inner.borrow_mut().mark_ready();
    }

    /// Performs queued work. Returns None for destroyed views and for work
    /// that changed nothing.
    ///
    /// The predicate runs while the view is not borrowed, so it may read the
    /// view it filters for (it sees the membership from before this call).
    pub(crate) fn recompute(&self, source: &dyn RecordSource, work: &Work) -> Option<ChangeSet> {
        let predicate = {
            let inner = self.inner.borrow();
            if inner.is_destroyed() {
                return None;
            }
            inner.predicate.clone()
        };
        let evaluation = Evaluation::run(&predicate, self.type_key, source, work);

        let mut inner = self.inner.borrow_mut();
        if inner.is_destroyed() {
            return None;
        }
        let changes = inner.apply(evaluation);
        (!changes.is_empty()).then_some(changes)
    }

    pub(crate) fn deliver_members(&self, changes: &ChangeSet) {
        let listeners = {
            let inner = self.inner.borrow();
            if inner.is_destroyed() {
                return;
            }
            inner.subscriptions.member_listeners()
        };
        for callback in listeners {
            if self.is_destroyed() {
                return;
            }
            callback(changes);
        }
    }

    pub(crate) fn deliver_len(&self, len: usize) {
        let listeners = {
            let inner = self.inner.borrow();
            if inner.is_destroyed() {
                return;
            }
            inner.subscriptions.length_listeners()
        };
        for callback in listeners {
            if self.is_destroyed() {
                return;
            }
            callback(len);
        }
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("View")
            .field("id", &self.id)
            .field("model", &inner.model_name)
            .field("state", &inner.state)
            .field("len", &inner.members.len())
            .finish()
    }
}

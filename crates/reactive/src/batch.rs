//! Batching scheduler for view updates.
//!
//! Inside a batch scope, change signals are queued per type instead of being
//! applied. When the outermost scope commits, every affected view is
//! recomputed once and notified once, no matter how many signals touched it.

use crate::registry::ViewRegistry;
use crate::view::ViewId;
use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use hashbrown::hash_map::Entry;
use hashbrown::{HashMap, HashSet};
use sieve_core::{RecordId, TypeKey};

/// Recomputation a view has to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Work {
    /// Rebuild membership from the whole superset.
    Rescan,
    /// Re-evaluate these records only.
    Records(BTreeSet<RecordId>),
}

impl Work {
    /// Work for a single record.
    pub fn record(id: RecordId) -> Self {
        let mut ids = BTreeSet::new();
        ids.insert(id);
        Work::Records(ids)
    }

    /// Folds later work into this one. A rescan absorbs record sets.
    pub fn merge(&mut self, other: Work) {
        match (&mut *self, other) {
            (Work::Rescan, _) => {}
            (this, Work::Rescan) => *this = Work::Rescan,
            (Work::Records(ids), Work::Records(more)) => ids.extend(more),
        }
    }
}

/// Work queued while a batch scope is open.
#[derive(Debug, Default)]
pub struct PendingWork {
    /// Types in the order they were first signalled.
    order: Vec<TypeKey>,
    types: HashMap<TypeKey, Work>,
    /// Views that need a full rescan of their own (predicate swaps).
    views: HashSet<ViewId>,
}

impl PendingWork {
    fn touch(&mut self, key: TypeKey) {
        if !self.order.contains(&key) {
            self.order.push(key);
        }
    }

    /// Queues work for every view of a type.
    pub fn queue(&mut self, key: TypeKey, work: Work) {
        self.touch(key);
        match self.types.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(work),
            Entry::Vacant(entry) => {
                entry.insert(work);
            }
        }
    }

    /// Queues a full rescan for one view.
    pub fn queue_view(&mut self, key: TypeKey, view: ViewId) {
        self.touch(key);
        self.views.insert(view);
    }

    /// Returns the signalled types, first-signalled first.
    pub fn types(&self) -> &[TypeKey] {
        &self.order
    }

    /// Returns the work a view of the given type must perform, if any.
    pub fn work_for(&self, key: TypeKey, view: ViewId) -> Option<Work> {
        if self.views.contains(&view) {
            return Some(Work::Rescan);
        }
        self.types.get(&key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Tracks batch scope nesting and the work queued inside it.
#[derive(Debug, Default)]
pub struct BatchScheduler {
    depth: Cell<usize>,
    pending: RefCell<PendingWork>,
}

impl BatchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while at least one scope is open.
    #[inline]
    pub fn is_batching(&self) -> bool {
        self.depth.get() > 0
    }

    /// Returns the current nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Returns true if queued work awaits a flush.
    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Opens a scope.
    pub fn enter(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    /// Closes a scope. Returns true when the outermost scope closed.
    pub fn exit(&self) -> bool {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        depth == 0
    }

    /// Queues work for a type.
    pub fn queue(&self, key: TypeKey, work: Work) {
        self.pending.borrow_mut().queue(key, work);
    }

    /// Queues a full rescan for one view.
    pub fn queue_view(&self, key: TypeKey, view: ViewId) {
        self.pending.borrow_mut().queue_view(key, view);
    }

    /// Takes the queued work, leaving the queue empty.
    pub fn take(&self) -> PendingWork {
        core::mem::take(&mut *self.pending.borrow_mut())
    }

    /// Drops the queued work. Returns true if anything was queued.
    pub fn discard(&self) -> bool {
        !self.take().is_empty()
    }
}

/// An open batch scope on a registry.
///
/// `commit` closes the scope and flushes if it was the outermost one.
/// Dropping the scope without committing closes it too, but an outermost
/// scope then discards the queued work instead of flushing it.
#[must_use = "dropping a batch scope without committing discards its queued work"]
pub struct BatchScope {
    registry: ViewRegistry,
    committed: bool,
}

impl BatchScope {
    pub(crate) fn open(registry: ViewRegistry) -> Self {
        registry.scheduler().enter();
        Self {
            registry,
            committed: false,
        }
    }

    /// Closes the scope, flushing queued work if it was the outermost one.
    pub fn commit(mut self) {
        self.committed = true;
        if self.registry.scheduler().exit() {
            self.registry.flush();
        }
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let scheduler = self.registry.scheduler();
        if scheduler.exit() && scheduler.discard() {
            tracing::warn!("discarding batched view updates after a failed operation");
        }
    }
}

//! Change set for tracking filtered view membership changes.
//!
//! A ChangeSet represents the difference between two membership states of a
//! view: records that entered, records that left, and members whose snapshot
//! was replaced while they kept matching.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use sieve_core::Record;

/// A set of changes to a view's membership.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    /// Records that entered the view
    pub added: Vec<Rc<Record>>,
    /// Records that left the view
    pub removed: Vec<Rc<Record>>,
    /// Members whose snapshot changed (old, new)
    pub modified: Vec<(Rc<Record>, Rc<Record>)>,
    /// Member count before the changes
    pub previous_len: usize,
    /// Member count after the changes
    pub current_len: usize,
}

impl ChangeSet {
    /// Creates a new empty change set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs two member lists, both sorted by record id.
    ///
    /// Walks both lists once; a record present on both sides counts as
    /// modified only when its snapshot is a different allocation.
    pub fn between(old: &[Rc<Record>], new: &[Rc<Record>]) -> Self {
        let mut changes = Self {
            previous_len: old.len(),
            current_len: new.len(),
            ..Self::default()
        };
        let (mut i, mut j) = (0, 0);
        while i < old.len() && j < new.len() {
            match old[i].id().cmp(&new[j].id()) {
                Ordering::Less => {
                    changes.removed.push(old[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    changes.added.push(new[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    if !Rc::ptr_eq(&old[i], &new[j]) {
                        changes.modified.push((old[i].clone(), new[j].clone()));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        changes.removed.extend(old[i..].iter().cloned());
        changes.added.extend(new[j..].iter().cloned());
        changes
    }

    /// Returns true if there are no changes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Returns the total number of changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Returns true if the member count differs before and after.
    #[inline]
    pub fn length_changed(&self) -> bool {
        self.previous_len != self.current_len
    }

    /// Adds an entered record.
    #[inline]
    pub fn add(&mut self, record: Rc<Record>) {
        self.added.push(record);
    }

    /// Adds a departed record.
    #[inline]
    pub fn remove(&mut self, record: Rc<Record>) {
        self.removed.push(record);
    }

    /// Adds a replaced member snapshot.
    #[inline]
    pub fn modify(&mut self, old: Rc<Record>, new: Rc<Record>) {
        self.modified.push((old, new));
    }
}

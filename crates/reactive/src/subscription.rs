//! Subscription management for filtered views.
//!
//! A view has two kinds of listeners: membership listeners receive the
//! `ChangeSet` of each visible recomputation, length listeners receive the
//! new member count whenever it changes.

use crate::change_set::ChangeSet;
use alloc::rc::Rc;
use alloc::vec::Vec;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for membership notifications.
pub type ChangeCallback = Rc<dyn Fn(&ChangeSet)>;

/// Callback type for length notifications.
pub type LengthCallback = Rc<dyn Fn(usize)>;

/// What a subscription listens to.
#[derive(Clone)]
pub enum Listener {
    Members(ChangeCallback),
    Length(LengthCallback),
}

/// A subscription to view changes.
pub struct Subscription {
    id: SubscriptionId,
    listener: Listener,
}

impl Subscription {
    /// Creates a new subscription.
    pub fn new(id: SubscriptionId, listener: Listener) -> Self {
        Self { id, listener }
    }
}

/// Manages the subscriptions of one view.
///
/// Subscriptions are kept in subscription order so delivery is deterministic.
/// Callbacks are handed out as snapshots; the caller invokes them after
/// releasing any borrow of the view, so a callback may unsubscribe, read the
/// view or destroy it.
pub struct SubscriptionManager {
    subscriptions: Vec<Subscription>,
    next_id: SubscriptionId,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 1,
        }
    }

    fn push(&mut self, listener: Listener) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.push(Subscription::new(id, listener));
        id
    }

    /// Subscribes to membership changes.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeSet) + 'static,
    {
        self.push(Listener::Members(Rc::new(callback)))
    }

    /// Subscribes to length changes.
    pub fn subscribe_len<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(usize) + 'static,
    {
        self.push(Listener::Length(Rc::new(callback)))
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let len_before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        self.subscriptions.len() < len_before
    }

    /// Returns the membership callbacks, in subscription order.
    pub fn member_listeners(&self) -> Vec<ChangeCallback> {
        self.subscriptions
            .iter()
            .filter_map(|sub| match &sub.listener {
                Listener::Members(cb) => Some(cb.clone()),
                Listener::Length(_) => None,
            })
            .collect()
    }

    /// Returns the length callbacks, in subscription order.
    pub fn length_listeners(&self) -> Vec<LengthCallback> {
        self.subscriptions
            .iter()
            .filter_map(|sub| match &sub.listener {
                Listener::Length(cb) => Some(cb.clone()),
                Listener::Members(_) => None,
            })
            .collect()
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    #[test]
    fn test_subscription_manager_new() {
        let manager = SubscriptionManager::new();
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_subscribe_assigns_unique_ids() {
        let mut manager = SubscriptionManager::new();

        let id1 = manager.subscribe(|_| {});
        let id2 = manager.subscribe_len(|_| {});

        assert_ne!(id1, id2);
        assert_eq!(manager.len(), 2);
        assert!(manager.unsubscribe(id1));
        assert!(!manager.unsubscribe(id1));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut manager = SubscriptionManager::new();

        let id = manager.subscribe(|_| {});
        assert!(manager.unsubscribe(id));
        assert!(manager.is_empty());
        assert!(!manager.unsubscribe(id));
    }

    #[test]
    fn test_listeners_split_by_kind() {
        let mut manager = SubscriptionManager::new();
        manager.subscribe(|_| {});
        manager.subscribe_len(|_| {});
        manager.subscribe(|_| {});

        assert_eq!(manager.member_listeners().len(), 2);
        assert_eq!(manager.length_listeners().len(), 1);
    }

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let mut manager = SubscriptionManager::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..3 {
            let order = order.clone();
            manager.subscribe(move |_| order.borrow_mut().push(tag));
        }

        let changes = ChangeSet::new();
        for cb in manager.member_listeners() {
            cb(&changes);
        }
        assert_eq!(*order.borrow(), [0, 1, 2]);
    }

    #[test]
    fn test_clear() {
        let mut manager = SubscriptionManager::new();
        manager.subscribe(|_| {});
        manager.subscribe_len(|_| {});
        manager.clear();
        assert!(manager.is_empty());
    }
}

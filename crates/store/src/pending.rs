//! A filter whose server fetch may still be outstanding.

use crate::store::{Store, StoreInner};
use futures::future::LocalBoxFuture;
use sieve_core::{Error, RecordData, Result};
use sieve_reactive::View;
use std::fmt;
use std::rc::Weak;
use tracing::{debug, warn};

type Fetch = LocalBoxFuture<'static, Result<Vec<RecordData>>>;

/// The result of `Store::filter`.
///
/// The view is live from the start; `resolve` waits for the fetch, loads its
/// records and hands the view back once it is ready.
pub struct PendingFilter {
    view: View,
    fetch: Option<Fetch>,
    store: Weak<StoreInner>,
}

impl PendingFilter {
    pub(crate) fn ready(view: View, store: Weak<StoreInner>) -> Self {
        Self {
            view,
            fetch: None,
            store,
        }
    }

    pub(crate) fn fetching(view: View, fetch: Fetch, store: Weak<StoreInner>) -> Self {
        Self {
            view,
            fetch: Some(fetch),
            store,
        }
    }

    /// Returns the live view.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Returns true if a fetch is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.fetch.is_some()
    }

    /// Waits for the fetch, loads the fetched records and returns the view.
    ///
    /// Fails with `Error::ViewDestroyed` if the view or its store was
    /// destroyed while the fetch was outstanding, and the view stays
    /// destroyed. Fetched records still load into a live store, where other
    /// views of the type see them. A failed fetch is returned as
    /// `Error::Fetch`; the view is still marked ready with its local
    /// membership.
    pub async fn resolve(self) -> Result<View> {
        let Self { view, fetch, store } = self;
        let Some(fetch) = fetch else {
            return Ok(view);
        };

        let fetched = fetch.await;
        let store = match Store::from_weak(&store) {
            Some(store) if !store.is_destroyed() => store,
            _ => {
                debug!(view = view.id(), "dropping fetch result for destroyed store");
                return Err(Error::view_destroyed(view.model_name()));
            }
        };

        let loaded = match fetched {
            Ok(records) => store.push_all(records).map(|_| ()),
            Err(err @ Error::Fetch { .. }) => Err(err),
            Err(err) => Err(Error::fetch(view.model_name(), err.to_string())),
        };
        if view.is_destroyed() {
            if let Err(err) = loaded {
                warn!(view = view.id(), error = %err, "fetch for destroyed view failed");
            }
            return Err(Error::view_destroyed(view.model_name()));
        }
        view.settle()?;
        loaded.map(|()| view)
    }
}

impl fmt::Debug for PendingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFilter")
            .field("view", &self.view)
            .field("fetching", &self.is_fetching())
            .finish()
    }
}

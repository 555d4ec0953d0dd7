//! Store and filter configuration.

use sieve_core::{Query, Record};
use sieve_reactive::Predicate;
use std::fmt;
use std::rc::Rc;

/// Store-wide settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Deliver a multi-record push, or a mutation whose related records
    /// must be re-checked, to the views as one batch.
    pub batch_pushes: bool,
    /// Log a warning when a filter is created without a predicate.
    pub warn_on_unfiltered: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_pushes: true,
            warn_on_unfiltered: true,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_pushes(mut self, enabled: bool) -> Self {
        self.batch_pushes = enabled;
        self
    }

    pub fn warn_on_unfiltered(mut self, enabled: bool) -> Self {
        self.warn_on_unfiltered = enabled;
        self
    }
}

/// How to build a filtered view.
///
/// Without a predicate every live record of the type is a member. With a
/// query, the store's adapter is asked for matching records as well.
#[derive(Clone, Default)]
pub struct FilterConfig {
    pub predicate: Option<Predicate>,
    pub query: Option<Query>,
    pub options: Option<Query>,
}

impl FilterConfig {
    /// A config filtering by `predicate`.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + 'static,
    {
        Self {
            predicate: Some(Rc::new(predicate)),
            ..Self::default()
        }
    }

    /// A config without a predicate.
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds a server query, forwarded to the adapter.
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Adds adapter options.
    pub fn with_options(mut self, options: Query) -> Self {
        self.options = Some(options);
        self
    }
}

impl fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConfig")
            .field("predicate", &self.predicate.is_some())
            .field("query", &self.query)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_core::Value;

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::default();
        assert!(config.batch_pushes);
        assert!(config.warn_on_unfiltered);

        let config = StoreConfig::new().batch_pushes(false).warn_on_unfiltered(false);
        assert!(!config.batch_pushes);
        assert!(!config.warn_on_unfiltered);
    }

    #[test]
    fn test_filter_config_builders() {
        let mut query = Query::new();
        query.insert("name".into(), Value::from("Dale"));

        let config = FilterConfig::new(|_| true).with_query(query.clone());
        assert!(config.predicate.is_some());
        assert_eq!(config.query, Some(query));
        assert!(config.options.is_none());

        let config = FilterConfig::all();
        assert!(config.predicate.is_none());
        assert!(config.query.is_none());
    }
}

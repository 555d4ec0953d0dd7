//! The read-only contract between a record store and its derived views.

use crate::error::Result;
use crate::record::{Record, RecordId, TypeKey};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

/// A store's superset collections, as seen by derived views.
///
/// Implementations hand out owned snapshots so that no borrow of the store
/// outlives a call; views evaluate caller predicates after the call returns,
/// and those predicates may read the store again.
pub trait RecordSource {
    /// Resolves a model name to its type key.
    ///
    /// Fails with `Error::UnknownType` if the model is not registered.
    fn resolve_type(&self, name: &str) -> Result<TypeKey>;

    /// Returns the model name registered for a type key.
    fn model_name(&self, key: TypeKey) -> Option<String>;

    /// Returns every current member of the superset, in ascending id order.
    fn all_members_of(&self, key: TypeKey) -> Vec<Rc<Record>>;

    /// Returns one member of the superset, None if absent or of another type.
    fn record(&self, key: TypeKey, id: RecordId) -> Option<Rc<Record>>;
}

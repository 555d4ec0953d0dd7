//! Fetch collaborator for server-backed filters.

use futures::future::LocalBoxFuture;
use sieve_core::{Query, RecordData, Result};

/// Fetches records matching a server query.
///
/// The returned resources are pushed into the store when the future
/// resolves. A failure is reported as `Error::Fetch`; the store does not
/// retry.
pub trait Adapter {
    fn query(
        &self,
        model: &str,
        query: &Query,
        options: &Query,
    ) -> LocalBoxFuture<'static, Result<Vec<RecordData>>>;
}

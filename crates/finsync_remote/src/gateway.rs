//! The remote table interface consumed by the sync engine.

use crate::error::RemoteResult;
use crate::wire::WireRow;
use std::future::Future;
use std::sync::Arc;

/// Access to the remote table store.
///
/// A batch upsert is all-or-nothing from the caller's view: either every
/// row was stored or the call fails. Upsert replaces rows by id.
pub trait RemoteGateway: Send + Sync + 'static {
    /// Inserts or replaces `rows` in table `W::TABLE`.
    fn upsert_many<W: WireRow>(&self, rows: &[W]) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Deletes one row by id. Deleting an absent row succeeds.
    fn delete_by_id(&self, table: &str, id: &str) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Fetches every row of `owner` in table `W::TABLE`.
    fn select_by_owner<W: WireRow>(
        &self,
        owner: &str,
    ) -> impl Future<Output = RemoteResult<Vec<W>>> + Send;
}

impl<G: RemoteGateway> RemoteGateway for Arc<G> {
    fn upsert_many<W: WireRow>(&self, rows: &[W]) -> impl Future<Output = RemoteResult<()>> + Send {
        (**self).upsert_many(rows)
    }

    fn delete_by_id(&self, table: &str, id: &str) -> impl Future<Output = RemoteResult<()>> + Send {
        (**self).delete_by_id(table, id)
    }

    fn select_by_owner<W: WireRow>(
        &self,
        owner: &str,
    ) -> impl Future<Output = RemoteResult<Vec<W>>> + Send {
        (**self).select_by_owner(owner)
    }
}

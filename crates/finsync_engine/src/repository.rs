//! The mutation façade used by the UI layer.

use crate::coordinator::{SyncCoordinator, SyncOutcome, SyncStatus};
use crate::error::SyncResult;
use finsync_core::{Entity, EntityTable, LiveQuery, OwnerId};
use finsync_remote::{RemoteGateway, WireEntity, WireRow};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Local-first access to one entity type.
///
/// Writes land in the local store immediately and never wait on the
/// network. Every add or update flags the record unsynced and, when
/// auto-sync is on and a tokio runtime is available, starts a background
/// run of the coordinator.
pub struct Repository<E: WireEntity, R: RemoteGateway> {
    coordinator: Arc<SyncCoordinator<E, R>>,
    auto_sync: bool,
}

impl<E: WireEntity, R: RemoteGateway> Clone for Repository<E, R> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            auto_sync: self.auto_sync,
        }
    }
}

impl<E: WireEntity, R: RemoteGateway> Repository<E, R> {
    /// Creates a façade over `coordinator`.
    pub fn new(coordinator: Arc<SyncCoordinator<E, R>>, auto_sync: bool) -> Self {
        Self {
            coordinator,
            auto_sync,
        }
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &Arc<SyncCoordinator<E, R>> {
        &self.coordinator
    }

    fn table(&self) -> &EntityTable<E> {
        self.coordinator.table()
    }

    /// Stores a new record, assigning an id if it has none. User profiles
    /// get their owner id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored as it is or the local
    /// write fails.
    pub fn add(&self, mut entity: E) -> SyncResult<E> {
        if entity.id().is_unassigned() {
            let id = entity.fresh_id();
            entity.set_id(id);
        }
        entity.set_synced(false);
        self.table().upsert(&entity)?;
        debug!(table = E::TABLE, id = %entity.id(), "added record");
        self.schedule_sync(entity.owner_id().clone());
        Ok(entity)
    }

    /// Replaces an existing record. The record becomes unsynced even if it
    /// did not change.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no id or the local write fails.
    pub fn update(&self, mut entity: E) -> SyncResult<E> {
        entity.set_synced(false);
        self.table().upsert(&entity)?;
        debug!(table = E::TABLE, id = %entity.id(), "updated record");
        self.schedule_sync(entity.owner_id().clone());
        Ok(entity)
    }

    /// Deletes a record locally and, when online, remotely.
    ///
    /// The remote delete is best effort: its failure is logged and, with
    /// remote delete tracking on, recorded as a tombstone for the next run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local delete fails.
    pub async fn delete(&self, entity: &E) -> SyncResult<()> {
        let id = entity.id();
        let owner = entity.owner_id();
        let track = self.coordinator.tracks_remote_deletes();

        if !self.coordinator.connectivity().is_available() {
            if track {
                self.table().delete_with_tombstone(id, owner)?;
            } else {
                self.table().delete_by_id(id)?;
            }
            debug!(table = E::TABLE, id = %id, "deleted record while offline");
            return Ok(());
        }

        self.table().delete_by_id(id)?;
        let table = <E::Wire as WireRow>::TABLE;
        match self.coordinator.remote().delete_by_id(table, id.as_str()).await {
            Ok(()) => debug!(table, id = %id, "deleted record remotely"),
            Err(err) => {
                warn!(table, id = %id, error = %err, "remote delete failed");
                if track {
                    self.table().add_tombstone(id, owner)?;
                }
            }
        }
        Ok(())
    }

    /// Observes the records of `owner`.
    pub fn observe(&self, owner: &OwnerId) -> LiveQuery<E> {
        self.table().get_for_owner(owner)
    }

    /// Returns the records of `owner` as they are now.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored record cannot be decoded.
    pub fn list(&self, owner: &OwnerId) -> SyncResult<Vec<E>> {
        Ok(self.table().snapshot_for_owner(owner)?)
    }

    /// Runs the coordinator for `owner` and waits for it.
    ///
    /// # Errors
    ///
    /// See [`SyncCoordinator::sync`].
    pub async fn trigger_sync(&self, owner: &OwnerId) -> SyncResult<SyncOutcome> {
        self.coordinator.sync(owner).await
    }

    /// Returns how many records of `owner` wait to be pushed.
    pub fn pending_count(&self, owner: &OwnerId) -> usize {
        self.table().count_unsynced(owner)
    }

    /// Returns the sync status of `owner`.
    pub fn status(&self, owner: &OwnerId) -> SyncStatus {
        self.coordinator.status(owner)
    }

    fn schedule_sync(&self, owner: OwnerId) {
        if !self.auto_sync || !self.coordinator.connectivity().is_available() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            debug!(table = E::TABLE, "no async runtime, sync left to the next trigger");
            return;
        };
        let coordinator = Arc::clone(&self.coordinator);
        handle.spawn(async move {
            match coordinator.sync(&owner).await {
                Ok(SyncOutcome::Completed(_)) => {}
                Ok(outcome) => {
                    debug!(table = E::TABLE, owner = %owner, ?outcome, "background sync not run");
                }
                // Already logged and kept in the coordinator status.
                Err(err) => debug!(table = E::TABLE, owner = %owner, error = %err, "background sync failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::connectivity::{Connectivity, ConnectivitySignal};
    use finsync_core::{EntityId, LocalStore, Portfolio};
    use finsync_remote::MemoryRemote;

    fn portfolio(name: &str) -> Portfolio {
        Portfolio {
            id: EntityId::unassigned(),
            owner_id: OwnerId::new("u1"),
            name: name.into(),
            currency: "USD".into(),
            is_synced: true,
        }
    }

    fn repository(online: bool, config: SyncConfig) -> (Repository<Portfolio, MemoryRemote>, MemoryRemote) {
        let remote = MemoryRemote::new();
        let state = if online {
            Connectivity::Available
        } else {
            Connectivity::Unavailable
        };
        let coordinator = SyncCoordinator::new(
            LocalStore::open_in_memory().unwrap().table(),
            Arc::new(remote.clone()),
            ConnectivitySignal::new(state),
            &config,
        );
        (Repository::new(Arc::new(coordinator), false), remote)
    }

    #[test]
    fn add_assigns_id_and_clears_flag() {
        let (repo, _) = repository(false, SyncConfig::default());
        let stored = repo.add(portfolio("Stocks")).unwrap();
        assert!(!stored.id.is_unassigned());
        assert!(!stored.is_synced);
        assert_eq!(repo.pending_count(&OwnerId::new("u1")), 1);
    }

    #[test]
    fn add_keeps_an_existing_id() {
        let (repo, _) = repository(false, SyncConfig::default());
        let mut p = portfolio("Stocks");
        p.id = EntityId::from("fixed");
        assert_eq!(repo.add(p).unwrap().id, EntityId::from("fixed"));
    }

    #[tokio::test]
    async fn update_always_resets_the_flag() {
        let (repo, _) = repository(true, SyncConfig::default());
        let owner = OwnerId::new("u1");
        let stored = repo.add(portfolio("Stocks")).unwrap();
        repo.trigger_sync(&owner).await.unwrap();
        assert_eq!(repo.pending_count(&owner), 0);

        let mut unchanged = repo.list(&owner).unwrap().remove(0);
        assert!(unchanged.is_synced);
        unchanged.is_synced = true;
        repo.update(unchanged).unwrap();
        assert_eq!(repo.pending_count(&owner), 1);
        assert_eq!(repo.list(&owner).unwrap()[0].id, stored.id);
    }

    #[test]
    fn update_without_id_fails() {
        let (repo, _) = repository(false, SyncConfig::default());
        assert!(repo.update(portfolio("Stocks")).unwrap_err().is_storage());
    }

    #[tokio::test]
    async fn online_delete_reaches_the_remote() {
        let (repo, remote) = repository(true, SyncConfig::default());
        let owner = OwnerId::new("u1");
        let stored = repo.add(portfolio("Stocks")).unwrap();
        repo.trigger_sync(&owner).await.unwrap();
        assert_eq!(remote.len("portfolios"), 1);

        repo.delete(&stored).await.unwrap();
        assert!(repo.list(&owner).unwrap().is_empty());
        assert!(remote.is_empty("portfolios"));
    }

    #[tokio::test]
    async fn offline_delete_with_tracking_leaves_a_tombstone() {
        let (repo, _) = repository(false, SyncConfig::new().with_track_remote_deletes(true));
        let stored = repo.add(portfolio("Stocks")).unwrap();

        repo.delete(&stored).await.unwrap();
        assert!(repo.coordinator().table().is_tombstoned(&stored.id));
    }
}

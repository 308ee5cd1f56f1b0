//! Running every table's coordinator together.

use crate::connectivity::{Connectivity, ConnectivitySignal};
use crate::coordinator::{SyncCoordinator, SyncOutcome, SyncStatus};
use crate::error::SyncResult;
use finsync_core::{Entity, OwnerId};
use finsync_remote::{RemoteGateway, WireEntity};
use parking_lot::RwLock;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased view of one coordinator.
pub trait SyncTarget: Send + Sync {
    /// Local table name.
    fn table_name(&self) -> &'static str;

    /// Runs one reconciliation for `owner`.
    fn sync_owner(self: Arc<Self>, owner: OwnerId) -> BoxFuture<'static, SyncResult<SyncOutcome>>;

    /// Returns how many rows of `owner` wait to be pushed.
    fn pending_count(&self, owner: &OwnerId) -> usize;

    /// Returns the status of `owner`.
    fn status(&self, owner: &OwnerId) -> SyncStatus;
}

impl<E: WireEntity, R: RemoteGateway> SyncTarget for SyncCoordinator<E, R> {
    fn table_name(&self) -> &'static str {
        E::TABLE
    }

    fn sync_owner(self: Arc<Self>, owner: OwnerId) -> BoxFuture<'static, SyncResult<SyncOutcome>> {
        Box::pin(async move { self.sync(&owner).await })
    }

    fn pending_count(&self, owner: &OwnerId) -> usize {
        SyncCoordinator::table(self).count_unsynced(owner)
    }

    fn status(&self, owner: &OwnerId) -> SyncStatus {
        SyncCoordinator::status(self, owner)
    }
}

/// Supplies the signed-in user.
pub trait SessionProvider: Send + Sync {
    /// Returns the current user id, or `None` when signed out.
    fn current_user_id(&self) -> Option<OwnerId>;
}

/// A settable session, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    user: Arc<RwLock<Option<OwnerId>>>,
}

impl SessionHandle {
    /// Creates a signed-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signs `user` in.
    pub fn sign_in(&self, user: OwnerId) {
        *self.user.write() = Some(user);
    }

    /// Signs out.
    pub fn sign_out(&self) {
        *self.user.write() = None;
    }
}

impl SessionProvider for SessionHandle {
    fn current_user_id(&self) -> Option<OwnerId> {
        self.user.read().clone()
    }
}

/// Outcome of one table in a [`SyncHub::trigger_all`] round.
#[derive(Debug)]
pub struct TargetRun {
    /// Table name.
    pub table: &'static str,
    /// What the run returned.
    pub result: SyncResult<SyncOutcome>,
}

/// Runs every registered coordinator for an owner.
pub struct SyncHub {
    targets: Vec<Arc<dyn SyncTarget>>,
    connectivity: ConnectivitySignal,
}

impl SyncHub {
    /// Creates a hub with no targets.
    pub fn new(connectivity: ConnectivitySignal) -> Self {
        Self {
            targets: Vec::new(),
            connectivity,
        }
    }

    /// Adds a target.
    pub fn register(&mut self, target: Arc<dyn SyncTarget>) {
        self.targets.push(target);
    }

    /// Returns the registered targets.
    pub fn targets(&self) -> &[Arc<dyn SyncTarget>] {
        &self.targets
    }

    /// Returns the connectivity signal.
    pub fn connectivity(&self) -> &ConnectivitySignal {
        &self.connectivity
    }

    /// Returns how many rows of `owner` wait to be pushed, over all tables.
    pub fn pending_total(&self, owner: &OwnerId) -> usize {
        self.targets.iter().map(|t| t.pending_count(owner)).sum()
    }

    /// Runs every target for `owner` concurrently and waits for all of
    /// them. Results are sorted by table name.
    ///
    /// Must be called within a tokio runtime.
    pub async fn trigger_all(&self, owner: &OwnerId) -> Vec<TargetRun> {
        let mut set = JoinSet::new();
        for target in &self.targets {
            let target = Arc::clone(target);
            let owner = owner.clone();
            set.spawn(async move {
                let table = target.table_name();
                TargetRun {
                    table,
                    result: target.sync_owner(owner).await,
                }
            });
        }

        let mut runs = Vec::with_capacity(self.targets.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(run) => runs.push(run),
                Err(err) => warn!(error = %err, "sync task did not finish"),
            }
        }
        runs.sort_by_key(|run| run.table);
        runs
    }

    /// Spawns a task that runs every target for the signed-in user each time
    /// connectivity becomes available.
    ///
    /// The task ends when every [`ConnectivitySignal`] clone is dropped.
    /// Must be called within a tokio runtime.
    pub fn spawn_reconnect_listener(
        self: &Arc<Self>,
        session: Arc<dyn SessionProvider>,
    ) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        let mut changes = self.connectivity.subscribe();

        tokio::spawn(async move {
            let mut previous = *changes.borrow_and_update();
            while changes.changed().await.is_ok() {
                let current = *changes.borrow_and_update();
                let reconnected =
                    current == Connectivity::Available && previous != Connectivity::Available;
                previous = current;
                if !reconnected {
                    continue;
                }

                let Some(owner) = session.current_user_id() else {
                    debug!("connectivity restored with nobody signed in");
                    continue;
                };
                info!(owner = %owner, "connectivity restored, syncing all tables");
                let runs = hub.trigger_all(&owner).await;
                let failed = runs.iter().filter(|run| run.result.is_err()).count();
                if failed > 0 {
                    warn!(owner = %owner, failed, "some tables failed to sync after reconnect");
                }
            }
        })
    }
}

impl std::fmt::Debug for SyncHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables: Vec<&str> = self.targets.iter().map(|t| t.table_name()).collect();
        f.debug_struct("SyncHub").field("targets", &tables).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use finsync_core::{EntityId, Goal, LocalStore, Portfolio};
    use finsync_remote::MemoryRemote;
    use std::time::Duration;

    fn hub(store: &LocalStore, remote: &MemoryRemote, signal: &ConnectivitySignal) -> SyncHub {
        let config = SyncConfig::default();
        let remote = Arc::new(remote.clone());
        let mut hub = SyncHub::new(signal.clone());
        hub.register(Arc::new(SyncCoordinator::<Goal, _>::new(
            store.table(),
            Arc::clone(&remote),
            signal.clone(),
            &config,
        )));
        hub.register(Arc::new(SyncCoordinator::<Portfolio, _>::new(
            store.table(),
            remote,
            signal.clone(),
            &config,
        )));
        hub
    }

    fn seed(store: &LocalStore) {
        store
            .table::<Portfolio>()
            .upsert(&Portfolio {
                id: EntityId::from("p1"),
                owner_id: OwnerId::new("u1"),
                name: "ETF".into(),
                currency: "EUR".into(),
                is_synced: false,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn trigger_all_runs_every_table() {
        let store = LocalStore::open_in_memory().unwrap();
        let remote = MemoryRemote::new();
        let signal = ConnectivitySignal::new(Connectivity::Available);
        let hub = hub(&store, &remote, &signal);
        seed(&store);
        assert_eq!(hub.pending_total(&OwnerId::new("u1")), 1);

        let runs = hub.trigger_all(&OwnerId::new("u1")).await;
        let tables: Vec<_> = runs.iter().map(|r| r.table).collect();
        assert_eq!(tables, ["goals", "portfolios"]);
        assert!(runs.iter().all(|r| matches!(r.result, Ok(SyncOutcome::Completed(_)))));
        assert_eq!(remote.len("portfolios"), 1);
        assert_eq!(hub.pending_total(&OwnerId::new("u1")), 0);
    }

    #[tokio::test]
    async fn reconnect_syncs_the_signed_in_user() {
        let store = LocalStore::open_in_memory().unwrap();
        let remote = MemoryRemote::new();
        let signal = ConnectivitySignal::new(Connectivity::Unavailable);
        let hub = Arc::new(hub(&store, &remote, &signal));
        seed(&store);

        let session = SessionHandle::new();
        session.sign_in(OwnerId::new("u1"));
        let _listener = hub.spawn_reconnect_listener(Arc::new(session));

        signal.set(Connectivity::Available);
        for _ in 0..200 {
            if remote.len("portfolios") == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(remote.len("portfolios"), 1);
    }

    #[test]
    fn session_handle_tracks_sign_in() {
        let session = SessionHandle::new();
        assert_eq!(session.current_user_id(), None);
        session.sign_in(OwnerId::new("u1"));
        assert_eq!(session.current_user_id(), Some(OwnerId::new("u1")));
        session.sign_out();
        assert_eq!(session.current_user_id(), None);
    }
}

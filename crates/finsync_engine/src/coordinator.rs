//! Per-table reconciliation of the local store with the remote.
//!
//! One coordinator serves one entity type. A run for an owner pulls remote
//! rows (unless the table is push-only), flushes pending remote deletes,
//! then pushes every unsynced row in one batch upsert and flags the rows it
//! pushed as synced. Local edits always win over pulled rows until they are
//! pushed.

use crate::config::{PullPolicy, SyncConfig};
use crate::connectivity::ConnectivitySignal;
use crate::error::{RemoteOperation, SyncError, SyncResult};
use finsync_core::{ApplyMode, Entity, EntityTable, OwnerId};
use finsync_remote::{RemoteGateway, WireEntity, WireRow};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Whether a run is in progress for an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No run in progress.
    Idle,
    /// A run is in progress.
    Syncing,
}

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRunReport {
    /// Remote rows written locally.
    pub pulled: usize,
    /// Synced local rows removed because the remote no longer has them.
    pub removed: usize,
    /// Remote rows ignored because the local copy is unsynced or deleted.
    pub skipped_local_wins: usize,
    /// Remote rows that could not be mapped to a local entity.
    pub rejected_rows: usize,
    /// Rows sent to the remote.
    pub pushed: usize,
    /// Pushed rows edited locally while the push was in flight; they stay
    /// unsynced.
    pub stale_after_push: usize,
    /// Pending remote deletes confirmed during the run.
    pub deletes_flushed: usize,
    /// Wall time of the run.
    pub duration: Duration,
}

/// Result of asking a coordinator to sync an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote is unreachable; nothing was attempted.
    Offline,
    /// A run for the same owner is in progress; this trigger was dropped.
    Coalesced,
    /// A run finished.
    Completed(SyncRunReport),
}

impl SyncOutcome {
    /// Returns the report of a completed run.
    pub fn report(&self) -> Option<&SyncRunReport> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Sync status of one (table, owner) pair, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Run state.
    pub state: SyncState,
    /// Rows waiting to be pushed.
    pub pending: usize,
    /// Error of the last run, cleared by a successful run.
    pub last_error: Option<String>,
    /// End of the last successful run.
    pub last_success: Option<Instant>,
    /// Runs finished since startup.
    pub runs: u64,
}

#[derive(Debug, Clone, Default)]
struct RunHistory {
    last_error: Option<String>,
    last_success: Option<Instant>,
    runs: u64,
}

/// Removes the owner from the in-flight set when the run ends, however it
/// ends.
struct RunGuard<'a> {
    in_flight: &'a Mutex<HashSet<OwnerId>>,
    owner: OwnerId,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.owner);
    }
}

/// Reconciles the table of `E` with remote table `E::Wire::TABLE`.
pub struct SyncCoordinator<E: WireEntity, R: RemoteGateway> {
    table: EntityTable<E>,
    remote: Arc<R>,
    connectivity: ConnectivitySignal,
    policy: PullPolicy,
    push_batch_size: Option<usize>,
    track_remote_deletes: bool,
    in_flight: Mutex<HashSet<OwnerId>>,
    history: Mutex<HashMap<OwnerId, RunHistory>>,
}

impl<E: WireEntity, R: RemoteGateway> SyncCoordinator<E, R> {
    /// Creates a coordinator for `table`.
    pub fn new(
        table: EntityTable<E>,
        remote: Arc<R>,
        connectivity: ConnectivitySignal,
        config: &SyncConfig,
    ) -> Self {
        Self {
            table,
            remote,
            connectivity,
            policy: config.pull_policy(E::TABLE),
            push_batch_size: config.push_batch_size,
            track_remote_deletes: config.track_remote_deletes,
            in_flight: Mutex::new(HashSet::new()),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the local table.
    pub fn table(&self) -> &EntityTable<E> {
        &self.table
    }

    /// Returns the gateway.
    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// Returns the connectivity signal.
    pub fn connectivity(&self) -> &ConnectivitySignal {
        &self.connectivity
    }

    /// Returns the pull policy in effect.
    pub fn pull_policy(&self) -> PullPolicy {
        self.policy
    }

    /// Returns whether failed remote deletes are kept as tombstones.
    pub fn tracks_remote_deletes(&self) -> bool {
        self.track_remote_deletes
    }

    /// Returns the status of `owner`.
    pub fn status(&self, owner: &OwnerId) -> SyncStatus {
        let state = if self.in_flight.lock().contains(owner) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        };
        let history = self.history.lock().get(owner).cloned().unwrap_or_default();
        SyncStatus {
            state,
            pending: self.table.count_unsynced(owner),
            last_error: history.last_error,
            last_success: history.last_success,
            runs: history.runs,
        }
    }

    /// Runs one reconciliation for `owner`.
    ///
    /// Returns [`SyncOutcome::Offline`] without touching anything when the
    /// remote is unreachable, and [`SyncOutcome::Coalesced`] when a run for
    /// `owner` is already in progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store fails or a gateway call fails.
    /// Rows pushed by the failing call stay unsynced. A failed pending
    /// delete is reported only after the push has run.
    pub async fn sync(&self, owner: &OwnerId) -> SyncResult<SyncOutcome> {
        if !self.connectivity.is_available() {
            debug!(table = E::TABLE, owner = %owner, "offline, sync skipped");
            return Ok(SyncOutcome::Offline);
        }

        let Some(_guard) = self.begin(owner) else {
            debug!(table = E::TABLE, owner = %owner, "sync already running, trigger coalesced");
            return Ok(SyncOutcome::Coalesced);
        };

        let started = Instant::now();
        let result = self.run(owner, started).await;
        self.record(owner, &result);
        result.map(SyncOutcome::Completed)
    }

    fn begin(&self, owner: &OwnerId) -> Option<RunGuard<'_>> {
        if !self.in_flight.lock().insert(owner.clone()) {
            return None;
        }
        Some(RunGuard {
            in_flight: &self.in_flight,
            owner: owner.clone(),
        })
    }

    async fn run(&self, owner: &OwnerId, started: Instant) -> SyncResult<SyncRunReport> {
        let mut report = SyncRunReport::default();

        if self.policy != PullPolicy::PushOnly {
            self.pull(owner, &mut report).await?;
        }
        let flushed = if self.track_remote_deletes {
            self.flush_deletes(owner, &mut report).await
        } else {
            Ok(())
        };
        self.push(owner, &mut report).await?;
        flushed?;

        report.duration = started.elapsed();
        Ok(report)
    }

    async fn pull(&self, owner: &OwnerId, report: &mut SyncRunReport) -> SyncResult<()> {
        let rows: Vec<E::Wire> = self
            .remote
            .select_by_owner(owner.as_str())
            .await
            .map_err(|e| SyncError::remote(E::TABLE, RemoteOperation::Select, e))?;
        debug!(table = E::TABLE, owner = %owner, rows = rows.len(), "pulled remote rows");

        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id().to_owned();
            match E::from_wire(row) {
                Ok(entity) => entities.push(entity),
                Err(err) => {
                    warn!(table = E::TABLE, id = %id, error = %err, "skipping unmappable remote row");
                    report.rejected_rows += 1;
                }
            }
        }

        // An unmappable row is missing from `entities`; replacing would drop
        // its local copy.
        let mode = match self.policy {
            PullPolicy::ReplaceAll if report.rejected_rows == 0 => ApplyMode::ReplaceAll,
            _ => ApplyMode::Merge,
        };

        let applied = self.table.apply_pulled(owner, entities, mode)?;
        report.pulled = applied.applied;
        report.removed = applied.removed;
        report.skipped_local_wins = applied.skipped_local_wins + applied.skipped_tombstoned;
        if applied.skipped_foreign > 0 {
            warn!(
                table = E::TABLE,
                owner = %owner,
                rows = applied.skipped_foreign,
                "remote returned rows of another owner"
            );
        }
        Ok(())
    }

    /// Sends every pending remote delete of `owner`. A failed delete keeps
    /// its tombstone and does not stop the others; the first failure is
    /// returned once all were tried.
    async fn flush_deletes(&self, owner: &OwnerId, report: &mut SyncRunReport) -> SyncResult<()> {
        let mut first_failure = None;
        for id in self.table.tombstones_for_owner(owner) {
            match self
                .remote
                .delete_by_id(<E::Wire as WireRow>::TABLE, id.as_str())
                .await
            {
                Ok(()) => {
                    self.table.clear_tombstone(&id)?;
                    report.deletes_flushed += 1;
                }
                Err(err) => {
                    warn!(table = E::TABLE, id = %id, error = %err, "pending remote delete failed");
                    first_failure
                        .get_or_insert_with(|| SyncError::remote(E::TABLE, RemoteOperation::Delete, err));
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    async fn push(&self, owner: &OwnerId, report: &mut SyncRunReport) -> SyncResult<()> {
        let pending = self.table.snapshot_unsynced_for_owner(owner)?;
        if pending.is_empty() {
            return Ok(());
        }

        let rows: Vec<E::Wire> = pending.iter().map(|row| row.entity.to_wire()).collect();
        let chunk = self.push_batch_size.unwrap_or(rows.len()).max(1);

        for (wire, local) in rows.chunks(chunk).zip(pending.chunks(chunk)) {
            self.remote
                .upsert_many(wire)
                .await
                .map_err(|e| SyncError::remote(E::TABLE, RemoteOperation::Upsert, e))?;
            report.pushed += wire.len();

            for row in local {
                if !self
                    .table
                    .mark_synced_if_unchanged(row.entity.id(), row.revision)?
                {
                    report.stale_after_push += 1;
                }
            }
        }
        debug!(table = E::TABLE, owner = %owner, pushed = report.pushed, "pushed local rows");
        Ok(())
    }

    fn record(&self, owner: &OwnerId, result: &SyncResult<SyncRunReport>) {
        let mut history = self.history.lock();
        let entry = history.entry(owner.clone()).or_default();
        entry.runs += 1;
        match result {
            Ok(report) => {
                entry.last_error = None;
                entry.last_success = Some(Instant::now());
                info!(
                    table = E::TABLE,
                    owner = %owner,
                    pulled = report.pulled,
                    pushed = report.pushed,
                    stale = report.stale_after_push,
                    rejected = report.rejected_rows,
                    deletes = report.deletes_flushed,
                    elapsed_ms = report.duration.as_millis() as u64,
                    "sync run completed"
                );
            }
            Err(err) => {
                entry.last_error = Some(err.to_string());
                warn!(table = E::TABLE, owner = %owner, error = %err, "sync run failed");
            }
        }
    }
}

impl<E: WireEntity, R: RemoteGateway> std::fmt::Debug for SyncCoordinator<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("table", &E::TABLE)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

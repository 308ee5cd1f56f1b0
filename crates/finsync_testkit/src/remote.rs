//! A scriptable remote for sync tests.
//!
//! [`ScriptedRemote`] stores rows in a [`MemoryRemote`] and adds what tests
//! need around it: failure injection, a log of every call, artificial
//! latency, gates that hold calls until released, and a counter of the
//! highest number of calls in flight at once.

use finsync_remote::{MemoryRemote, RemoteError, RemoteGateway, RemoteResult, WireRow};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Gateway operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// `upsert_many`.
    Upsert,
    /// `delete_by_id`.
    Delete,
    /// `select_by_owner`.
    Select,
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// An upsert of the listed ids.
    Upsert {
        /// Remote table.
        table: String,
        /// Ids in request order.
        ids: Vec<String>,
    },
    /// A delete of one id.
    Delete {
        /// Remote table.
        table: String,
        /// Deleted id.
        id: String,
    },
    /// A select of one owner's rows.
    Select {
        /// Remote table.
        table: String,
        /// Owner filter.
        owner: String,
    },
}

impl RemoteCall {
    /// Returns the operation kind.
    pub fn op(&self) -> RemoteOp {
        match self {
            Self::Upsert { .. } => RemoteOp::Upsert,
            Self::Delete { .. } => RemoteOp::Delete,
            Self::Select { .. } => RemoteOp::Select,
        }
    }

    /// Returns the remote table.
    pub fn table(&self) -> &str {
        match self {
            Self::Upsert { table, .. } | Self::Delete { table, .. } | Self::Select { table, .. } => {
                table
            }
        }
    }
}

struct Script {
    failing: Mutex<HashSet<RemoteOp>>,
    calls: Mutex<Vec<RemoteCall>>,
    delay: Mutex<Option<Duration>>,
    upsert_gate: watch::Sender<bool>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements the in-flight counter when a call ends, even if cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A [`RemoteGateway`] with failure injection and call recording.
///
/// Clones share rows and script.
#[derive(Clone)]
pub struct ScriptedRemote {
    rows: MemoryRemote,
    script: Arc<Script>,
}

impl Default for ScriptedRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRemote {
    /// Creates an empty remote that accepts every call.
    pub fn new() -> Self {
        Self {
            rows: MemoryRemote::new(),
            script: Arc::new(Script {
                failing: Mutex::new(HashSet::new()),
                calls: Mutex::new(Vec::new()),
                delay: Mutex::new(None),
                upsert_gate: watch::channel(true).0,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns the row storage, for seeding and inspecting rows.
    pub fn rows(&self) -> &MemoryRemote {
        &self.rows
    }

    /// Makes every later call of `op` fail with a transport error, or stop
    /// failing.
    pub fn fail(&self, op: RemoteOp, failing: bool) {
        let mut set = self.script.failing.lock();
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    /// Delays every later call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.script.delay.lock() = delay;
    }

    /// Holds later upserts (after they are recorded) until
    /// [`release_upserts`](Self::release_upserts).
    pub fn hold_upserts(&self) {
        self.script.upsert_gate.send_replace(false);
    }

    /// Lets held upserts continue.
    pub fn release_upserts(&self) {
        self.script.upsert_gate.send_replace(true);
    }

    /// Returns every call so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.script.calls.lock().clone()
    }

    /// Returns how many calls of `op` were made.
    pub fn count(&self, op: RemoteOp) -> usize {
        self.script
            .calls
            .lock()
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    /// Returns the id lists of every upsert into `table`.
    pub fn upserts(&self, table: &str) -> Vec<Vec<String>> {
        self.script
            .calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Upsert { table: t, ids } if t == table => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.script.calls.lock().clear();
    }

    /// Returns the highest number of calls that were in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.script.max_in_flight.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` calls of `op` were recorded.
    ///
    /// # Panics
    ///
    /// Panics if that takes longer than five seconds.
    pub async fn wait_for(&self, op: RemoteOp, n: usize) {
        for _ in 0..5_000 {
            if self.count(op) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("timed out waiting for {n} {op:?} calls");
    }

    async fn enter(&self, op: RemoteOp, call: RemoteCall) -> RemoteResult<InFlight<'_>> {
        self.script.calls.lock().push(call);
        let now = self.script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.script.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.script.in_flight);

        let delay = *self.script.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if op == RemoteOp::Upsert {
            let mut gate = self.script.upsert_gate.subscribe();
            let _ = gate.wait_for(|open| *open).await.map(drop);
        }

        if self.script.failing.lock().contains(&op) {
            return Err(RemoteError::Transport(format!("injected {op:?} failure")));
        }
        Ok(guard)
    }
}

impl RemoteGateway for ScriptedRemote {
    async fn upsert_many<W: WireRow>(&self, rows: &[W]) -> RemoteResult<()> {
        let call = RemoteCall::Upsert {
            table: W::TABLE.to_owned(),
            ids: rows.iter().map(|row| row.id().to_owned()).collect(),
        };
        let _guard = self.enter(RemoteOp::Upsert, call).await?;
        self.rows.upsert_many(rows).await
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> RemoteResult<()> {
        let call = RemoteCall::Delete {
            table: table.to_owned(),
            id: id.to_owned(),
        };
        let _guard = self.enter(RemoteOp::Delete, call).await?;
        self.rows.delete_by_id(table, id).await
    }

    async fn select_by_owner<W: WireRow>(&self, owner: &str) -> RemoteResult<Vec<W>> {
        let call = RemoteCall::Select {
            table: W::TABLE.to_owned(),
            owner: owner.to_owned(),
        };
        let _guard = self.enter(RemoteOp::Select, call).await?;
        self.rows.select_by_owner(owner).await
    }
}

impl std::fmt::Debug for ScriptedRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRemote")
            .field("calls", &self.script.calls.lock().len())
            .field("max_concurrency", &self.max_concurrency())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsync_remote::{WalletRow, WireEntity};

    fn row(id: &str) -> WalletRow {
        let mut wallet = crate::samples::wallet("u1", "Cash");
        wallet.id = id.into();
        wallet.to_wire()
    }

    #[tokio::test]
    async fn records_calls_and_stores_rows() {
        let remote = ScriptedRemote::new();
        remote.upsert_many(&[row("a"), row("b")]).await.unwrap();
        let rows: Vec<WalletRow> = remote.select_by_owner("u1").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(remote.upserts("wallets"), vec![vec!["a".to_owned(), "b".to_owned()]]);
        assert_eq!(remote.count(RemoteOp::Select), 1);
        assert_eq!(remote.max_concurrency(), 1);
    }

    #[tokio::test]
    async fn injected_failures_leave_rows_untouched() {
        let remote = ScriptedRemote::new();
        remote.fail(RemoteOp::Upsert, true);
        let err = remote.upsert_many(&[row("a")]).await.unwrap_err();

        assert!(err.is_transport());
        assert!(remote.rows().is_empty("wallets"));
        assert_eq!(remote.count(RemoteOp::Upsert), 1);

        remote.fail(RemoteOp::Upsert, false);
        remote.upsert_many(&[row("a")]).await.unwrap();
        assert_eq!(remote.rows().len("wallets"), 1);
    }

    #[tokio::test]
    async fn held_upserts_wait_for_release() {
        let remote = ScriptedRemote::new();
        remote.hold_upserts();

        let task = tokio::spawn({
            let remote = remote.clone();
            async move { remote.upsert_many(&[row("a")]).await }
        });
        remote.wait_for(RemoteOp::Upsert, 1).await;
        assert!(remote.rows().is_empty("wallets"));

        remote.release_upserts();
        task.await.unwrap().unwrap();
        assert_eq!(remote.rows().len("wallets"), 1);
    }
}

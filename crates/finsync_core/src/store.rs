//! The local entity store.
//!
//! All tables live in one in-memory state guarded by a read/write lock, and
//! every write is first appended to the journal as a single frame. A write
//! that fails to reach the journal changes nothing in memory.

use crate::change_feed::{ChangeEvent, ChangeFeed, ChangeType};
use crate::config::StoreConfig;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::id::{EntityId, OwnerId};
use crate::journal::{JournalFrame, JournalOp, JournalReader};
use crate::table::EntityTable;
use finsync_storage::{InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

/// One row as held in memory.
#[derive(Debug, Clone)]
pub(crate) struct StoredRow {
    pub(crate) owner_id: OwnerId,
    pub(crate) synced: bool,
    /// Sequence of the write that last put this row.
    pub(crate) revision: u64,
    pub(crate) payload: Vec<u8>,
}

/// Committed contents of every table.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    tables: HashMap<String, BTreeMap<EntityId, StoredRow>>,
    tombstones: HashMap<String, BTreeMap<EntityId, OwnerId>>,
}

impl StoreState {
    pub(crate) fn rows(&self, table: &str) -> impl Iterator<Item = (&EntityId, &StoredRow)> {
        self.tables.get(table).into_iter().flat_map(|rows| rows.iter())
    }

    pub(crate) fn row(&self, table: &str, id: &EntityId) -> Option<&StoredRow> {
        self.tables.get(table).and_then(|rows| rows.get(id))
    }

    pub(crate) fn tombstones(&self, table: &str) -> impl Iterator<Item = (&EntityId, &OwnerId)> {
        self.tombstones.get(table).into_iter().flat_map(|t| t.iter())
    }

    pub(crate) fn is_tombstoned(&self, table: &str, id: &EntityId) -> bool {
        self.tombstones
            .get(table)
            .is_some_and(|t| t.contains_key(id))
    }

    /// Applies one frame and returns the change events it produced.
    fn apply(&mut self, sequence: u64, ops: &[JournalOp]) -> Vec<ChangeEvent> {
        let mut events = Vec::with_capacity(ops.len());

        for op in ops {
            match op {
                JournalOp::Put {
                    table,
                    id,
                    owner_id,
                    synced,
                    payload,
                } => {
                    let previous = self.tables.entry(table.clone()).or_default().insert(
                        id.clone(),
                        StoredRow {
                            owner_id: owner_id.clone(),
                            synced: *synced,
                            revision: sequence,
                            payload: payload.clone(),
                        },
                    );
                    let change_type = if previous.is_some() {
                        ChangeType::Update
                    } else {
                        ChangeType::Insert
                    };
                    events.push(event(sequence, table, id, owner_id, change_type));
                }
                JournalOp::Delete { table, id } => {
                    if let Some(row) = self.tables.get_mut(table).and_then(|rows| rows.remove(id)) {
                        events.push(event(sequence, table, id, &row.owner_id, ChangeType::Delete));
                    }
                }
                JournalOp::MarkSynced { table, id } => {
                    if let Some(row) = self.tables.get_mut(table).and_then(|rows| rows.get_mut(id)) {
                        if !row.synced {
                            row.synced = true;
                            events.push(event(sequence, table, id, &row.owner_id, ChangeType::Synced));
                        }
                    }
                }
                JournalOp::Tombstone {
                    table,
                    id,
                    owner_id,
                } => {
                    self.tombstones
                        .entry(table.clone())
                        .or_default()
                        .insert(id.clone(), owner_id.clone());
                }
                JournalOp::ClearTombstone { table, id } => {
                    if let Some(t) = self.tombstones.get_mut(table) {
                        t.remove(id);
                    }
                }
            }
        }

        events
    }
}

fn event(
    sequence: u64,
    table: &str,
    id: &EntityId,
    owner_id: &OwnerId,
    change_type: ChangeType,
) -> ChangeEvent {
    ChangeEvent {
        sequence,
        table: table.to_owned(),
        entity_id: id.clone(),
        owner_id: owner_id.clone(),
        change_type,
    }
}

/// Row counts of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    /// Table name.
    pub name: String,
    /// Number of rows.
    pub rows: usize,
    /// Rows waiting to be pushed.
    pub unsynced: usize,
    /// Deleted rows waiting for a remote delete.
    pub tombstones: usize,
}

/// Summary of a store, for maintenance tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Per-table counts, sorted by name.
    pub tables: Vec<TableStats>,
    /// Journal size in bytes.
    pub journal_bytes: u64,
    /// Frames appended or replayed since open.
    pub frames: u64,
    /// Sequence of the last committed write.
    pub last_sequence: u64,
}

/// What opening a store found in its journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Frames replayed.
    pub frames: u64,
    /// Bytes of a torn trailing frame that were cut off.
    pub truncated_bytes: u64,
    /// Sequence of the last replayed frame.
    pub last_sequence: u64,
}

struct JournalWriter {
    backend: Box<dyn StorageBackend>,
    next_sequence: u64,
    frames: u64,
    sync_on_write: bool,
}

impl JournalWriter {
    /// Appends a frame; on failure any partially written bytes are cut off.
    fn append(&mut self, frame: &JournalFrame) -> CoreResult<()> {
        let bytes = frame.encode()?;
        let before = self.backend.size()?;

        let result = self.backend.append(&bytes).map(|_| ()).and_then(|()| {
            if self.sync_on_write {
                self.backend.flush()
            } else {
                Ok(())
            }
        });

        if let Err(err) = result {
            if let Err(rollback) = self.backend.truncate(before) {
                warn!(error = %rollback, "failed to roll back partial journal frame");
            }
            return Err(err.into());
        }

        self.frames += 1;
        Ok(())
    }
}

#[cfg(feature = "std")]
type DirGuard = crate::dir::StoreDir;
#[cfg(not(feature = "std"))]
type DirGuard = ();

struct StoreInner {
    writer: Mutex<JournalWriter>,
    state: RwLock<StoreState>,
    feed: ChangeFeed,
    replay: ReplayStats,
    /// Holds the directory lock for as long as the store is open.
    _dir: Option<DirGuard>,
}

/// Durable, observable store for every entity table of one device.
///
/// `LocalStore` is a cheap handle: clones share the same state, journal and
/// change feed. It is created once at startup and passed to every
/// repository and sync coordinator.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

impl LocalStore {
    /// Opens a store that lives only in memory.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches the other openers.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(StoreConfig::default(), Box::new(InMemoryBackend::new()))
    }

    /// Opens a store on an arbitrary backend, replaying its journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal is corrupted or cannot be read.
    pub fn open_with_backend(
        config: StoreConfig,
        backend: Box<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        Self::build(config, backend, None)
    }

    /// Opens the store kept in directory `path`, taking its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is locked by another process, the
    /// journal cannot be opened, or the journal is corrupted.
    #[cfg(feature = "std")]
    pub fn open_dir(path: &std::path::Path, config: StoreConfig) -> CoreResult<Self> {
        let dir = crate::dir::StoreDir::open(path, config.create_if_missing)?;
        let backend = finsync_storage::FileBackend::open(&dir.journal_path())?;
        Self::build(config, Box::new(backend), Some(dir))
    }

    fn build(
        config: StoreConfig,
        mut backend: Box<dyn StorageBackend>,
        dir: Option<DirGuard>,
    ) -> CoreResult<Self> {
        let (state, replay) = replay(backend.as_mut())?;
        debug!(
            frames = replay.frames,
            last_sequence = replay.last_sequence,
            "opened local store"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                writer: Mutex::new(JournalWriter {
                    backend,
                    next_sequence: replay.last_sequence + 1,
                    frames: replay.frames,
                    sync_on_write: config.sync_on_write,
                }),
                state: RwLock::new(state),
                feed: ChangeFeed::new(),
                replay,
                _dir: dir,
            }),
        })
    }

    /// Returns a typed handle on the table of `E`.
    #[must_use]
    pub fn table<E: Entity>(&self) -> EntityTable<E> {
        EntityTable::new(self.clone())
    }

    /// Subscribes to every committed change.
    pub fn subscribe(&self) -> UnboundedReceiver<ChangeEvent> {
        self.inner.feed.subscribe()
    }

    /// Returns what was found in the journal when the store was opened.
    #[must_use]
    pub fn replay_stats(&self) -> ReplayStats {
        self.inner.replay
    }

    /// Returns per-table counts and journal figures.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal size cannot be read.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        let writer = self.inner.writer.lock();
        let state = self.inner.state.read();

        let mut names: Vec<&String> = state.tables.keys().chain(state.tombstones.keys()).collect();
        names.sort();
        names.dedup();

        let tables = names
            .into_iter()
            .map(|name| TableStats {
                name: name.clone(),
                rows: state.rows(name).count(),
                unsynced: state.rows(name).filter(|(_, row)| !row.synced).count(),
                tombstones: state.tombstones(name).count(),
            })
            .collect();

        Ok(StoreStats {
            tables,
            journal_bytes: writer.backend.size()?,
            frames: writer.frames,
            last_sequence: writer.next_sequence - 1,
        })
    }

    /// Builds one frame that recreates the current contents of the store.
    #[must_use]
    pub fn snapshot_frame(&self) -> JournalFrame {
        let writer = self.inner.writer.lock();
        let state = self.inner.state.read();
        snapshot_of(&state, writer.next_sequence - 1)
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.inner.state.read())
    }

    /// Runs `plan` under the writer lock and commits the operations it
    /// returns as one frame.
    ///
    /// `plan` sees the committed state and the sequence the frame will get.
    /// An empty plan commits nothing and returns `Ok(None)`.
    pub(crate) fn write<F>(&self, plan: F) -> CoreResult<Option<u64>>
    where
        F: FnOnce(&StoreState, u64) -> CoreResult<Vec<JournalOp>>,
    {
        let mut writer = self.inner.writer.lock();
        let sequence = writer.next_sequence;

        let ops = plan(&self.inner.state.read(), sequence)?;
        if ops.is_empty() {
            return Ok(None);
        }

        let frame = JournalFrame { sequence, ops };
        writer.append(&frame)?;
        writer.next_sequence += 1;

        let events = self.inner.state.write().apply(sequence, &frame.ops);
        self.inner.feed.emit_batch(&events);
        Ok(Some(sequence))
    }
}

fn snapshot_of(state: &StoreState, sequence: u64) -> JournalFrame {
    let mut ops = Vec::new();
    let mut names: Vec<&String> = state.tables.keys().collect();
    names.sort();
    for name in names {
        for (id, row) in state.rows(name) {
            ops.push(JournalOp::Put {
                table: name.clone(),
                id: id.clone(),
                owner_id: row.owner_id.clone(),
                synced: row.synced,
                payload: row.payload.clone(),
            });
        }
    }
    let mut names: Vec<&String> = state.tombstones.keys().collect();
    names.sort();
    for name in names {
        for (id, owner_id) in state.tombstones(name) {
            ops.push(JournalOp::Tombstone {
                table: name.clone(),
                id: id.clone(),
                owner_id: owner_id.clone(),
            });
        }
    }
    JournalFrame { sequence, ops }
}

/// Rebuilds the state from a journal, cutting off a torn trailing frame.
fn replay(backend: &mut dyn StorageBackend) -> CoreResult<(StoreState, ReplayStats)> {
    let mut state = StoreState::default();
    let mut stats = ReplayStats::default();

    let (valid_end, size) = {
        let mut reader = JournalReader::new(&*backend)?;
        for record in reader.by_ref() {
            let record = record?;
            if record.frame.sequence <= stats.last_sequence && stats.frames > 0 {
                return Err(CoreError::journal_corruption(
                    record.offset,
                    format!(
                        "sequence {} does not follow {}",
                        record.frame.sequence, stats.last_sequence
                    ),
                ));
            }
            state.apply(record.frame.sequence, &record.frame.ops);
            stats.frames += 1;
            stats.last_sequence = record.frame.sequence;
        }
        (reader.valid_end(), reader.size())
    };

    if valid_end < size {
        stats.truncated_bytes = size - valid_end;
        warn!(
            offset = valid_end,
            bytes = stats.truncated_bytes,
            "dropping torn journal tail"
        );
        backend.truncate(valid_end)?;
    }

    Ok((state, stats))
}

/// Outcome of compacting a store directory.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    /// Frames before compaction.
    pub frames_before: u64,
    /// Journal bytes before compaction.
    pub bytes_before: u64,
    /// Journal bytes after compaction.
    pub bytes_after: u64,
}

/// Rewrites the journal of a closed store directory as one snapshot frame.
///
/// With `dry_run` the new journal is built and measured but not written.
///
/// # Errors
///
/// Returns an error if the directory is in use, the journal is corrupted,
/// or the replacement cannot be written.
#[cfg(feature = "std")]
pub fn compact_dir(path: &std::path::Path, dry_run: bool) -> CoreResult<CompactionReport> {
    let dir = crate::dir::StoreDir::open(path, false)?;
    let journal_path = dir.journal_path();

    let mut backend = finsync_storage::FileBackend::open(&journal_path)?;
    let (state, stats) = replay(&mut backend)?;
    let bytes_before = backend.size()?;
    drop(backend);

    let snapshot = snapshot_of(&state, stats.last_sequence);
    let bytes = if snapshot.ops.is_empty() {
        Vec::new()
    } else {
        snapshot.encode()?
    };
    if !dry_run {
        finsync_storage::replace_file_atomically(&journal_path, &bytes)?;
    }

    Ok(CompactionReport {
        frames_before: stats.frames,
        bytes_before,
        bytes_after: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Wallet;
    use finsync_storage::FaultyBackend;

    fn wallet(id: &str, owner: &str, name: &str) -> Wallet {
        Wallet {
            id: EntityId::from(id),
            owner_id: OwnerId::new(owner),
            name: name.into(),
            balance: 0,
            currency: "USD".into(),
            color: "#112233".into(),
            icon: None,
            created_at: 0,
            is_synced: false,
        }
    }

    #[test]
    fn writes_survive_reopen() {
        let backend = InMemoryBackend::new();
        {
            let store =
                LocalStore::open_with_backend(StoreConfig::default(), Box::new(backend.clone()))
                    .unwrap();
            let wallets = store.table::<Wallet>();
            wallets.upsert(&wallet("w1", "u1", "Cash")).unwrap();
            wallets.upsert(&wallet("w2", "u1", "Bank")).unwrap();
            wallets.mark_synced(&EntityId::from("w1")).unwrap();
            wallets.delete_by_id(&EntityId::from("w2")).unwrap();
        }

        let store = LocalStore::open_with_backend(StoreConfig::default(), Box::new(backend)).unwrap();
        assert_eq!(store.replay_stats().frames, 4);

        let wallets = store.table::<Wallet>();
        let all = wallets.snapshot_for_owner(&OwnerId::new("u1")).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_synced);
        assert_eq!(all[0].name, "Cash");
    }

    #[test]
    fn torn_tail_is_dropped_on_open() {
        let backend = InMemoryBackend::new();
        {
            let store =
                LocalStore::open_with_backend(StoreConfig::default(), Box::new(backend.clone()))
                    .unwrap();
            store.table::<Wallet>().upsert(&wallet("w1", "u1", "Cash")).unwrap();
        }
        let good_len = backend.size().unwrap();
        let mut raw = backend.clone();
        raw.append(b"FJNL\x01\x00\xff").unwrap();

        let store = LocalStore::open_with_backend(StoreConfig::default(), Box::new(backend.clone()))
            .unwrap();
        assert_eq!(store.replay_stats().truncated_bytes, 7);
        assert_eq!(backend.size().unwrap(), good_len);
        assert!(store.table::<Wallet>().get(&EntityId::from("w1")).unwrap().is_some());
    }

    #[test]
    fn failed_append_changes_nothing() {
        let (backend, faults) = FaultyBackend::new(InMemoryBackend::new());
        let store = LocalStore::open_with_backend(StoreConfig::default(), Box::new(backend)).unwrap();
        let wallets = store.table::<Wallet>();
        let mut rx = store.subscribe();

        faults.fail_writes(true);
        let result = wallets.upsert(&wallet("w1", "u1", "Cash"));
        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert!(wallets.get(&EntityId::from("w1")).unwrap().is_none());
        assert!(rx.try_recv().is_err());

        faults.fail_writes(false);
        wallets.upsert(&wallet("w1", "u1", "Cash")).unwrap();
        assert!(wallets.get(&EntityId::from("w1")).unwrap().is_some());
    }

    #[test]
    fn stats_count_rows_and_unsynced() {
        let store = LocalStore::open_in_memory().unwrap();
        let wallets = store.table::<Wallet>();
        wallets.upsert(&wallet("w1", "u1", "Cash")).unwrap();
        wallets.upsert(&wallet("w2", "u1", "Bank")).unwrap();
        wallets.mark_synced(&EntityId::from("w2")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.last_sequence, 3);
        assert_eq!(
            stats.tables,
            vec![TableStats {
                name: "wallets".into(),
                rows: 2,
                unsynced: 1,
                tombstones: 0,
            }]
        );
    }

    #[test]
    fn snapshot_frame_recreates_state() {
        let store = LocalStore::open_in_memory().unwrap();
        let wallets = store.table::<Wallet>();
        wallets.upsert(&wallet("w1", "u1", "Cash")).unwrap();
        wallets.upsert(&wallet("w1", "u1", "Cash v2")).unwrap();
        wallets
            .delete_with_tombstone(&EntityId::from("w9"), &OwnerId::new("u1"))
            .unwrap();

        let bytes = store.snapshot_frame().encode().unwrap();
        let copy = LocalStore::open_with_backend(
            StoreConfig::default(),
            Box::new(InMemoryBackend::with_data(bytes)),
        )
        .unwrap();
        let copied = copy.table::<Wallet>();
        assert_eq!(copied.get(&EntityId::from("w1")).unwrap().unwrap().name, "Cash v2");
        assert_eq!(
            copied.tombstones_for_owner(&OwnerId::new("u1")),
            vec![EntityId::from("w9")]
        );
    }
}

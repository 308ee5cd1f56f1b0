//! Typed access to one entity table.

use crate::entity::{check_storable, decode_payload, encode_payload, Entity};
use crate::error::{CoreError, CoreResult};
use crate::id::{EntityId, OwnerId};
use crate::journal::JournalOp;
use crate::live::{LiveFilter, LiveQuery};
use crate::store::{LocalStore, StoreState};
use std::collections::HashSet;
use std::marker::PhantomData;

/// An entity read together with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow<E> {
    /// The entity, flagged unsynced.
    pub entity: E,
    /// Sequence of the write that last put the row.
    pub revision: u64,
}

/// How pulled rows are merged into the local table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Upsert remote rows; keep local rows the remote did not return.
    Merge,
    /// Upsert remote rows and delete synced local rows of the owner that the
    /// remote no longer has.
    ReplaceAll,
}

/// Counts of what [`EntityTable::apply_pulled`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullApplied {
    /// Rows inserted or replaced.
    pub applied: usize,
    /// Rows already present, synced and identical.
    pub unchanged: usize,
    /// Rows not applied because the local copy has unpushed edits.
    pub skipped_local_wins: usize,
    /// Rows not applied because they were deleted locally.
    pub skipped_tombstoned: usize,
    /// Rows not applied because they belong to another owner.
    pub skipped_foreign: usize,
    /// Synced local rows removed because the remote no longer has them.
    pub removed: usize,
}

/// Typed handle on the table of `E` inside a [`LocalStore`].
///
/// Obtained from [`LocalStore::table`]. Handles are cheap to clone and all
/// handles of a store see the same data.
pub struct EntityTable<E> {
    store: LocalStore,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityTable<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for EntityTable<E>
where
    E: Entity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTable").field("table", &E::TABLE).finish()
    }
}

impl<E: Entity> EntityTable<E> {
    pub(crate) fn new(store: LocalStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Returns the store this table belongs to.
    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Inserts or replaces a row, keeping the entity's sync flag.
    ///
    /// Returns the revision of the written row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if the entity has no id, or a
    /// storage error if the journal write fails.
    pub fn upsert(&self, entity: &E) -> CoreResult<u64> {
        check_storable(entity)?;
        let payload = encode_payload(entity)?;
        let op = JournalOp::Put {
            table: E::TABLE.to_owned(),
            id: entity.id().clone(),
            owner_id: entity.owner_id().clone(),
            synced: entity.is_synced(),
            payload,
        };
        let sequence = self.store.write(|_, _| Ok(vec![op]))?;
        sequence.ok_or_else(|| CoreError::invalid_operation("upsert committed nothing"))
    }

    /// Returns the row with `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload cannot be decoded.
    pub fn get(&self, id: &EntityId) -> CoreResult<Option<E>> {
        self.store.read(|state| {
            state
                .row(E::TABLE, id)
                .map(|row| decode_payload(&row.payload, row.synced))
                .transpose()
        })
    }

    /// Returns every row of `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored payload cannot be decoded.
    pub fn snapshot_for_owner(&self, owner: &OwnerId) -> CoreResult<Vec<E>> {
        self.select(|row_owner, _| row_owner == owner)
    }

    /// Returns every unsynced row, across owners.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored payload cannot be decoded.
    pub fn snapshot_unsynced(&self) -> CoreResult<Vec<E>> {
        self.select(|_, synced| !synced)
    }

    /// Returns the unsynced rows of `owner` with their revisions.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored payload cannot be decoded.
    pub fn snapshot_unsynced_for_owner(&self, owner: &OwnerId) -> CoreResult<Vec<PendingRow<E>>> {
        self.store.read(|state| {
            state
                .rows(E::TABLE)
                .filter(|(_, row)| !row.synced && &row.owner_id == owner)
                .map(|(_, row)| {
                    Ok(PendingRow {
                        entity: decode_payload(&row.payload, false)?,
                        revision: row.revision,
                    })
                })
                .collect()
        })
    }

    /// Returns how many rows of `owner` wait to be pushed.
    #[must_use]
    pub fn count_unsynced(&self, owner: &OwnerId) -> usize {
        self.store.read(|state| {
            state
                .rows(E::TABLE)
                .filter(|(_, row)| !row.synced && &row.owner_id == owner)
                .count()
        })
    }

    /// Observes the rows of `owner`.
    #[must_use]
    pub fn get_for_owner(&self, owner: &OwnerId) -> LiveQuery<E> {
        LiveQuery::new(self.clone(), LiveFilter::Owner(owner.clone()))
    }

    /// Observes every unsynced row.
    #[must_use]
    pub fn get_unsynced(&self) -> LiveQuery<E> {
        LiveQuery::new(self.clone(), LiveFilter::Unsynced)
    }

    /// Flags a row as synced. Returns false if the row is absent or was
    /// already synced.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the journal write fails.
    pub fn mark_synced(&self, id: &EntityId) -> CoreResult<bool> {
        let committed = self.store.write(|state, _| {
            Ok(match state.row(E::TABLE, id) {
                Some(row) if !row.synced => vec![self.mark_op(id)],
                _ => Vec::new(),
            })
        })?;
        Ok(committed.is_some())
    }

    /// Flags a row as synced only if it still has `revision`.
    ///
    /// A row rewritten after it was read for a push keeps its unsynced flag
    /// so the newer content is pushed by a later run.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the journal write fails.
    pub fn mark_synced_if_unchanged(&self, id: &EntityId, revision: u64) -> CoreResult<bool> {
        let committed = self.store.write(|state, _| {
            Ok(match state.row(E::TABLE, id) {
                Some(row) if !row.synced && row.revision == revision => vec![self.mark_op(id)],
                _ => Vec::new(),
            })
        })?;
        Ok(committed.is_some())
    }

    /// Removes a row. Returns false if there was nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the journal write fails.
    pub fn delete_by_id(&self, id: &EntityId) -> CoreResult<bool> {
        let committed = self.store.write(|state, _| {
            Ok(if state.row(E::TABLE, id).is_some() {
                vec![self.delete_op(id)]
            } else {
                Vec::new()
            })
        })?;
        Ok(committed.is_some())
    }

    /// Removes a row and records a tombstone for it in the same write.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the journal write fails.
    pub fn delete_with_tombstone(&self, id: &EntityId, owner: &OwnerId) -> CoreResult<()> {
        self.store.write(|state, _| {
            let mut ops = Vec::with_capacity(2);
            if state.row(E::TABLE, id).is_some() {
                ops.push(self.delete_op(id));
            }
            ops.push(JournalOp::Tombstone {
                table: E::TABLE.to_owned(),
                id: id.clone(),
                owner_id: owner.clone(),
            });
            Ok(ops)
        })?;
        Ok(())
    }

    /// Records that `id` was deleted locally but not yet remotely.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the journal write fails.
    pub fn add_tombstone(&self, id: &EntityId, owner: &OwnerId) -> CoreResult<()> {
        self.store.write(|_, _| {
            Ok(vec![JournalOp::Tombstone {
                table: E::TABLE.to_owned(),
                id: id.clone(),
                owner_id: owner.clone(),
            }])
        })?;
        Ok(())
    }

    /// Returns the tombstoned ids of `owner`.
    #[must_use]
    pub fn tombstones_for_owner(&self, owner: &OwnerId) -> Vec<EntityId> {
        self.store.read(|state| {
            state
                .tombstones(E::TABLE)
                .filter(|(_, tomb_owner)| *tomb_owner == owner)
                .map(|(id, _)| id.clone())
                .collect()
        })
    }

    /// Returns whether `id` has a pending remote delete.
    #[must_use]
    pub fn is_tombstoned(&self, id: &EntityId) -> bool {
        self.store.read(|state| state.is_tombstoned(E::TABLE, id))
    }

    /// Forgets a tombstone. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the journal write fails.
    pub fn clear_tombstone(&self, id: &EntityId) -> CoreResult<bool> {
        let committed = self.store.write(|state, _| {
            Ok(if state.is_tombstoned(E::TABLE, id) {
                vec![JournalOp::ClearTombstone {
                    table: E::TABLE.to_owned(),
                    id: id.clone(),
                }]
            } else {
                Vec::new()
            })
        })?;
        Ok(committed.is_some())
    }

    /// Merges rows fetched from the remote for `owner` in one write.
    ///
    /// Rows whose local copy has unpushed edits, rows deleted locally and
    /// rows of other owners are left alone. Applied rows are stored synced.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload cannot be encoded or the journal write
    /// fails; in that case nothing is applied.
    pub fn apply_pulled(&self, owner: &OwnerId, rows: Vec<E>, mode: ApplyMode) -> CoreResult<PullApplied> {
        let mut encoded = Vec::with_capacity(rows.len());
        for row in &rows {
            encoded.push((row.id().clone(), row.owner_id().clone(), encode_payload(row)?));
        }

        let mut counts = PullApplied::default();
        self.store.write(|state, _| {
            counts = PullApplied::default();
            Ok(plan_pull(state, E::TABLE, owner, &encoded, mode, &mut counts))
        })?;
        Ok(counts)
    }

    fn select(&self, keep: impl Fn(&OwnerId, bool) -> bool) -> CoreResult<Vec<E>> {
        self.store.read(|state| {
            state
                .rows(E::TABLE)
                .filter(|(_, row)| keep(&row.owner_id, row.synced))
                .map(|(_, row)| decode_payload(&row.payload, row.synced))
                .collect()
        })
    }

    fn mark_op(&self, id: &EntityId) -> JournalOp {
        JournalOp::MarkSynced {
            table: E::TABLE.to_owned(),
            id: id.clone(),
        }
    }

    fn delete_op(&self, id: &EntityId) -> JournalOp {
        JournalOp::Delete {
            table: E::TABLE.to_owned(),
            id: id.clone(),
        }
    }
}

fn plan_pull(
    state: &StoreState,
    table: &str,
    owner: &OwnerId,
    rows: &[(EntityId, OwnerId, Vec<u8>)],
    mode: ApplyMode,
    counts: &mut PullApplied,
) -> Vec<JournalOp> {
    let mut ops = Vec::new();
    let mut seen = HashSet::with_capacity(rows.len());

    for (id, row_owner, payload) in rows {
        if row_owner != owner {
            counts.skipped_foreign += 1;
            continue;
        }
        seen.insert(id);

        if state.is_tombstoned(table, id) {
            counts.skipped_tombstoned += 1;
            continue;
        }
        match state.row(table, id) {
            Some(local) if !local.synced => {
                counts.skipped_local_wins += 1;
                continue;
            }
            Some(local) if local.payload == *payload => {
                counts.unchanged += 1;
                continue;
            }
            _ => {}
        }

        counts.applied += 1;
        ops.push(JournalOp::Put {
            table: table.to_owned(),
            id: id.clone(),
            owner_id: row_owner.clone(),
            synced: true,
            payload: payload.clone(),
        });
    }

    if mode == ApplyMode::ReplaceAll {
        for (id, row) in state.rows(table) {
            if row.synced && &row.owner_id == owner && !seen.contains(id) {
                counts.removed += 1;
                ops.push(JournalOp::Delete {
                    table: table.to_owned(),
                    id: id.clone(),
                });
            }
        }
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Goal, LocalUser, Wallet};

    fn wallet(id: &str, owner: &str, name: &str, synced: bool) -> Wallet {
        Wallet {
            id: EntityId::from(id),
            owner_id: OwnerId::new(owner),
            name: name.into(),
            balance: 100,
            currency: "EUR".into(),
            color: "#000000".into(),
            icon: None,
            created_at: 1,
            is_synced: synced,
        }
    }

    fn table() -> EntityTable<Wallet> {
        LocalStore::open_in_memory().unwrap().table()
    }

    fn u1() -> OwnerId {
        OwnerId::new("u1")
    }

    #[test]
    fn upsert_requires_an_id() {
        let wallets = table();
        let result = wallets.upsert(&wallet("", "u1", "Cash", false));
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
    }

    #[test]
    fn user_rows_are_keyed_by_their_owner() {
        let users: EntityTable<LocalUser> = LocalStore::open_in_memory().unwrap().table();
        let mut user = LocalUser {
            id: EntityId::from("someone-else"),
            owner_id: u1(),
            email: "u1@example.com".into(),
            display_name: "U1".into(),
            base_currency: "EUR".into(),
            is_synced: false,
        };
        let result = users.upsert(&user);
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
        assert!(users.get(&"someone-else".into()).unwrap().is_none());

        user.id = user.fresh_id();
        assert_eq!(user.id, EntityId::from("u1"));
        users.upsert(&user).unwrap();
        assert!(wallet("w1", "u1", "Cash", false).fresh_id().as_str() != "u1");
    }

    #[test]
    fn get_reflects_stored_flag() {
        let wallets = table();
        wallets.upsert(&wallet("w1", "u1", "Cash", false)).unwrap();
        assert!(!wallets.get(&"w1".into()).unwrap().unwrap().is_synced);

        assert!(wallets.mark_synced(&"w1".into()).unwrap());
        assert!(wallets.get(&"w1".into()).unwrap().unwrap().is_synced);
        assert!(!wallets.mark_synced(&"w1".into()).unwrap());
    }

    #[test]
    fn absent_rows_are_no_ops() {
        let wallets = table();
        assert!(!wallets.mark_synced(&"nope".into()).unwrap());
        assert!(!wallets.delete_by_id(&"nope".into()).unwrap());
        assert_eq!(wallets.store().stats().unwrap().frames, 0);
    }

    #[test]
    fn owner_and_unsynced_snapshots() {
        let wallets = table();
        wallets.upsert(&wallet("w1", "u1", "Cash", false)).unwrap();
        wallets.upsert(&wallet("w2", "u1", "Bank", true)).unwrap();
        wallets.upsert(&wallet("w3", "u2", "Other", false)).unwrap();

        assert_eq!(wallets.snapshot_for_owner(&u1()).unwrap().len(), 2);
        assert_eq!(wallets.snapshot_unsynced().unwrap().len(), 2);
        assert_eq!(wallets.count_unsynced(&u1()), 1);

        let pending = wallets.snapshot_unsynced_for_owner(&u1()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].entity.id, EntityId::from("w1"));
    }

    #[test]
    fn tables_do_not_share_rows() {
        let store = LocalStore::open_in_memory().unwrap();
        store.table::<Wallet>().upsert(&wallet("x", "u1", "Cash", false)).unwrap();
        assert!(store.table::<Goal>().get(&"x".into()).unwrap().is_none());
    }

    #[test]
    fn stale_revision_is_not_marked() {
        let wallets = table();
        let first = wallets.upsert(&wallet("w1", "u1", "Cash", false)).unwrap();
        let second = wallets.upsert(&wallet("w1", "u1", "Cash edited", false)).unwrap();
        assert!(second > first);

        assert!(!wallets.mark_synced_if_unchanged(&"w1".into(), first).unwrap());
        assert_eq!(wallets.count_unsynced(&u1()), 1);

        assert!(wallets.mark_synced_if_unchanged(&"w1".into(), second).unwrap());
        assert_eq!(wallets.count_unsynced(&u1()), 0);
    }

    #[test]
    fn pull_keeps_local_edits() {
        let wallets = table();
        wallets.upsert(&wallet("w1", "u1", "Local edit", false)).unwrap();

        let applied = wallets
            .apply_pulled(
                &u1(),
                vec![wallet("w1", "u1", "Remote", true), wallet("w2", "u1", "New", true)],
                ApplyMode::Merge,
            )
            .unwrap();

        assert_eq!(applied.applied, 1);
        assert_eq!(applied.skipped_local_wins, 1);
        let w1 = wallets.get(&"w1".into()).unwrap().unwrap();
        assert_eq!(w1.name, "Local edit");
        assert!(!w1.is_synced);
        assert!(wallets.get(&"w2".into()).unwrap().unwrap().is_synced);
    }

    #[test]
    fn pull_skips_identical_and_foreign_rows() {
        let wallets = table();
        wallets.upsert(&wallet("w1", "u1", "Cash", true)).unwrap();
        let frames = wallets.store().stats().unwrap().frames;

        let applied = wallets
            .apply_pulled(
                &u1(),
                vec![wallet("w1", "u1", "Cash", true), wallet("w9", "u2", "Foreign", true)],
                ApplyMode::Merge,
            )
            .unwrap();

        assert_eq!(applied.unchanged, 1);
        assert_eq!(applied.skipped_foreign, 1);
        assert_eq!(wallets.store().stats().unwrap().frames, frames);
        assert!(wallets.get(&"w9".into()).unwrap().is_none());
    }

    #[test]
    fn replace_all_removes_only_synced_missing_rows() {
        let wallets = table();
        wallets.upsert(&wallet("gone", "u1", "Gone", true)).unwrap();
        wallets.upsert(&wallet("draft", "u1", "Draft", false)).unwrap();
        wallets.upsert(&wallet("theirs", "u2", "Theirs", true)).unwrap();

        let applied = wallets
            .apply_pulled(&u1(), vec![wallet("kept", "u1", "Kept", true)], ApplyMode::ReplaceAll)
            .unwrap();

        assert_eq!(applied.removed, 1);
        assert!(wallets.get(&"gone".into()).unwrap().is_none());
        assert!(wallets.get(&"draft".into()).unwrap().is_some());
        assert!(wallets.get(&"theirs".into()).unwrap().is_some());
        assert!(wallets.get(&"kept".into()).unwrap().is_some());
    }

    #[test]
    fn tombstones_block_pulled_rows() {
        let wallets = table();
        wallets.upsert(&wallet("w1", "u1", "Cash", true)).unwrap();
        wallets.delete_with_tombstone(&"w1".into(), &u1()).unwrap();

        assert!(wallets.get(&"w1".into()).unwrap().is_none());
        assert!(wallets.is_tombstoned(&"w1".into()));

        let applied = wallets
            .apply_pulled(&u1(), vec![wallet("w1", "u1", "Cash", true)], ApplyMode::Merge)
            .unwrap();
        assert_eq!(applied.skipped_tombstoned, 1);
        assert!(wallets.get(&"w1".into()).unwrap().is_none());

        assert_eq!(wallets.tombstones_for_owner(&u1()), vec![EntityId::from("w1")]);
        assert!(wallets.clear_tombstone(&"w1".into()).unwrap());
        assert!(!wallets.clear_tombstone(&"w1".into()).unwrap());
        assert!(wallets.tombstones_for_owner(&u1()).is_empty());
    }
}

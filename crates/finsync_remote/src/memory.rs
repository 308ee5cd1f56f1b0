//! In-process remote table store.

use crate::error::{RemoteError, RemoteResult};
use crate::gateway::RemoteGateway;
use crate::wire::WireRow;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type Tables = HashMap<String, BTreeMap<String, Value>>;

/// A remote table store kept in memory.
///
/// Rows are kept as JSON objects keyed by table and id, the way the hosted
/// backend stores them, so tests can seed rows the client could never
/// produce. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRemote {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw JSON row. The row must have a string `id` column.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Decode`] if the row has no string `id`.
    pub fn insert_raw(&self, table: &str, row: Value) -> RemoteResult<()> {
        let id = row
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Decode(format!("{table} row without string id")))?
            .to_owned();
        self.tables
            .write()
            .entry(table.to_owned())
            .or_default()
            .insert(id, row);
        Ok(())
    }

    /// Returns the raw row with `id`.
    pub fn raw(&self, table: &str, id: &str) -> Option<Value> {
        self.tables.read().get(table).and_then(|rows| rows.get(id)).cloned()
    }

    /// Returns a typed copy of the row with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Decode`] if the stored row does not decode.
    pub fn get<W: WireRow>(&self, id: &str) -> RemoteResult<Option<W>> {
        self.raw(W::TABLE, id)
            .map(serde_json::from_value)
            .transpose()
            .map_err(RemoteError::from)
    }

    /// Returns the number of rows in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    /// Returns true if `table` has no rows.
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

impl RemoteGateway for MemoryRemote {
    async fn upsert_many<W: WireRow>(&self, rows: &[W]) -> RemoteResult<()> {
        let encoded = rows
            .iter()
            .map(|row| Ok((row.id().to_owned(), serde_json::to_value(row)?)))
            .collect::<RemoteResult<Vec<_>>>()?;

        let mut tables = self.tables.write();
        let table = tables.entry(W::TABLE.to_owned()).or_default();
        for (id, value) in encoded {
            table.insert(id, value);
        }
        Ok(())
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> RemoteResult<()> {
        if let Some(rows) = self.tables.write().get_mut(table) {
            rows.remove(id);
        }
        Ok(())
    }

    async fn select_by_owner<W: WireRow>(&self, owner: &str) -> RemoteResult<Vec<W>> {
        let matching: Vec<Value> = self
            .tables
            .read()
            .get(W::TABLE)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|row| row.get(W::OWNER_COLUMN).and_then(Value::as_str) == Some(owner))
            .cloned()
            .collect();

        matching
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(RemoteError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{UserRow, WalletRow};
    use serde_json::json;

    fn wallet(id: &str, owner: &str) -> WalletRow {
        WalletRow {
            id: id.into(),
            owner_id: owner.into(),
            name: "Cash".into(),
            balance: 10,
            currency: "EUR".into(),
            color_hex: "#fff".into(),
            icon_name: None,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let remote = MemoryRemote::new();
        remote.upsert_many(&[wallet("w1", "u1")]).await.unwrap();

        let mut changed = wallet("w1", "u1");
        changed.balance = 99;
        remote.upsert_many(&[changed.clone()]).await.unwrap();

        assert_eq!(remote.len("wallets"), 1);
        assert_eq!(remote.get::<WalletRow>("w1").unwrap(), Some(changed));
    }

    #[tokio::test]
    async fn select_filters_by_owner_column() {
        let remote = MemoryRemote::new();
        remote
            .upsert_many(&[wallet("w1", "u1"), wallet("w2", "u2")])
            .await
            .unwrap();
        remote
            .insert_raw(
                "users",
                json!({"id": "u1", "email": "a@b.c", "full_name": "A", "currency": "EUR"}),
            )
            .unwrap();

        let rows: Vec<WalletRow> = remote.select_by_owner("u1").await.unwrap();
        assert_eq!(rows, vec![wallet("w1", "u1")]);

        let users: Vec<UserRow> = remote.select_by_owner("u1").await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_row_fails_select() {
        let remote = MemoryRemote::new();
        remote
            .insert_raw("wallets", json!({"id": "w1", "owner_id": "u1"}))
            .unwrap();

        let result: RemoteResult<Vec<WalletRow>> = remote.select_by_owner("u1").await;
        assert!(matches!(result, Err(RemoteError::Decode(_))));
    }

    #[tokio::test]
    async fn delete_of_absent_row_succeeds() {
        let remote = MemoryRemote::new();
        remote.delete_by_id("wallets", "nope").await.unwrap();
        remote.upsert_many(&[wallet("w1", "u1")]).await.unwrap();
        remote.delete_by_id("wallets", "w1").await.unwrap();
        assert!(remote.is_empty("wallets"));
    }

    #[test]
    fn raw_rows_need_an_id() {
        let remote = MemoryRemote::new();
        assert!(remote.insert_raw("wallets", json!({"name": "x"})).is_err());
    }
}

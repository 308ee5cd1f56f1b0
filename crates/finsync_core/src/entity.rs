//! The entity contract shared by every domain record type.

use crate::error::{CoreError, CoreResult};
use crate::id::{EntityId, OwnerId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A domain record kept in the local store and mirrored to a remote table.
///
/// The `is_synced` flag is owned by the store: it is never part of the
/// encoded payload, and [`crate::EntityTable`] sets it from the row metadata
/// whenever an entity is read back.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Local table name. Also used as the remote table name.
    const TABLE: &'static str;

    /// Whether the record id must equal the owner id, as for user profiles
    /// whose remote row is keyed by the user.
    const KEYED_BY_OWNER: bool = false;

    /// Returns the record id.
    fn id(&self) -> &EntityId;

    /// Replaces the record id.
    fn set_id(&mut self, id: EntityId);

    /// Returns the owning user.
    fn owner_id(&self) -> &OwnerId;

    /// Returns the sync flag as last read from the store.
    fn is_synced(&self) -> bool;

    /// Sets the sync flag.
    fn set_synced(&mut self, synced: bool);

    /// Returns the id a new record without one should get.
    fn fresh_id(&self) -> EntityId {
        if Self::KEYED_BY_OWNER {
            EntityId::from(self.owner_id().as_str())
        } else {
            EntityId::new()
        }
    }
}

/// Rejects a record that cannot be stored as it is.
pub(crate) fn check_storable<E: Entity>(entity: &E) -> CoreResult<()> {
    if entity.id().is_unassigned() {
        return Err(CoreError::invalid_operation(format!(
            "cannot store a {} row without an id",
            E::TABLE
        )));
    }
    if E::KEYED_BY_OWNER && entity.id().as_str() != entity.owner_id().as_str() {
        return Err(CoreError::invalid_operation(format!(
            "{} row {} must be keyed by its owner {}",
            E::TABLE,
            entity.id(),
            entity.owner_id()
        )));
    }
    Ok(())
}

/// Encodes an entity payload (without its sync flag) as CBOR.
pub(crate) fn encode_payload<E: Entity>(entity: &E) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(entity, &mut buf)
        .map_err(|e| CoreError::codec(format!("encode {} {}: {}", E::TABLE, entity.id(), e)))?;
    Ok(buf)
}

/// Decodes an entity payload and applies the stored sync flag.
pub(crate) fn decode_payload<E: Entity>(bytes: &[u8], synced: bool) -> CoreResult<E> {
    let mut entity: E = ciborium::from_reader(bytes)
        .map_err(|e| CoreError::codec(format!("decode {}: {}", E::TABLE, e)))?;
    entity.set_synced(synced);
    Ok(entity)
}

/// Implements [`Entity`] for a struct with `id`, `owner_id` and `is_synced`
/// fields.
macro_rules! impl_entity {
    ($ty:ty, $table:literal) => {
        $crate::entity::impl_entity!($ty, $table, false);
    };
    ($ty:ty, $table:literal, $keyed_by_owner:literal) => {
        impl $crate::entity::Entity for $ty {
            const TABLE: &'static str = $table;
            const KEYED_BY_OWNER: bool = $keyed_by_owner;

            fn id(&self) -> &$crate::id::EntityId {
                &self.id
            }

            fn set_id(&mut self, id: $crate::id::EntityId) {
                self.id = id;
            }

            fn owner_id(&self) -> &$crate::id::OwnerId {
                &self.owner_id
            }

            fn is_synced(&self) -> bool {
                self.is_synced
            }

            fn set_synced(&mut self, synced: bool) {
                self.is_synced = synced;
            }
        }
    };
}

pub(crate) use impl_entity;

//! Live queries over an entity table.

use crate::change_feed::ChangeEvent;
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::id::OwnerId;
use crate::table::EntityTable;
use tokio::sync::mpsc::UnboundedReceiver;

/// Which rows a [`LiveQuery`] follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveFilter {
    /// All rows of one owner.
    Owner(OwnerId),
    /// All unsynced rows.
    Unsynced,
}

/// A query whose result is re-read whenever a committed write touches it.
///
/// The query subscribes to the change feed when it is created, so no write
/// committed after [`LiveQuery::current`] can be missed by
/// [`LiveQuery::changed`].
pub struct LiveQuery<E: Entity> {
    table: EntityTable<E>,
    filter: LiveFilter,
    events: UnboundedReceiver<ChangeEvent>,
}

impl<E: Entity> std::fmt::Debug for LiveQuery<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("table", &E::TABLE)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> LiveQuery<E> {
    pub(crate) fn new(table: EntityTable<E>, filter: LiveFilter) -> Self {
        let events = table.store().subscribe();
        Self {
            table,
            filter,
            events,
        }
    }

    /// Returns the filter of this query.
    #[must_use]
    pub fn filter(&self) -> &LiveFilter {
        &self.filter
    }

    /// Reads the current result.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored payload cannot be decoded.
    pub fn current(&self) -> CoreResult<Vec<E>> {
        match &self.filter {
            LiveFilter::Owner(owner) => self.table.snapshot_for_owner(owner),
            LiveFilter::Unsynced => self.table.snapshot_unsynced(),
        }
    }

    /// Waits until a committed write touches the result, then returns the
    /// new result.
    ///
    /// Events that queued up meanwhile are folded into one re-read.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored payload cannot be decoded.
    pub async fn changed(&mut self) -> CoreResult<Vec<E>> {
        loop {
            match self.events.recv().await {
                Some(event) if self.matches(&event) => {
                    self.drain();
                    return self.current();
                }
                Some(_) => {}
                None => return self.current(),
            }
        }
    }

    /// Returns the new result if a relevant write was committed since the
    /// last call, without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored payload cannot be decoded.
    pub fn try_changed(&mut self) -> CoreResult<Option<Vec<E>>> {
        if self.drain() {
            self.current().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Consumes queued events; returns whether any of them matched.
    fn drain(&mut self) -> bool {
        let mut hit = false;
        while let Ok(event) = self.events.try_recv() {
            hit |= self.matches(&event);
        }
        hit
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != E::TABLE {
            return false;
        }
        match &self.filter {
            LiveFilter::Owner(owner) => event.owner_id == *owner,
            // Puts can add an unsynced row; deletes and sync flips can drop one.
            LiveFilter::Unsynced => true,
        }
    }
}

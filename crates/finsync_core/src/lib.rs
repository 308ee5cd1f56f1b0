//! # FinSync Core
//!
//! Local entity store for the FinSync offline-first finance client.
//!
//! This crate provides:
//! - the domain records ([`Wallet`], [`Transaction`], ...) and the
//!   [`Entity`] contract they share
//! - a journaled, crash-safe [`LocalStore`] with one table per record type
//! - per-row sync flags and revisions used by the sync coordinator
//! - [`LiveQuery`] for observing tables as they change
//!
//! ## Example
//!
//! ```rust
//! use finsync_core::{EntityId, LocalStore, OwnerId, Wallet};
//!
//! let store = LocalStore::open_in_memory().unwrap();
//! let wallets = store.table::<Wallet>();
//!
//! wallets
//!     .upsert(&Wallet {
//!         id: EntityId::new(),
//!         owner_id: OwnerId::new("user-1"),
//!         name: "Cash".into(),
//!         balance: 0,
//!         currency: "EUR".into(),
//!         color: "#2e7d32".into(),
//!         icon: None,
//!         created_at: 0,
//!         is_synced: false,
//!     })
//!     .unwrap();
//!
//! assert_eq!(wallets.count_unsynced(&OwnerId::new("user-1")), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod config;
#[cfg(feature = "std")]
mod dir;
mod entity;
mod error;
mod id;
mod journal;
mod live;
mod model;
mod store;
mod table;

pub use change_feed::{ChangeEvent, ChangeFeed, ChangeType};
pub use config::StoreConfig;
#[cfg(feature = "std")]
pub use dir::{StoreDir, JOURNAL_FILE, LOCK_FILE};
pub use entity::Entity;
pub use error::{CoreError, CoreResult};
pub use id::{EntityId, OwnerId};
pub use journal::{
    compute_crc32, FrameRecord, JournalFrame, JournalOp, JournalReader, JOURNAL_MAGIC,
    JOURNAL_VERSION,
};
pub use live::{LiveFilter, LiveQuery};
pub use model::{
    Category, CategoryKind, Goal, Loan, LoanDirection, LoanEntry, LocalUser, PlannedPayment,
    Portfolio, PortfolioInstrument, Recurrence, Transaction, TransactionKind, Wallet, ALL_TABLES,
};
#[cfg(feature = "std")]
pub use store::{compact_dir, CompactionReport};
pub use store::{LocalStore, ReplayStats, StoreStats, TableStats};
pub use table::{ApplyMode, EntityTable, PendingRow, PullApplied};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

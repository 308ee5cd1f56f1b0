//! # FinSync Engine
//!
//! Offline mutation and reconciliation for FinSync.
//!
//! This crate provides:
//! - [`Repository`], the local-first mutation façade used by the UI
//! - [`SyncCoordinator`], the pull-then-push reconciliation of one table
//! - [`ConnectivitySignal`], the observable online/offline flag
//! - [`SyncHub`] and [`FinanceSync`], wiring every table together
//!
//! Writes always land in the local store first. A coordinator run pulls
//! the owner's remote rows (skipping rows with unsynced local edits),
//! then pushes every unsynced row and marks it synced only if it did not
//! change while the push was in flight.
//!
//! ## Example
//!
//! ```rust
//! use finsync_core::{EntityId, LocalStore, OwnerId, Wallet};
//! use finsync_engine::{Connectivity, ConnectivitySignal, FinanceSync, SyncConfig};
//! use finsync_remote::MemoryRemote;
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! runtime.block_on(async {
//!     let remote = MemoryRemote::new();
//!     let sync = FinanceSync::new(
//!         LocalStore::open_in_memory().unwrap(),
//!         remote.clone(),
//!         ConnectivitySignal::new(Connectivity::Available),
//!         &SyncConfig::new().with_auto_sync(false),
//!     );
//!
//!     let owner = OwnerId::new("user-1");
//!     sync.wallets()
//!         .add(Wallet {
//!             id: EntityId::unassigned(),
//!             owner_id: owner.clone(),
//!             name: "Cash".into(),
//!             balance: 0,
//!             currency: "EUR".into(),
//!             color: "#2e7d32".into(),
//!             icon: None,
//!             created_at: 0,
//!             is_synced: false,
//!         })
//!         .unwrap();
//!
//!     sync.wallets().trigger_sync(&owner).await.unwrap();
//!     assert_eq!(sync.wallets().pending_count(&owner), 0);
//!     assert_eq!(remote.len("wallets"), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod coordinator;
mod error;
mod finance;
mod hub;
mod repository;

pub use config::{PullPolicy, SyncConfig};
pub use connectivity::{Connectivity, ConnectivitySignal};
pub use coordinator::{SyncCoordinator, SyncOutcome, SyncRunReport, SyncState, SyncStatus};
pub use error::{RemoteOperation, SyncError, SyncResult};
pub use finance::FinanceSync;
pub use hub::{BoxFuture, SessionHandle, SessionProvider, SyncHub, SyncTarget, TargetRun};
pub use repository::Repository;

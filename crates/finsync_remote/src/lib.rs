//! # FinSync Remote
//!
//! The remote side of FinSync synchronization.
//!
//! This crate provides:
//! - wire rows for every remote table ([`WalletRow`], [`TransactionRow`], ...)
//! - the [`WireEntity`] mapping between local entities and wire rows
//! - the [`RemoteGateway`] trait consumed by the sync engine
//! - [`MemoryRemote`], an in-process table store for tests and demos
//! - [`RestGateway`], a PostgREST client over any [`HttpClient`]
//!
//! ## Example
//!
//! ```rust
//! use finsync_remote::{MemoryRemote, RemoteGateway, WalletRow};
//!
//! # tokio_test_block(async {
//! let remote = MemoryRemote::new();
//! let row = WalletRow {
//!     id: "w1".into(),
//!     owner_id: "user-1".into(),
//!     name: "Cash".into(),
//!     balance: 0,
//!     currency: "EUR".into(),
//!     color_hex: "#2e7d32".into(),
//!     icon_name: None,
//!     created_at: 0,
//! };
//! remote.upsert_many(&[row]).await.unwrap();
//! let rows: Vec<WalletRow> = remote.select_by_owner("user-1").await.unwrap();
//! assert_eq!(rows.len(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod gateway;
mod mapping;
mod memory;
mod rest;
mod wire;

pub use error::{MappingError, RemoteError, RemoteResult};
pub use gateway::RemoteGateway;
pub use mapping::WireEntity;
pub use memory::MemoryRemote;
pub use rest::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RestConfig, RestGateway};
pub use wire::{
    CategoryRow, GoalRow, LoanEntryRow, LoanRow, PlannedPaymentRow, PortfolioInstrumentRow,
    PortfolioRow, TransactionRow, UserRow, WalletRow, WireRow,
};

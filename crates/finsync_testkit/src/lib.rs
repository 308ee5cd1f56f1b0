//! # FinSync Testkit
//!
//! Test utilities for FinSync.
//!
//! This crate provides:
//! - Store fixtures that clean up after themselves
//! - Sample records for every entity type
//! - [`ScriptedRemote`], a gateway with failure injection, call recording,
//!   latency and a concurrency counter
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use finsync_testkit::prelude::*;
//! use finsync_core::{OwnerId, Wallet};
//!
//! with_temp_store(|store| {
//!     store.table::<Wallet>().upsert(&wallet("u1", "Cash")).unwrap();
//!     assert_eq!(store.table::<Wallet>().count_unsynced(&OwnerId::new("u1")), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod remote;
pub mod samples;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::remote::*;
    pub use crate::samples::*;
}

pub use fixtures::*;
pub use generators::*;
pub use remote::*;
pub use samples::*;

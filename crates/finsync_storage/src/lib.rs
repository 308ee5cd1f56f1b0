//! # FinSync Storage
//!
//! Byte-store backends underneath the FinSync local entity journal.
//!
//! Backends are **opaque append-only byte stores**. They know nothing about
//! journal frames, entities or sync flags; `finsync_core` owns every byte
//! format written through them.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral stores and unit tests
//! - [`FileBackend`] - on-device persistence through OS file APIs
//! - [`FaultyBackend`] - wrapper that injects I/O failures for tests of
//!   storage-failure propagation
//!
//! ## Example
//!
//! ```rust
//! use finsync_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod faulty;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use faulty::{FaultHandle, FaultyBackend};
pub use file::{replace_file_atomically, FileBackend};
pub use memory::InMemoryBackend;

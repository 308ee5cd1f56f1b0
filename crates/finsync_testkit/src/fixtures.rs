//! Test fixtures and store helpers.
//!
//! Provides in-memory and on-disk stores that clean up after themselves.

use finsync_core::{LocalStore, StoreConfig};
use finsync_storage::{FaultHandle, FaultyBackend, InMemoryBackend};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: LocalStore,
    /// Journal buffer of an in-memory store.
    journal: Option<InMemoryBackend>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an in-memory store whose journal bytes stay inspectable.
    pub fn memory() -> Self {
        let backend = InMemoryBackend::new();
        let store = LocalStore::open_with_backend(StoreConfig::default(), Box::new(backend.clone()))
            .expect("Failed to open in-memory store");
        Self {
            store,
            journal: Some(backend),
            temp_dir: None,
        }
    }

    /// Creates an in-memory store whose journal writes fail while the
    /// returned switch is on.
    pub fn faulty() -> (Self, FaultHandle) {
        let backend = InMemoryBackend::new();
        let (faulty, faults) = FaultyBackend::new(backend.clone());
        let store = LocalStore::open_with_backend(StoreConfig::default(), Box::new(faulty))
            .expect("Failed to open faulty store");
        let test_store = Self {
            store,
            journal: Some(backend),
            temp_dir: None,
        };
        (test_store, faults)
    }

    /// Creates a store in a fresh temporary directory.
    pub fn dir() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = LocalStore::open_dir(temp_dir.path(), StoreConfig::default())
            .expect("Failed to open directory store");
        Self {
            store,
            journal: None,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if on disk.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns the raw journal bytes of an in-memory store.
    pub fn journal_bytes(&self) -> Option<Vec<u8>> {
        self.journal.as_ref().map(InMemoryBackend::data)
    }

    /// Reopens the store from its persisted journal, as after a restart.
    ///
    /// The current handle is dropped first so the directory lock is free.
    pub fn reopen(self) -> Self {
        let Self {
            store,
            journal,
            temp_dir,
        } = self;
        drop(store);

        let store = match (&journal, &temp_dir) {
            (Some(backend), _) => LocalStore::open_with_backend(
                StoreConfig::default(),
                Box::new(InMemoryBackend::with_data(backend.data())),
            ),
            (None, Some(dir)) => LocalStore::open_dir(dir.path(), StoreConfig::default()),
            (None, None) => unreachable!("a test store is either in memory or on disk"),
        }
        .expect("Failed to reopen store");

        Self {
            store,
            journal,
            temp_dir,
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = LocalStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&LocalStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a store in a temporary directory.
pub fn with_dir_store<F, R>(f: F) -> R
where
    F: FnOnce(&LocalStore, &Path) -> R,
{
    let test_store = TestStore::dir();
    let path: PathBuf = test_store
        .path()
        .expect("Directory store should have a path")
        .to_path_buf();
    f(&test_store.store, &path)
}

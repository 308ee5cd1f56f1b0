//! Fault-injecting backend wrapper.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Switch controlling a [`FaultyBackend`] from outside the store.
#[derive(Debug, Clone, Default)]
pub struct FaultHandle {
    fail_writes: Arc<AtomicBool>,
}

impl FaultHandle {
    /// Makes every following append and flush fail (`true`) or succeed.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.fail_writes.load(Ordering::SeqCst)
    }
}

/// Wraps a backend and fails writes on demand, simulating a full disk.
#[derive(Debug)]
pub struct FaultyBackend<B> {
    inner: B,
    handle: FaultHandle,
}

impl<B: StorageBackend> FaultyBackend<B> {
    /// Wraps `inner`; returns the backend and its fault switch.
    pub fn new(inner: B) -> (Self, FaultHandle) {
        let handle = FaultHandle::default();
        (
            Self {
                inner,
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl<B: StorageBackend> StorageBackend for FaultyBackend<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self.handle.failing() {
            return Err(StorageError::Injected("no space left on device".into()));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.handle.failing() {
            return Err(StorageError::Injected("flush failed".into()));
        }
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }
}

//! The derived platform config shared between subscriptions.
//!
//! There is exactly one [`SnapshotWriter`], owned by the config subscription.
//! Readers only ever observe a complete [`PlatformConfig`] or nothing:
//! every update swaps an immutable `Arc` under the lock.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::platform::PlatformConfig;

type Slot = Arc<RwLock<Option<Arc<PlatformConfig>>>>;

/// Exclusive write handle to the current snapshot.
#[derive(Debug, Default)]
pub struct SnapshotWriter {
    slot: Slot,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a read-only handle observing this writer.
    pub fn as_reader(&self) -> SnapshotReader {
        SnapshotReader {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Replaces the current snapshot.
    pub fn store(&self, config: PlatformConfig) {
        *self.slot.write() = Some(Arc::new(config));
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn load(&self) -> Option<Arc<PlatformConfig>> {
        self.slot.read().clone()
    }
}

/// Read-only handle to a snapshot maintained by a [`SnapshotWriter`].
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    slot: Slot,
}

impl SnapshotReader {
    pub fn load(&self) -> Option<Arc<PlatformConfig>> {
        self.slot.read().clone()
    }
}

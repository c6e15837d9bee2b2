//! Thread-safe world handle.
//!
//! Every operation takes the single lock for its whole duration, so tile
//! edits, eviction and saving never interleave.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::world::{EvictionReport, LoadReport, SaveReport, World, WorldResult};

/// Cloneable, lock-protected world shared between threads.
#[derive(Debug, Clone)]
pub struct SharedWorld {
    inner: Arc<Mutex<World>>,
}

impl SharedWorld {
    /// Wraps a world.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    /// Locks the world.
    pub fn lock(&self) -> MutexGuard<'_, World> {
        self.inner.lock()
    }

    /// Locks the world, giving up after `timeout`.
    pub fn try_lock_for(&self, timeout: Duration) -> Option<MutexGuard<'_, World>> {
        self.inner.try_lock_for(timeout)
    }

    /// Runs `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Loads the chunks around a viewpoint.
    pub fn ensure_loaded(&self, x: f64, y: f64) -> LoadReport {
        self.lock().ensure_loaded(x, y)
    }

    /// Evicts chunks far from a viewpoint.
    pub fn evict_far(&self, x: f64, y: f64) -> EvictionReport {
        self.lock().evict_far(x, y)
    }

    /// Saves every dirty chunk.
    pub fn save_all(&self) -> WorldResult<SaveReport> {
        self.lock().save_all()
    }

    /// Number of handles to this world.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Unwraps the world if this is the last handle.
    pub fn try_into_inner(self) -> Result<World, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

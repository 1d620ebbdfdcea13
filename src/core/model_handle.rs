//! Shared model parameters: one writer, many readers.
//!
//! The orchestrator publishes parameter updates after each training step;
//! every agent reads the handle on every tick to compute an action. Readers
//! never consume the model, they act on whatever snapshot the read lock
//! hands them, so an agent may play one tick against parameters published
//! just before or just after an update (eventual consistency is the
//! contract, not transactional reads).

use crate::model::{Model, Observation};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Cross-thread reference to the current model parameters.
pub struct ModelHandle {
    model: RwLock<Box<dyn Model>>,
    /// Bumped on every published update.
    version: AtomicU64,
    /// Counter for total updates published.
    published_count: AtomicUsize,
}

impl ModelHandle {
    /// Wrap a model in a handle.
    pub fn new(model: Box<dyn Model>) -> Self {
        Self {
            model: RwLock::new(model),
            version: AtomicU64::new(0),
            published_count: AtomicUsize::new(0),
        }
    }

    /// Compute an action from the current parameter snapshot (read lock).
    pub fn predict(&self, observation: &Observation) -> Vec<f32> {
        self.model.read().predict(observation)
    }

    /// Run a read-only closure against the model.
    pub fn read<R>(&self, f: impl FnOnce(&dyn Model) -> R) -> R {
        f(self.model.read().as_ref())
    }

    /// Mutate the model under the write lock and publish the result.
    ///
    /// Only the orchestrator's trainer calls this; the version is bumped
    /// after the closure returns so readers can detect staleness.
    pub fn update<R>(&self, f: impl FnOnce(&mut dyn Model) -> R) -> R {
        let result = {
            let mut guard = self.model.write();
            f(guard.as_mut())
        };
        self.version.fetch_add(1, Ordering::Release);
        self.published_count.fetch_add(1, Ordering::Relaxed);
        result
    }

    /// Current parameter version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Total updates published.
    pub fn published(&self) -> usize {
        self.published_count.load(Ordering::Relaxed)
    }
}

/// Thread-safe shared model handle.
pub type SharedModelHandle = Arc<ModelHandle>;

/// Create a new shared model handle.
pub fn model_handle(model: Box<dyn Model>) -> SharedModelHandle {
    Arc::new(ModelHandle::new(model))
}

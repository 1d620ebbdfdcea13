//! Shared bounded replay store for experience tuples.
//!
//! Many agent workers append concurrently; one training loop samples.
//! Storage is a fixed-capacity ring: once full, each new append overwrites
//! the oldest record, so the store always holds the most recent `capacity`
//! records.
//!
//! # Data Flow
//!
//! ```text
//! Agent 0 ─┐
//! Agent 1 ─┼──> append (shape-checked, ring write) ──> RingStorage
//! Agent N ─┘                                               │
//!                                                          v
//!                                                      Orchestrator
//!                                                      (sampling)
//! ```
//!
//! Appends take a brief write lock and are immediately visible to `len()`;
//! sampling takes a read lock and observes a consistent snapshot of the ring
//! at the moment of the call.

use crate::core::shape::{numel, ExperienceTuple, Field, SampleBatch, ShapeDict, Tensor};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Errors raised by the replay store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// An appended record's field shape disagrees with the declared dictionary.
    /// Fatal for the call; the record is rejected.
    ShapeMismatch {
        field: Field,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// More records were requested than the store currently holds.
    InsufficientData { requested: usize, available: usize },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::ShapeMismatch {
                field,
                expected,
                got,
            } => write!(
                f,
                "shape mismatch for field '{}': declared {:?}, got {:?}",
                field, expected, got
            ),
            StoreError::InsufficientData {
                requested,
                available,
            } => write!(
                f,
                "requested batch of {} but only {} records available",
                requested, available
            ),
        }
    }
}

impl std::error::Error for StoreError {}

/// Ring buffer storage for consolidated records.
struct RingStorage<T> {
    data: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingStorage<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, item: T) {
        let capacity = self.data.len();
        let idx = (self.head + self.len) % capacity;
        self.data[idx] = Some(item);
        if self.len < capacity {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % capacity;
        }
    }

    fn get(&self, idx: usize) -> Option<&T> {
        if idx >= self.len {
            return None;
        }
        let actual_idx = (self.head + idx) % self.data.len();
        self.data[actual_idx].as_ref()
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Bounded multi-field replay store shared between agents and the trainer.
///
/// Created once by the orchestrator before any agent receives its handles,
/// and dropped when the orchestrator exits. Not persisted across runs.
pub struct SharedReplayStore {
    shapes: ShapeDict,
    storage: RwLock<RingStorage<ExperienceTuple>>,
    /// Logical size mirror for lock-free queries (saturates at capacity).
    size: AtomicUsize,
    capacity: usize,
}

impl SharedReplayStore {
    /// Create a store with the given capacity and declared field shapes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, shapes: ShapeDict) -> Self {
        assert!(capacity > 0, "replay store capacity must be > 0");
        Self {
            shapes,
            storage: RwLock::new(RingStorage::new(capacity)),
            size: AtomicUsize::new(0),
            capacity,
        }
    }

    /// The declared shape dictionary.
    pub fn shapes(&self) -> &ShapeDict {
        &self.shapes
    }

    /// Append one record (safe under concurrent callers).
    ///
    /// Field shapes are validated against the declared dictionary before the
    /// write; a mismatch rejects the record without touching the ring. Once
    /// the store is full, the oldest record is overwritten.
    pub fn append(&self, record: ExperienceTuple) -> Result<(), StoreError> {
        self.validate(&record)?;
        let mut guard = self.storage.write();
        guard.push(record);
        self.size.store(guard.len(), Ordering::Release);
        Ok(())
    }

    /// Number of valid records currently held (saturates at capacity).
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fill level as a fraction (0.0 to 1.0).
    pub fn utilization(&self) -> f32 {
        self.len() as f32 / self.capacity as f32
    }

    /// Sample a mini-batch of `batch_size` records.
    ///
    /// Indices are drawn uniformly at random **with replacement** over the
    /// valid range. Returns one stacked tensor per declared field, each of
    /// shape `[batch_size, *field_shape]`.
    pub fn sample(&self, batch_size: usize) -> Result<SampleBatch, StoreError> {
        let guard = self.storage.read();
        let len = guard.len();
        if batch_size > len {
            return Err(StoreError::InsufficientData {
                requested: batch_size,
                available: len,
            });
        }

        let mut rng = fastrand::Rng::new();
        let indices: Vec<usize> = (0..batch_size).map(|_| rng.usize(0..len)).collect();

        let mut fields = HashMap::with_capacity(Field::ALL.len());
        for field in Field::ALL {
            let field_shape = self.shapes.shape(field);
            let mut data = Vec::with_capacity(batch_size * numel(field_shape));
            for &idx in &indices {
                // Index is < len under the same read guard, so the slot is filled.
                if let Some(record) = guard.get(idx) {
                    record.copy_field(field, &mut data);
                }
            }
            let mut shape = Vec::with_capacity(field_shape.len() + 1);
            shape.push(batch_size);
            shape.extend_from_slice(field_shape);
            fields.insert(field, Tensor::from_vec(shape, data));
        }

        Ok(SampleBatch::new(batch_size, fields))
    }

    fn validate(&self, record: &ExperienceTuple) -> Result<(), StoreError> {
        for field in Field::ALL {
            let expected = self.shapes.shape(field);
            let got = record.shape_of(field);
            if got != expected {
                return Err(StoreError::ShapeMismatch {
                    field,
                    expected: expected.to_vec(),
                    got: got.to_vec(),
                });
            }
        }
        Ok(())
    }
}

/// Thread-safe shared replay store handle.
pub type SharedStoreHandle = Arc<SharedReplayStore>;

/// Create a new shared replay store.
pub fn shared_store(capacity: usize, shapes: ShapeDict) -> SharedStoreHandle {
    Arc::new(SharedReplayStore::new(capacity, shapes))
}

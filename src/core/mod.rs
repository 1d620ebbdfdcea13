//! Core types for the swarm training pipeline.

pub mod model_handle;
pub mod replay_store;
pub mod shape;

pub use model_handle::{model_handle, ModelHandle, SharedModelHandle};
pub use replay_store::{shared_store, SharedReplayStore, SharedStoreHandle, StoreError};
pub use shape::{ExperienceTuple, Field, SampleBatch, ShapeDict, Tensor};

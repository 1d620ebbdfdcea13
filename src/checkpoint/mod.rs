//! Model checkpointing.
//!
//! Resolves root-relative checkpoint paths and drives the model
//! capability's own save/load hooks around a training run.

pub mod checkpointer;

pub use checkpointer::{resolve_model_path, CheckpointError, Checkpointer, CheckpointerConfig};

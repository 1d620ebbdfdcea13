//! The model capability boundary.
//!
//! The trainer and agents call into a model but never define one: the
//! network architecture, its forward/backward pass, and its on-disk format
//! all live behind the [`Model`] trait. The core only needs prediction, a
//! single opaque training step, save/load hooks, and the declared
//! input/output shapes used to build the store's shape dictionary.

use crate::core::shape::{SampleBatch, Tensor};
use std::io;
use std::path::Path;

/// One tick's observation as produced by the game-side formatter.
#[derive(Clone, Debug)]
pub struct Observation {
    /// Spatial game observation.
    pub spatial: Tensor,
    /// Non-spatial feature vector.
    pub extra: Tensor,
    /// Validity mask over action dimensions; defaults to all-ones downstream.
    pub mask: Option<Vec<f32>>,
    /// Reference/expert action for this tick, if the formatter supplies one.
    pub teacher_action: Option<Vec<f32>>,
}

impl Observation {
    /// Observation with no mask or teacher action.
    pub fn new(spatial: Tensor, extra: Tensor) -> Self {
        Self {
            spatial,
            extra,
            mask: None,
            teacher_action: None,
        }
    }

    /// Attach a validity mask.
    pub fn with_mask(mut self, mask: Vec<f32>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Attach a teacher action.
    pub fn with_teacher_action(mut self, teacher_action: Vec<f32>) -> Self {
        self.teacher_action = Some(teacher_action);
        self
    }
}

/// A model-level failure during one optimization step.
///
/// Reported by the trainer, which skips the step and retries once before
/// escalating to a clean shutdown.
#[derive(Debug, Clone)]
pub struct TrainingStepError {
    message: String,
}

impl TrainingStepError {
    /// Create an error with a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TrainingStepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "training step failed: {}", self.message)
    }
}

impl std::error::Error for TrainingStepError {}

/// Error type for model save/load.
#[derive(Debug)]
pub enum ModelIoError {
    /// IO error during save/load.
    Io(io::Error),
    /// Model-format error (corrupt or incompatible checkpoint).
    Format(String),
}

impl std::fmt::Display for ModelIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelIoError::Io(e) => write!(f, "IO error: {}", e),
            ModelIoError::Format(e) => write!(f, "format error: {}", e),
        }
    }
}

impl std::error::Error for ModelIoError {}

impl From<io::Error> for ModelIoError {
    fn from(e: io::Error) -> Self {
        ModelIoError::Io(e)
    }
}

/// The external model capability.
///
/// One writer (the orchestrator, via [`crate::core::ModelHandle::update`])
/// and many readers (agents calling `predict` every tick).
pub trait Model: Send + Sync {
    /// Compute an action vector for an observation.
    fn predict(&self, observation: &Observation) -> Vec<f32>;

    /// Apply one optimization step to the parameters.
    fn train_step(&mut self, batch: &SampleBatch) -> Result<(), TrainingStepError>;

    /// Persist the parameters to `path`.
    fn save(&self, path: &Path) -> Result<(), ModelIoError>;

    /// Load parameters from `path`.
    fn load(&mut self, path: &Path) -> Result<(), ModelIoError>;

    /// Declared input shapes: `(spatial_shape, extra_shape)`.
    fn input_state_dimension(&self) -> (Vec<usize>, Vec<usize>);

    /// Declared action shape.
    fn output_dimension(&self) -> Vec<usize>;
}

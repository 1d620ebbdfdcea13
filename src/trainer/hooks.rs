//! The capability set a concrete trainer supplies.
//!
//! The orchestrator depends only on this trait: it never knows what the
//! optimization step does, only that initialization happens before the loop,
//! one step consumes one sampled batch, and finish runs exactly once on the
//! shutdown path. A trainer missing one of the hooks simply does not
//! implement the trait, so the absence is caught at compile time rather
//! than on first use.

use crate::checkpoint::CheckpointError;
use crate::core::shape::SampleBatch;
use crate::messages::RunOptions;
use crate::model::TrainingStepError;

/// Error type for trainer lifecycle hooks (initialize/finish).
#[derive(Debug)]
pub enum HookError {
    /// Checkpoint save/load failure.
    Checkpoint(CheckpointError),
    /// Trainer-specific failure.
    Other(String),
}

impl std::fmt::Display for HookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookError::Checkpoint(e) => write!(f, "checkpoint error: {}", e),
            HookError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for HookError {}

impl From<CheckpointError> for HookError {
    fn from(e: CheckpointError) -> Self {
        HookError::Checkpoint(e)
    }
}

/// Hooks the orchestrator drives through its state machine.
pub trait TrainerHooks: Send {
    /// Called once before the wait loop, with the run's checkpoint options
    /// (last-wins across drained registrations).
    fn initialize_training(&mut self, options: &RunOptions) -> Result<(), HookError>;

    /// Apply one optimization step to one sampled batch.
    ///
    /// A failure is reported and retried once by the orchestrator; an
    /// immediate second failure escalates to a clean shutdown.
    fn train_step(&mut self, batch: SampleBatch) -> Result<(), TrainingStepError>;

    /// Called exactly once on the shutdown path. `save_model` is false only
    /// when persistence was explicitly disabled in the orchestrator config.
    fn finish_training(&mut self, save_model: bool) -> Result<(), HookError>;
}

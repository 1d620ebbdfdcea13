//! The training side of the pipeline.
//!
//! - `hooks`: the lifecycle callback trait driven by the orchestrator.
//! - `model_trainer`: default hooks wiring the shared model to checkpoints.
//! - `orchestrator`: the state machine owning the run.

pub mod hooks;
pub mod model_trainer;
pub mod orchestrator;

pub use hooks::{HookError, TrainerHooks};
pub use model_trainer::ModelTrainer;
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, OrchestratorHandle, StateCell, TrainerState,
};

#[cfg(test)]
mod tests;

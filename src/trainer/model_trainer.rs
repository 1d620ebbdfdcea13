//! Default trainer hooks over the shared model handle.
//!
//! Wires the model capability's own training contract and the checkpointer
//! into the orchestrator's lifecycle: load an existing checkpoint on
//! initialize when requested, push each sampled batch through
//! `Model::train_step` under the handle's write lock (publishing a new
//! parameter version per step), and persist on finish.

use crate::checkpoint::{CheckpointError, Checkpointer, CheckpointerConfig};
use crate::core::shape::SampleBatch;
use crate::core::SharedModelHandle;
use crate::messages::RunOptions;
use crate::model::TrainingStepError;
use crate::trainer::hooks::{HookError, TrainerHooks};
use std::path::PathBuf;

/// Fallback checkpoint path when no registration supplied one.
const DEFAULT_MODEL_PATH: &str = "model.ckpt";

/// Trainer hooks that train the shared model in place and checkpoint it
/// at a repo-root-relative path.
pub struct ModelTrainer {
    model: SharedModelHandle,
    repo_root: PathBuf,
    checkpointer: Option<Checkpointer>,
}

impl ModelTrainer {
    /// Create hooks for a shared model and a repository root.
    pub fn new(model: SharedModelHandle, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            model,
            repo_root: repo_root.into(),
            checkpointer: None,
        }
    }

    /// The shared model being trained.
    pub fn model(&self) -> &SharedModelHandle {
        &self.model
    }
}

impl TrainerHooks for ModelTrainer {
    fn initialize_training(&mut self, options: &RunOptions) -> Result<(), HookError> {
        let relative = options
            .model_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
        let checkpointer =
            Checkpointer::new(CheckpointerConfig::new(&self.repo_root, relative))?;

        if options.load_model {
            match checkpointer.load(&self.model) {
                Ok(()) => {
                    log::info!("loaded checkpoint {:?}", checkpointer.resolved_path())
                }
                Err(CheckpointError::NoCheckpoint(path)) => {
                    log::warn!("no checkpoint at {:?}, starting fresh", path)
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.checkpointer = Some(checkpointer);
        Ok(())
    }

    fn train_step(&mut self, batch: SampleBatch) -> Result<(), TrainingStepError> {
        self.model.update(|m| m.train_step(&batch))
    }

    fn finish_training(&mut self, save_model: bool) -> Result<(), HookError> {
        if !save_model {
            return Ok(());
        }
        match &self.checkpointer {
            Some(checkpointer) => {
                let path = checkpointer.save(&self.model)?;
                log::info!("model saved to {:?}", path);
                Ok(())
            }
            None => Err(HookError::Other(
                "finish_training before initialize_training".to_string(),
            )),
        }
    }
}

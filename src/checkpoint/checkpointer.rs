//! Model checkpointing around the training run.
//!
//! The core owns only the path discipline: checkpoint locations are given
//! relative to a configured repository root, and the on-disk format belongs
//! entirely to the model capability's own `save`/`load`.

use crate::core::ModelHandle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Configuration for the checkpointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointerConfig {
    /// Repository root all checkpoint paths are resolved against.
    pub repo_root: PathBuf,
    /// Checkpoint path relative to the repository root.
    pub model_path: PathBuf,
}

impl CheckpointerConfig {
    /// Create a config for a root and relative model path.
    pub fn new(repo_root: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            model_path: model_path.into(),
        }
    }
}

/// Error type for checkpointing operations.
#[derive(Debug)]
pub enum CheckpointError {
    /// IO error during save/load.
    Io(io::Error),
    /// Model-capability error while reading or writing parameters.
    Model(String),
    /// Load requested but no checkpoint exists at the resolved path.
    NoCheckpoint(PathBuf),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::Model(e) => write!(f, "model error: {}", e),
            CheckpointError::NoCheckpoint(p) => write!(f, "no checkpoint at {:?}", p),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Saves and loads the shared model at a root-relative path.
pub struct Checkpointer {
    config: CheckpointerConfig,
}

impl Checkpointer {
    /// Create a new checkpointer.
    ///
    /// Creates the directory holding the checkpoint if it doesn't exist.
    pub fn new(config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        let resolved = config.repo_root.join(&config.model_path);
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    /// The absolute path the checkpoint resolves to.
    pub fn resolved_path(&self) -> PathBuf {
        self.config.repo_root.join(&self.config.model_path)
    }

    /// Whether a checkpoint file exists at the resolved path.
    pub fn exists(&self) -> bool {
        self.resolved_path().exists()
    }

    /// Persist the current shared parameters.
    pub fn save(&self, model: &ModelHandle) -> Result<PathBuf, CheckpointError> {
        let path = self.resolved_path();
        model
            .read(|m| m.save(&path))
            .map_err(|e| CheckpointError::Model(e.to_string()))?;
        Ok(path)
    }

    /// Load parameters into the shared model, publishing the new version.
    pub fn load(&self, model: &ModelHandle) -> Result<(), CheckpointError> {
        let path = self.resolved_path();
        if !path.exists() {
            return Err(CheckpointError::NoCheckpoint(path));
        }
        model
            .update(|m| m.load(&path))
            .map_err(|e| CheckpointError::Model(e.to_string()))
    }
}

/// Resolve a root-relative checkpoint path without building a checkpointer.
pub fn resolve_model_path(repo_root: &Path, model_path: &Path) -> PathBuf {
    repo_root.join(model_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model_handle;
    use crate::core::shape::SampleBatch;
    use crate::model::{Model, ModelIoError, Observation, TrainingStepError};
    use tempfile::tempdir;

    /// Persists a single weight as a decimal string.
    struct FileModel {
        weight: f32,
    }

    impl Model for FileModel {
        fn predict(&self, _observation: &Observation) -> Vec<f32> {
            vec![self.weight]
        }
        fn train_step(&mut self, _batch: &SampleBatch) -> Result<(), TrainingStepError> {
            Ok(())
        }
        fn save(&self, path: &Path) -> Result<(), ModelIoError> {
            fs::write(path, self.weight.to_string())?;
            Ok(())
        }
        fn load(&mut self, path: &Path) -> Result<(), ModelIoError> {
            let text = fs::read_to_string(path)?;
            self.weight = text
                .trim()
                .parse()
                .map_err(|e| ModelIoError::Format(format!("bad weight: {}", e)))?;
            Ok(())
        }
        fn input_state_dimension(&self) -> (Vec<usize>, Vec<usize>) {
            (vec![1], vec![1])
        }
        fn output_dimension(&self) -> Vec<usize> {
            vec![1]
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let checkpointer =
            Checkpointer::new(CheckpointerConfig::new(dir.path(), "models/bot.ckpt")).unwrap();

        let writer = model_handle(Box::new(FileModel { weight: 4.25 }));
        let saved = checkpointer.save(&writer).unwrap();
        assert!(saved.exists());

        let reader = model_handle(Box::new(FileModel { weight: 0.0 }));
        checkpointer.load(&reader).unwrap();
        assert_eq!(
            reader.predict(&Observation::new(
                crate::core::Tensor::zeros(&[1]),
                crate::core::Tensor::zeros(&[1])
            )),
            vec![4.25]
        );
        // Loading published a new parameter version.
        assert_eq!(reader.version(), 1);
    }

    #[test]
    fn test_load_missing_checkpoint_fails() {
        let dir = tempdir().unwrap();
        let checkpointer =
            Checkpointer::new(CheckpointerConfig::new(dir.path(), "missing.ckpt")).unwrap();
        let model = model_handle(Box::new(FileModel { weight: 1.0 }));

        let err = checkpointer.load(&model).unwrap_err();
        assert!(matches!(err, CheckpointError::NoCheckpoint(_)));
    }

    #[test]
    fn test_resolve_model_path() {
        assert_eq!(
            resolve_model_path(Path::new("/repo"), Path::new("models/bot.ckpt")),
            PathBuf::from("/repo/models/bot.ckpt")
        );
    }

    #[test]
    fn test_parent_directories_created() {
        let dir = tempdir().unwrap();
        let nested = CheckpointerConfig::new(dir.path(), "deeply/nested/bot.ckpt");
        let checkpointer = Checkpointer::new(nested).unwrap();
        assert!(checkpointer.resolved_path().parent().unwrap().exists());
        assert!(!checkpointer.exists());
    }
}

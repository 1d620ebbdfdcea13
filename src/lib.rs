//! # Swarm Trainer: Shared-Memory Training for Game-Playing Agents
//!
//! Coordinates a swarm of game-playing agents that feed one shared replay
//! store while a single orchestrator trains the shared model.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Swarm Training Run                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Thread 1          Thread 2          Thread N                   │
//! │  ┌─────────┐       ┌─────────┐       ┌─────────┐               │
//! │  │Emitter 0│       │Emitter 1│       │Emitter N│               │
//! │  │ observe │       │ observe │       │ observe │               │
//! │  │ predict │       │ predict │       │ predict │               │
//! │  │ clamp   │       │ clamp   │       │ clamp   │               │
//! │  └────┬────┘       └────┬────┘       └────┬────┘               │
//! │       │                 │                 │                     │
//! │       └─────────────────┼─────────────────┘                     │
//! │                         ▼                                       │
//! │               ┌──────────────────┐     ┌───────────────┐       │
//! │               │ SharedReplayStore│     │  ModelHandle  │       │
//! │               │ (bounded ring)   │     │ (versioned)   │       │
//! │               └────────┬─────────┘     └───────┬───────┘       │
//! │                        ▼                       │                │
//! │               ┌──────────────────┐             │                │
//! │               │   Orchestrator   │◄────────────┘                │
//! │               │ wait→train→save  │                              │
//! │               └──────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Agents register over a channel before the run; the orchestrator drains
//! the queue once at startup and hands each agent a [`Handshake`] with the
//! store and model handles. Training starts only after the store reaches
//! its fill threshold and stops cleanly on the external stop signal.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use swarm_trainer::{
//!     model_handle, Emitter, ModelTrainer, Orchestrator, OrchestratorConfig,
//! };
//!
//! let model = model_handle(Box::new(my_model));
//! let config = OrchestratorConfig::new()
//!     .with_memory_size(100_000)
//!     .with_batch_size(500)
//!     .with_fill_threshold(20_000);
//!
//! let (reg_tx, reg_rx) = crossbeam_channel::unbounded();
//! let orchestrator = Orchestrator::new(config, model.clone(), reg_rx, stop);
//! let hooks = ModelTrainer::new(model, repo_root);
//! let handle = orchestrator.spawn(Box::new(hooks));
//! ```

pub mod agents;
pub mod checkpoint;
pub mod core;
pub mod messages;
pub mod model;
pub mod trainer;

// Re-export commonly used types
pub use crate::core::model_handle::{model_handle, ModelHandle, SharedModelHandle};
pub use crate::core::replay_store::{shared_store, SharedReplayStore, SharedStoreHandle, StoreError};
pub use crate::core::shape::{ExperienceTuple, Field, SampleBatch, ShapeDict, Tensor};

pub use model::{Model, ModelIoError, Observation, TrainingStepError};

// Message types for agent/orchestrator communication
pub use messages::{
    deliver_handshakes, AgentRegistration, DeliveryReport, EmitterMsg, EmitterStats, Handshake,
    RegistrationDeliveryError, RunOptions,
};

pub use agents::emitter::{ControlSurface, Emitter, EmitterConfig, EmitterHandle};

pub use trainer::hooks::{HookError, TrainerHooks};
pub use trainer::model_trainer::ModelTrainer;
pub use trainer::orchestrator::{
    Orchestrator, OrchestratorConfig, OrchestratorHandle, StateCell, TrainerState,
};

// Model checkpointing
pub use checkpoint::{resolve_model_path, CheckpointError, Checkpointer, CheckpointerConfig};

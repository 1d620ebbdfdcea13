//! The training orchestrator.
//!
//! Long-lived loop driving the whole run:
//!
//! ```text
//! UNINITIALIZED -> WAITING_FOR_DATA -> TRAINING (loop) -> SHUTTING_DOWN -> TERMINATED
//! ```
//!
//! At startup the orchestrator creates the shared store, hands every queued
//! agent its handles, and initializes the trainer (optionally loading a
//! checkpoint). It then waits for the store to reach the fill threshold
//! (bounded idle sleeps, stop-flag responsive), trains batch by batch until
//! the external stop signal is observed at a loop boundary, and finishes by
//! persisting the model exactly once. An in-flight training step is always
//! allowed to complete; there is no mid-step cancellation.

use crate::core::shape::ShapeDict;
use crate::core::{shared_store, SharedModelHandle, SharedStoreHandle};
use crate::messages::{deliver_handshakes, AgentRegistration};
use crate::model::TrainingStepError;
use crate::trainer::hooks::TrainerHooks;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on one uninterruptible sleep slice, so the wait phase stays
/// responsive to the stop signal even with long idle poll intervals.
const STOP_POLL_SLICE: Duration = Duration::from_millis(100);

/// Lifecycle states of the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TrainerState {
    /// Created, handles not yet distributed.
    Uninitialized = 0,
    /// Polling the store until it reaches the fill threshold.
    WaitingForData = 1,
    /// Steady-state sample/train loop.
    Training = 2,
    /// Stop observed; finishing and persisting.
    ShuttingDown = 3,
    /// Run complete, resources released.
    Terminated = 4,
}

impl TrainerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TrainerState::Uninitialized,
            1 => TrainerState::WaitingForData,
            2 => TrainerState::Training,
            3 => TrainerState::ShuttingDown,
            _ => TrainerState::Terminated,
        }
    }
}

/// Shared, atomically readable lifecycle state.
pub struct StateCell {
    inner: AtomicU8,
}

impl StateCell {
    /// A cell starting in `Uninitialized`.
    pub fn new() -> Self {
        Self {
            inner: AtomicU8::new(TrainerState::Uninitialized as u8),
        }
    }

    /// Current state.
    pub fn get(&self) -> TrainerState {
        TrainerState::from_u8(self.inner.load(Ordering::Acquire))
    }

    fn set(&self, state: TrainerState) {
        self.inner.store(state as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Replay store capacity.
    pub memory_size: usize,
    /// Records sampled per training step.
    pub batch_size: usize,
    /// Minimum store size before training starts.
    pub fill_threshold: usize,
    /// Sleep between fill polls while below the threshold.
    pub idle_poll_interval: Duration,
    /// Persist the model on the shutdown path.
    pub save_on_exit: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            memory_size: 100_000,
            batch_size: 500,
            fill_threshold: 20_000,
            idle_poll_interval: Duration::from_secs(5),
            save_on_exit: true,
        }
    }
}

impl OrchestratorConfig {
    /// Create config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the replay store capacity.
    pub fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    /// Set the training batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the minimum fill level before training starts.
    pub fn with_fill_threshold(mut self, fill_threshold: usize) -> Self {
        self.fill_threshold = fill_threshold;
        self
    }

    /// Set the idle poll interval for the wait phase.
    pub fn with_idle_poll_interval(mut self, interval: Duration) -> Self {
        self.idle_poll_interval = interval;
        self
    }

    /// Enable or disable persisting the model on exit.
    pub fn with_save_on_exit(mut self, save: bool) -> Self {
        self.save_on_exit = save;
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.memory_size == 0 {
            return Err("memory_size must be > 0");
        }
        if self.batch_size == 0 {
            return Err("batch_size must be > 0");
        }
        if self.fill_threshold > self.memory_size {
            return Err("fill_threshold must not exceed memory_size");
        }
        if self.batch_size > self.fill_threshold {
            return Err("batch_size must not exceed fill_threshold");
        }
        Ok(())
    }
}

/// Handle for controlling a spawned orchestrator thread.
pub struct OrchestratorHandle {
    /// Thread handle for the orchestrator loop.
    pub thread: std::thread::JoinHandle<()>,
    state: Arc<StateCell>,
    stop: Arc<AtomicBool>,
    store: SharedStoreHandle,
}

impl OrchestratorHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> TrainerState {
        self.state.get()
    }

    /// Raise the stop signal. Observed at the next loop boundary.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// The shared replay store (for agent glue and monitoring).
    pub fn store(&self) -> SharedStoreHandle {
        Arc::clone(&self.store)
    }

    /// Check if the orchestrator thread is still running.
    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Raise the stop signal and wait for the run to terminate.
    pub fn stop_and_wait(self) -> std::thread::Result<()> {
        self.stop.store(true, Ordering::Release);
        self.thread.join()
    }

    /// Wait for the orchestrator thread to finish.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

/// The long-lived training coordinator.
///
/// Owns the shared replay store (created here, before any agent receives a
/// handle) and drives a [`TrainerHooks`] implementation through the run.
pub struct Orchestrator {
    config: OrchestratorConfig,
    model: SharedModelHandle,
    store: SharedStoreHandle,
    registrations: Receiver<AgentRegistration>,
    stop: Arc<AtomicBool>,
    state: Arc<StateCell>,
}

impl Orchestrator {
    /// Create the orchestrator and its replay store.
    ///
    /// Field shapes are declared once here, from the model's dimensions.
    ///
    /// # Panics
    ///
    /// Panics if the config is invalid (zero sizes, threshold above
    /// capacity, batch above threshold).
    pub fn new(
        config: OrchestratorConfig,
        model: SharedModelHandle,
        registrations: Receiver<AgentRegistration>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        if let Err(e) = config.validate() {
            panic!("invalid OrchestratorConfig: {}", e);
        }
        let shapes = model.read(|m| ShapeDict::for_model(m));
        log::debug!("declared shape dictionary: {:?}", shapes);
        let store = shared_store(config.memory_size, shapes);
        Self {
            config,
            model,
            store,
            registrations,
            stop,
            state: Arc::new(StateCell::new()),
        }
    }

    /// The shared replay store.
    pub fn store(&self) -> SharedStoreHandle {
        Arc::clone(&self.store)
    }

    /// The shared model handle.
    pub fn model(&self) -> SharedModelHandle {
        Arc::clone(&self.model)
    }

    /// The observable lifecycle state cell.
    pub fn state_cell(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Spawn the orchestrator on its own thread.
    pub fn spawn(self, mut hooks: Box<dyn TrainerHooks>) -> OrchestratorHandle {
        let state = Arc::clone(&self.state);
        let stop = Arc::clone(&self.stop);
        let store = Arc::clone(&self.store);
        let thread = std::thread::Builder::new()
            .name("swarm-orchestrator".to_string())
            .spawn(move || self.run(hooks.as_mut()))
            .expect("failed to spawn orchestrator thread");
        OrchestratorHandle {
            thread,
            state,
            stop,
            store,
        }
    }

    /// Run the full lifecycle on the current thread.
    pub fn run(self, hooks: &mut dyn TrainerHooks) {
        let report = deliver_handshakes(&self.registrations, &self.model, &self.store);
        log::info!(
            "set up {} agents ({} dropped)",
            report.delivered,
            report.failures.len()
        );

        if let Err(e) = hooks.initialize_training(&report.options) {
            log::error!("training initialization failed: {}", e);
            self.state.set(TrainerState::Terminated);
            return;
        }

        self.state.set(TrainerState::WaitingForData);
        if self.wait_for_fill() {
            self.state.set(TrainerState::Training);
            self.training_loop(hooks);
        }

        self.state.set(TrainerState::ShuttingDown);
        if let Err(e) = hooks.finish_training(self.config.save_on_exit) {
            log::error!("finish_training failed: {}", e);
        }
        self.state.set(TrainerState::Terminated);
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Poll the store until it reaches the fill threshold.
    ///
    /// Returns false if the stop signal arrived first.
    fn wait_for_fill(&self) -> bool {
        loop {
            if self.stopped() {
                return false;
            }
            let size = self.store.len();
            if size >= self.config.fill_threshold {
                return true;
            }
            log::debug!(
                "waiting for data: {}/{} records",
                size,
                self.config.fill_threshold
            );
            self.idle_wait();
        }
    }

    /// Sleep up to one idle poll interval, in slices that keep the stop
    /// signal observable.
    fn idle_wait(&self) {
        let deadline = Instant::now() + self.config.idle_poll_interval;
        loop {
            if self.stopped() {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            std::thread::sleep(remaining.min(STOP_POLL_SLICE));
        }
    }

    /// Steady-state sample/train loop until stop or escalation.
    fn training_loop(&self, hooks: &mut dyn TrainerHooks) {
        loop {
            if self.stopped() {
                return;
            }

            let batch = match self.store.sample(self.config.batch_size) {
                Ok(batch) => batch,
                Err(e) => {
                    // The fill gate already passed and the store never
                    // shrinks, so running dry here is a programming error.
                    log::error!("sample failed after fill threshold: {}", e);
                    return;
                }
            };

            if let Err(first) = hooks.train_step(batch) {
                log::error!("{}; retrying once", first);
                let retry = self
                    .store
                    .sample(self.config.batch_size)
                    .map_err(|e| TrainingStepError::new(e.to_string()))
                    .and_then(|batch| hooks.train_step(batch));
                if let Err(second) = retry {
                    log::error!("{}; escalating to shutdown", second);
                    return;
                }
            }
        }
    }
}

//! Behavioral tests for the orchestrator lifecycle.

use crate::core::{model_handle, ExperienceTuple, SharedModelHandle, SharedStoreHandle, Tensor};
use crate::messages::{AgentRegistration, RunOptions};
use crate::model::{Model, ModelIoError, Observation, TrainingStepError};
use crate::trainer::hooks::{HookError, TrainerHooks};
use crate::trainer::orchestrator::{Orchestrator, OrchestratorConfig, TrainerState};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct MockModel;

impl Model for MockModel {
    fn predict(&self, _observation: &Observation) -> Vec<f32> {
        vec![0.0; 3]
    }

    fn train_step(&mut self, _batch: &crate::core::SampleBatch) -> Result<(), TrainingStepError> {
        Ok(())
    }

    fn save(&self, _path: &Path) -> Result<(), ModelIoError> {
        Ok(())
    }

    fn load(&mut self, _path: &Path) -> Result<(), ModelIoError> {
        Ok(())
    }

    fn input_state_dimension(&self) -> (Vec<usize>, Vec<usize>) {
        (vec![4], vec![2])
    }

    fn output_dimension(&self) -> Vec<usize> {
        vec![3]
    }
}

/// Shared observation points into a [`MockHooks`] owned by another thread.
#[derive(Clone, Default)]
struct HookCounters {
    init: Arc<AtomicUsize>,
    finish: Arc<AtomicUsize>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
    saves: Arc<Mutex<Vec<bool>>>,
    options: Arc<Mutex<Option<RunOptions>>>,
}

struct MockHooks {
    counters: HookCounters,
    // Front of the queue scripts the next train_step; true means fail.
    fail_script: VecDeque<bool>,
}

impl MockHooks {
    fn new(counters: HookCounters) -> Self {
        Self {
            counters,
            fail_script: VecDeque::new(),
        }
    }

    fn with_fail_script(mut self, script: &[bool]) -> Self {
        self.fail_script = script.iter().copied().collect();
        self
    }
}

impl TrainerHooks for MockHooks {
    fn initialize_training(&mut self, options: &RunOptions) -> Result<(), HookError> {
        self.counters.init.fetch_add(1, Ordering::SeqCst);
        *self.counters.options.lock().unwrap() = Some(options.clone());
        Ok(())
    }

    fn train_step(&mut self, batch: crate::core::SampleBatch) -> Result<(), TrainingStepError> {
        self.counters
            .batch_sizes
            .lock()
            .unwrap()
            .push(batch.batch_size());
        if self.fail_script.pop_front().unwrap_or(false) {
            return Err(TrainingStepError::new("scripted failure"));
        }
        Ok(())
    }

    fn finish_training(&mut self, save_model: bool) -> Result<(), HookError> {
        self.counters.finish.fetch_add(1, Ordering::SeqCst);
        self.counters.saves.lock().unwrap().push(save_model);
        Ok(())
    }
}

fn push_records(store: &SharedStoreHandle, count: usize) {
    for i in 0..count {
        let record = ExperienceTuple::from_parts(
            Tensor::zeros(&[4]),
            Tensor::zeros(&[2]),
            vec![0.0; 3],
            None,
            None,
            i as f32,
        );
        store.append(record).unwrap();
    }
}

fn mock_model() -> SharedModelHandle {
    model_handle(Box::new(MockModel))
}

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig::new()
        .with_memory_size(100)
        .with_batch_size(10)
        .with_fill_threshold(50)
        .with_idle_poll_interval(Duration::from_millis(10))
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn fill_threshold_gates_training() {
    init_logs();
    let (_reg_tx, reg_rx) = crossbeam_channel::unbounded::<AgentRegistration>();
    let stop = Arc::new(AtomicBool::new(false));
    let orchestrator = Orchestrator::new(fast_config(), mock_model(), reg_rx, Arc::clone(&stop));
    let store = orchestrator.store();
    let state = orchestrator.state_cell();

    push_records(&store, 49);

    let counters = HookCounters::default();
    let handle = orchestrator.spawn(Box::new(MockHooks::new(counters.clone())));

    assert!(wait_until(Duration::from_secs(2), || {
        state.get() == TrainerState::WaitingForData
    }));
    // One record below the threshold: still waiting, no batches trained.
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(state.get(), TrainerState::WaitingForData);
    assert!(counters.batch_sizes.lock().unwrap().is_empty());

    push_records(&store, 1);
    assert!(wait_until(Duration::from_secs(2), || {
        !counters.batch_sizes.lock().unwrap().is_empty()
    }));
    assert_eq!(counters.batch_sizes.lock().unwrap()[0], 10);

    handle.stop_and_wait().unwrap();
    assert_eq!(state.get(), TrainerState::Terminated);
    assert_eq!(counters.init.load(Ordering::SeqCst), 1);
    assert_eq!(counters.finish.load(Ordering::SeqCst), 1);
    assert_eq!(*counters.saves.lock().unwrap(), vec![true]);
}

#[test]
fn stop_during_wait_skips_training() {
    init_logs();
    let (_reg_tx, reg_rx) = crossbeam_channel::unbounded::<AgentRegistration>();
    let stop = Arc::new(AtomicBool::new(false));
    let orchestrator = Orchestrator::new(fast_config(), mock_model(), reg_rx, Arc::clone(&stop));
    let store = orchestrator.store();
    let state = orchestrator.state_cell();

    push_records(&store, 10);

    let counters = HookCounters::default();
    let handle = orchestrator.spawn(Box::new(MockHooks::new(counters.clone())));

    assert!(wait_until(Duration::from_secs(2), || {
        state.get() == TrainerState::WaitingForData
    }));
    handle.stop_and_wait().unwrap();

    assert_eq!(state.get(), TrainerState::Terminated);
    assert!(counters.batch_sizes.lock().unwrap().is_empty());
    assert_eq!(counters.finish.load(Ordering::SeqCst), 1);
}

#[test]
fn double_step_failure_escalates_to_shutdown() {
    init_logs();
    let (_reg_tx, reg_rx) = crossbeam_channel::unbounded::<AgentRegistration>();
    let stop = Arc::new(AtomicBool::new(false));
    let config = fast_config().with_batch_size(5).with_fill_threshold(5);
    let orchestrator = Orchestrator::new(config, mock_model(), reg_rx, stop);
    let store = orchestrator.store();
    let state = orchestrator.state_cell();

    push_records(&store, 5);

    let counters = HookCounters::default();
    let mut hooks = MockHooks::new(counters.clone()).with_fail_script(&[true, true]);
    orchestrator.run(&mut hooks);

    // One failed step, one failed retry, then a clean shutdown.
    assert_eq!(counters.batch_sizes.lock().unwrap().len(), 2);
    assert_eq!(counters.finish.load(Ordering::SeqCst), 1);
    assert_eq!(state.get(), TrainerState::Terminated);
}

#[test]
fn single_step_failure_recovers_on_retry() {
    init_logs();
    let (_reg_tx, reg_rx) = crossbeam_channel::unbounded::<AgentRegistration>();
    let stop = Arc::new(AtomicBool::new(false));
    let config = fast_config().with_batch_size(5).with_fill_threshold(5);
    let orchestrator = Orchestrator::new(config, mock_model(), reg_rx, stop);
    let store = orchestrator.store();
    let state = orchestrator.state_cell();

    push_records(&store, 20);

    let counters = HookCounters::default();
    let hooks = MockHooks::new(counters.clone()).with_fail_script(&[true]);
    let handle = orchestrator.spawn(Box::new(hooks));

    // The retry succeeds and the loop keeps going past the failure.
    assert!(wait_until(Duration::from_secs(2), || {
        counters.batch_sizes.lock().unwrap().len() >= 3
    }));
    handle.stop_and_wait().unwrap();

    assert!(counters.batch_sizes.lock().unwrap().len() >= 3);
    assert_eq!(counters.finish.load(Ordering::SeqCst), 1);
    assert_eq!(state.get(), TrainerState::Terminated);
}

#[test]
fn save_on_exit_flag_reaches_finish_hook() {
    init_logs();
    let (_reg_tx, reg_rx) = crossbeam_channel::unbounded::<AgentRegistration>();
    let stop = Arc::new(AtomicBool::new(true));
    let config = fast_config().with_save_on_exit(false);
    let orchestrator = Orchestrator::new(config, mock_model(), reg_rx, stop);

    let counters = HookCounters::default();
    let mut hooks = MockHooks::new(counters.clone());
    orchestrator.run(&mut hooks);

    assert_eq!(*counters.saves.lock().unwrap(), vec![false]);
}

#[test]
fn queued_registrations_receive_handshakes_and_options() {
    init_logs();
    let (reg_tx, reg_rx) = crossbeam_channel::unbounded::<AgentRegistration>();
    let (hs_tx, hs_rx) = crossbeam_channel::bounded(1);
    reg_tx
        .send(AgentRegistration::new(hs_tx, "runs/custom.ckpt", true))
        .unwrap();

    let stop = Arc::new(AtomicBool::new(true));
    let orchestrator = Orchestrator::new(fast_config(), mock_model(), reg_rx, stop);
    let store = orchestrator.store();

    let counters = HookCounters::default();
    let mut hooks = MockHooks::new(counters.clone());
    orchestrator.run(&mut hooks);

    let handshake = hs_rx.try_recv().expect("agent never received a handshake");
    assert!(Arc::ptr_eq(&handshake.store, &store));

    let options = counters.options.lock().unwrap().clone().unwrap();
    assert_eq!(
        options.model_path.as_deref(),
        Some(Path::new("runs/custom.ckpt"))
    );
    assert!(options.load_model);
}

#[test]
fn config_validation() {
    assert!(OrchestratorConfig::default().validate().is_ok());
    assert!(OrchestratorConfig::new()
        .with_memory_size(0)
        .validate()
        .is_err());
    assert!(OrchestratorConfig::new()
        .with_batch_size(0)
        .validate()
        .is_err());
    assert!(OrchestratorConfig::new()
        .with_fill_threshold(200_000)
        .validate()
        .is_err());
    assert!(OrchestratorConfig::new()
        .with_batch_size(50)
        .with_fill_threshold(10)
        .validate()
        .is_err());
}

#[test]
#[should_panic(expected = "invalid OrchestratorConfig")]
fn new_panics_on_invalid_config() {
    let (_reg_tx, reg_rx) = crossbeam_channel::unbounded::<AgentRegistration>();
    let stop = Arc::new(AtomicBool::new(false));
    let config = OrchestratorConfig::new().with_batch_size(0);
    let _ = Orchestrator::new(config, mock_model(), reg_rx, stop);
}

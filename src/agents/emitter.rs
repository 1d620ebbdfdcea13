//! Agent-side experience emitter.
//!
//! One emitter runs per agent. It blocks until the startup handshake
//! arrives, then on every game tick: reads an observation from the game-side
//! collaborator, computes an action from the (possibly stale) shared model,
//! clamps it onto the control surface, and appends the resulting experience
//! tuple to the shared store. A full store never blocks the emitter; ring
//! overwrite absorbs backpressure.

use crate::core::shape::ExperienceTuple;
use crate::messages::{EmitterMsg, EmitterStats, Handshake};
use crate::model::Observation;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Per-dimension clamp bounds for the action vector.
///
/// The default surface is five analog axes in `[-1, 1]` followed by three
/// button channels in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlSurface {
    low: Vec<f32>,
    high: Vec<f32>,
}

impl ControlSurface {
    /// Explicit per-dimension bounds.
    ///
    /// # Panics
    ///
    /// Panics if the bound vectors differ in length or any `low[i]` exceeds
    /// its `high[i]`. A malformed surface is a configuration error and must
    /// surface here, not on the first tick inside the emitter thread.
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Self {
        assert_eq!(low.len(), high.len(), "bound vectors must match in length");
        for (i, (lo, hi)) in low.iter().zip(&high).enumerate() {
            assert!(
                lo <= hi,
                "low bound {} exceeds high bound {} at dimension {}",
                lo,
                hi,
                i
            );
        }
        Self { low, high }
    }

    /// `dims` dimensions, all clamped to `[-1, 1]`.
    pub fn symmetric(dims: usize) -> Self {
        Self {
            low: vec![-1.0; dims],
            high: vec![1.0; dims],
        }
    }

    /// `n_analog` axes in `[-1, 1]` followed by `n_buttons` channels in `[0, 1]`.
    pub fn analog_buttons(n_analog: usize, n_buttons: usize) -> Self {
        let mut low = vec![-1.0; n_analog];
        let mut high = vec![1.0; n_analog];
        low.extend(std::iter::repeat(0.0).take(n_buttons));
        high.extend(std::iter::repeat(1.0).take(n_buttons));
        Self { low, high }
    }

    /// Number of action dimensions covered.
    pub fn dims(&self) -> usize {
        self.low.len()
    }

    /// Clamp an action vector in place. Dimensions beyond the declared
    /// surface are left untouched.
    pub fn clamp(&self, action: &mut [f32]) {
        let n = action.len().min(self.low.len());
        for i in 0..n {
            action[i] = action[i].clamp(self.low[i], self.high[i]);
        }
    }
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::analog_buttons(5, 3)
    }
}

/// Emitter configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Agent ID (for logging and stats).
    pub agent_id: usize,
    /// Clamp bounds for the action vector.
    pub control: ControlSurface,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            agent_id: 0,
            control: ControlSurface::default(),
        }
    }
}

impl EmitterConfig {
    /// Create config for a specific agent ID.
    pub fn for_agent(agent_id: usize) -> Self {
        Self {
            agent_id,
            ..Default::default()
        }
    }

    /// Set the control surface.
    pub fn with_control(mut self, control: ControlSurface) -> Self {
        self.control = control;
        self
    }
}

/// Emitter handle for controlling a spawned emitter thread.
pub struct EmitterHandle {
    /// Thread handle.
    pub thread: std::thread::JoinHandle<()>,
    /// Channel to receive stats from the emitter.
    pub stats_rx: Receiver<EmitterStats>,
    /// Channel to send commands to the emitter.
    pub cmd_tx: Sender<EmitterMsg>,
}

impl EmitterHandle {
    /// Send stop command to the emitter.
    pub fn stop(&self) {
        let _ = self.cmd_tx.try_send(EmitterMsg::Stop);
    }

    /// Get latest stats (non-blocking).
    pub fn get_stats(&self) -> Option<EmitterStats> {
        self.stats_rx.try_recv().ok()
    }

    /// Check if the emitter thread is still running.
    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Wait for the emitter thread to finish.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

/// Per-agent experience producer.
///
/// Emitters run in their own thread and:
/// 1. Wait for the startup handshake (handles arrive before the first tick)
/// 2. Read an observation from the game-side closure each tick
/// 3. Predict an action from the shared model and clamp it
/// 4. Append the experience tuple to the shared store
pub struct Emitter {
    config: EmitterConfig,
}

impl Emitter {
    /// Create a new emitter with given configuration.
    pub fn new(config: EmitterConfig) -> Self {
        Self { config }
    }

    /// Spawn the emitter thread.
    ///
    /// `obs_fn` is the game-side collaborator: it yields one observation per
    /// tick and `None` when the game ends. The thread blocks on
    /// `handshake_rx` before its first tick, so no append can race the
    /// handle setup.
    pub fn spawn<FObs>(self, handshake_rx: Receiver<Handshake>, mut obs_fn: FObs) -> EmitterHandle
    where
        FObs: FnMut() -> Option<Observation> + Send + 'static,
    {
        let config = self.config;
        let (stats_tx, stats_rx) = crossbeam_channel::bounded(100);
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(100);

        let thread = std::thread::Builder::new()
            .name(format!("swarm-emitter-{}", config.agent_id))
            .spawn(move || {
                // Handles must arrive before the first tick.
                let handshake = match handshake_rx.recv() {
                    Ok(h) => h,
                    Err(_) => {
                        log::warn!(
                            "emitter {}: handshake channel closed before delivery, exiting",
                            config.agent_id
                        );
                        return;
                    }
                };

                let mut stats = EmitterStats::new(config.agent_id);

                loop {
                    // Check for commands
                    if let Ok(msg) = cmd_rx.try_recv() {
                        match msg {
                            EmitterMsg::Stop => break,
                            EmitterMsg::RequestStats => {
                                stats.model_version = handshake.model.version();
                                let _ = stats_tx.try_send(stats.clone());
                            }
                        }
                    }

                    let observation = match obs_fn() {
                        Some(o) => o,
                        None => break,
                    };

                    let mut action = handshake.model.predict(&observation);
                    config.control.clamp(&mut action);

                    let tick = stats.ticks;
                    stats.ticks += 1;

                    let tuple = ExperienceTuple::from_parts(
                        observation.spatial,
                        observation.extra,
                        action,
                        observation.mask,
                        observation.teacher_action,
                        tick as f32,
                    );

                    match handshake.store.append(tuple) {
                        Ok(()) => stats.appends += 1,
                        Err(e) => {
                            // A rejected record must not take the agent down.
                            stats.append_errors += 1;
                            log::error!("emitter {}: append rejected: {}", config.agent_id, e);
                        }
                    }
                }

                stats.model_version = handshake.model.version();
                let _ = stats_tx.try_send(stats);
            })
            .expect("failed to spawn emitter thread");

        EmitterHandle {
            thread,
            stats_rx,
            cmd_tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::{SampleBatch, Field, ShapeDict, Tensor};
    use crate::core::{model_handle, shared_store};
    use crate::model::{Model, ModelIoError, Observation, TrainingStepError};
    use crossbeam_channel::unbounded;
    use std::path::Path;
    use std::time::{Duration, Instant};

    /// Predicts out-of-range values so clamping is observable.
    struct LoudModel;

    impl Model for LoudModel {
        fn predict(&self, _observation: &Observation) -> Vec<f32> {
            vec![2.0, -3.0, 0.25, 5.0]
        }
        fn train_step(&mut self, _batch: &SampleBatch) -> Result<(), TrainingStepError> {
            Ok(())
        }
        fn save(&self, _path: &Path) -> Result<(), ModelIoError> {
            Ok(())
        }
        fn load(&mut self, _path: &Path) -> Result<(), ModelIoError> {
            Ok(())
        }
        fn input_state_dimension(&self) -> (Vec<usize>, Vec<usize>) {
            (vec![2], vec![1])
        }
        fn output_dimension(&self) -> Vec<usize> {
            vec![4]
        }
    }

    fn obs() -> Observation {
        Observation::new(Tensor::zeros(&[2]), Tensor::zeros(&[1]))
    }

    fn wait_until(timeout: Duration, f: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        f()
    }

    #[test]
    fn test_control_surface_clamp() {
        let surface = ControlSurface::analog_buttons(2, 2);
        let mut action = vec![2.0, -3.0, -0.5, 0.7];
        surface.clamp(&mut action);
        assert_eq!(action, vec![1.0, -1.0, 0.0, 0.7]);
    }

    #[test]
    #[should_panic(expected = "low bound")]
    fn test_control_surface_rejects_inverted_bounds() {
        let _ = ControlSurface::new(vec![-1.0, 0.5], vec![1.0, -0.5]);
    }

    #[test]
    fn test_default_surface_is_eight_dims() {
        assert_eq!(ControlSurface::default().dims(), 8);
    }

    #[test]
    fn test_emitter_appends_clamped_experience() {
        let model = model_handle(Box::new(LoudModel));
        let store = shared_store(64, ShapeDict::new(vec![2], vec![1], vec![4]));
        let (hs_tx, hs_rx) = unbounded();
        hs_tx.send(Handshake::new(model, store.clone())).unwrap();

        let ticks = 10;
        let mut produced = 0usize;
        let handle = Emitter::new(EmitterConfig::for_agent(3).with_control(
            ControlSurface::symmetric(4),
        ))
        .spawn(hs_rx, move || {
            if produced < ticks {
                produced += 1;
                Some(obs())
            } else {
                None
            }
        });

        handle.join().unwrap();
        assert_eq!(store.len(), ticks);

        let batch = store.sample(ticks).unwrap();
        let actions = batch.get(Field::Action).unwrap();
        for chunk in actions.data().chunks(4) {
            assert_eq!(chunk, &[1.0, -1.0, 0.25, 1.0]);
        }
        // Tick ordinals were stamped in order.
        let times = batch.get(Field::Time).unwrap();
        for &t in times.data() {
            assert!(t < ticks as f32);
        }
    }

    #[test]
    fn test_emitter_waits_for_handshake_before_first_tick() {
        let model = model_handle(Box::new(LoudModel));
        let store = shared_store(64, ShapeDict::new(vec![2], vec![1], vec![4]));
        let (hs_tx, hs_rx) = unbounded();

        let handle = Emitter::new(EmitterConfig::default().with_control(
            ControlSurface::symmetric(4),
        ))
        .spawn(hs_rx, move || Some(obs()));

        // No handshake yet: no ticks can have run.
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(store.len(), 0);

        hs_tx.send(Handshake::new(model, store.clone())).unwrap();
        assert!(wait_until(Duration::from_secs(2), || store.len() > 0));

        handle.stop();
        handle.join().unwrap();
    }

    #[test]
    fn test_emitter_survives_shape_rejection() {
        let model = model_handle(Box::new(LoudModel));
        // Store declares a different spatial shape than the observations carry.
        let store = shared_store(64, ShapeDict::new(vec![3], vec![1], vec![4]));
        let (hs_tx, hs_rx) = unbounded();
        hs_tx.send(Handshake::new(model, store.clone())).unwrap();

        let mut produced = 0usize;
        let handle = Emitter::new(EmitterConfig::default().with_control(
            ControlSurface::symmetric(4),
        ))
        .spawn(hs_rx, move || {
            if produced < 5 {
                produced += 1;
                Some(obs())
            } else {
                None
            }
        });

        handle.join().unwrap();
        // Every append was rejected, but the emitter finished its run.
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_emitter_reports_stats() {
        let model = model_handle(Box::new(LoudModel));
        let store = shared_store(64, ShapeDict::new(vec![2], vec![1], vec![4]));
        let (hs_tx, hs_rx) = unbounded();
        hs_tx.send(Handshake::new(model, store)).unwrap();

        let mut produced = 0usize;
        let handle = Emitter::new(EmitterConfig::for_agent(9).with_control(
            ControlSurface::symmetric(4),
        ))
        .spawn(hs_rx, move || {
            if produced < 4 {
                produced += 1;
                Some(obs())
            } else {
                None
            }
        });

        handle.thread.join().unwrap();
        let stats = handle.stats_rx.try_recv().expect("final stats expected");
        assert_eq!(stats.agent_id, 9);
        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.appends, 4);
        assert_eq!(stats.append_errors, 0);
    }
}

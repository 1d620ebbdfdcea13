//! Agent registration and handle distribution.
//!
//! Each newly spawned agent announces itself with a registration carrying
//! its private handshake channel and its requested checkpoint options. At
//! startup the orchestrator drains the queued registrations in FIFO order
//! and sends each agent exactly one [`Handshake`]. A broken channel drops
//! that one agent with a warning; the rest of the swarm is unaffected.

use crate::core::{SharedModelHandle, SharedStoreHandle};
use crate::messages::handshake::Handshake;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::path::PathBuf;

/// Ephemeral record an agent sends when it announces itself.
///
/// Consumed exactly once at orchestrator startup; not retained afterward.
pub struct AgentRegistration {
    /// The agent's private handshake channel.
    pub handshake_tx: Sender<Handshake>,
    /// Checkpoint path requested by this agent, relative to the repo root.
    pub model_path: PathBuf,
    /// Whether this agent asks for an existing checkpoint to be loaded.
    pub load_model: bool,
}

impl AgentRegistration {
    /// Create a registration.
    pub fn new(handshake_tx: Sender<Handshake>, model_path: impl Into<PathBuf>, load_model: bool) -> Self {
        Self {
            handshake_tx,
            model_path: model_path.into(),
            load_model,
        }
    }
}

/// Checkpoint options governing one run.
///
/// When several agents request different paths or flags, the options from
/// the most recently drained registration win (documented last-wins policy).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunOptions {
    /// Checkpoint path relative to the repo root, if any agent supplied one.
    pub model_path: Option<PathBuf>,
    /// Whether to load an existing checkpoint before training.
    pub load_model: bool,
}

/// One agent whose handshake could not be delivered.
#[derive(Debug, Clone)]
pub struct RegistrationDeliveryError {
    /// Zero-based position of the registration in the drained queue.
    pub agent_index: usize,
    /// The path that agent had requested (for diagnostics).
    pub model_path: PathBuf,
}

impl std::fmt::Display for RegistrationDeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "handshake channel closed for agent {} (model_path {:?})",
            self.agent_index, self.model_path
        )
    }
}

impl std::error::Error for RegistrationDeliveryError {}

/// Outcome of draining the registration queue.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Agents that received their handshake.
    pub delivered: usize,
    /// Agents dropped because their channel was closed.
    pub failures: Vec<RegistrationDeliveryError>,
    /// Last-wins checkpoint options for this run.
    pub options: RunOptions,
}

/// Drain all pending registrations and send each agent its handshake.
///
/// Registrations are processed in FIFO order and each agent receives the
/// handles exactly once. Delivery failures are logged and collected; they
/// never abort the drain.
pub fn deliver_handshakes(
    registrations: &Receiver<AgentRegistration>,
    model: &SharedModelHandle,
    store: &SharedStoreHandle,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    let mut index = 0usize;

    loop {
        let registration = match registrations.try_recv() {
            Ok(r) => r,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        };

        // Options follow the drain order, not delivery success.
        report.options = RunOptions {
            model_path: Some(registration.model_path.clone()),
            load_model: registration.load_model,
        };

        let handshake = Handshake::new(model.clone(), store.clone());
        if registration.handshake_tx.send(handshake).is_ok() {
            report.delivered += 1;
        } else {
            let failure = RegistrationDeliveryError {
                agent_index: index,
                model_path: registration.model_path,
            };
            log::warn!("dropping registration: {}", failure);
            report.failures.push(failure);
        }
        index += 1;
    }

    report
}

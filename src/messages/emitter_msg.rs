//! Messages for agent-side emitter workers.

/// Commands sent to an emitter worker.
#[derive(Debug, Clone)]
pub enum EmitterMsg {
    /// Stop the emitter gracefully.
    Stop,

    /// Request statistics from the emitter.
    RequestStats,
}

/// Statistics reported by an emitter.
#[derive(Debug, Clone, Default)]
pub struct EmitterStats {
    /// Agent identifier.
    pub agent_id: usize,

    /// Ticks processed.
    pub ticks: usize,

    /// Records successfully appended to the store.
    pub appends: usize,

    /// Appends rejected by the store (shape contract violations).
    pub append_errors: usize,

    /// Model version observed on the most recent tick.
    pub model_version: u64,
}

impl EmitterStats {
    /// Create stats for an agent.
    pub fn new(agent_id: usize) -> Self {
        Self {
            agent_id,
            ..Default::default()
        }
    }
}

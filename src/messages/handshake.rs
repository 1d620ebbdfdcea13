//! The startup handshake delivered to each agent.

use crate::core::{SharedModelHandle, SharedStoreHandle};

/// The two shared handles every agent needs before its first tick.
///
/// Delivered as one typed message down the agent's private channel, so there
/// is no ordering ambiguity between the model reference and the store
/// reference.
#[derive(Clone)]
pub struct Handshake {
    /// Reference to the shared model parameters (read side).
    pub model: SharedModelHandle,
    /// Reference to the shared replay store (write side).
    pub store: SharedStoreHandle,
}

impl Handshake {
    /// Bundle the two handles.
    pub fn new(model: SharedModelHandle, store: SharedStoreHandle) -> Self {
        Self { model, store }
    }
}

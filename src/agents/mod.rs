//! Agent-side workers.
//!
//! - `Emitter`: per-agent experience producer that feeds the shared store.

pub mod emitter;

pub use emitter::{ControlSurface, Emitter, EmitterConfig, EmitterHandle};

// Re-export from messages for convenience
pub use crate::messages::{EmitterMsg, EmitterStats};

//! Message-passing infrastructure between agents and the orchestrator.
//!
//! # Architecture
//!
//! ```text
//!   Agent process                       Orchestrator
//!   +-----------+   registration    +-----------------+
//!   | Emitter   | ----------------> | FIFO drain      |
//!   |           | <---------------- | (startup, once) |
//!   +-----------+    Handshake      +-----------------+
//!                 {model handle, store handle}
//! ```
//!
//! Registrations are drained in FIFO order at startup; each agent receives
//! exactly one typed [`Handshake`] before its first tick.

mod emitter_msg;
mod handshake;
mod registration;

pub use emitter_msg::{EmitterMsg, EmitterStats};
pub use handshake::Handshake;
pub use registration::{
    deliver_handshakes, AgentRegistration, DeliveryReport, RegistrationDeliveryError, RunOptions,
};

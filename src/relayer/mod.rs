//! Relayer Module
//!
//! Process-level wiring around the per-channel engines:
//! - Channel registry with one lock per channel
//! - Inbound message decoding and routing
//! - Periodic active polling with graceful shutdown

pub mod dispatcher;
pub mod poller;

pub use dispatcher::{Relayer, SharedEngine};
pub use poller::spawn_poller;

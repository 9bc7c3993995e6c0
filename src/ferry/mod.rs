//! Ferry Module
//!
//! Moves one transaction per relay attempt:
//! - Failover and parallel quorum fetch from source nodes
//! - Fingerprint verification and optional signing
//! - Failover post to destination nodes

pub mod failover;
pub mod pipeline;

pub use failover::{first_success, with_timeout};
pub use pipeline::Ferry;

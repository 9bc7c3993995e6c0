//! Consensus Module
//!
//! Decides when a channel's next transaction can be trusted:
//! - Quorum tracking over independent node reports
//! - Pluggable quorum policies
//! - Per-channel engine gating on a monotonic sequence cursor

pub mod engine;
pub mod quorum;

pub use engine::{ConsensusEngine, Ingested, RelayOutcome};
pub use quorum::{
    Decision, FirstResponder, QuorumPolicy, QuorumTracker, StrictMajority, Tally, TwoToOne,
};

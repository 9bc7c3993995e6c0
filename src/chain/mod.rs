//! Chain Module
//!
//! Everything the relay knows about chains:
//! - Cross-chain transaction payloads and their signable bytes
//! - Event reports and their wire decoding
//! - The node client seam, with an in-memory implementation

pub mod client;
pub mod event;
pub mod memory;
pub mod transaction;

pub use client::NodeClient;
pub use event::EventReport;
pub use memory::{MemoryNodeClient, Submission};
pub use transaction::{Transaction, TxSignature};

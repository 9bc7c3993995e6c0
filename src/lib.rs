//! # xrelay - Cross-chain relay core
//!
//! Moves transactions between chains once independent source nodes agree on them:
//! - **Consensus**: per-channel sequence cursor and quorum over node reports
//! - **Ferry**: fetch, verify, sign and post with node failover
//! - **Relayer**: channel registry, inbound dispatch and active polling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xrelay::chain::MemoryNodeClient;
//! use xrelay::config::{ChainConfig, RelayConfig};
//! use xrelay::core::Channel;
//! use xrelay::relayer::Relayer;
//!
//! #[tokio::main]
//! async fn main() -> xrelay::Result<()> {
//!     let config = RelayConfig::default()
//!         .with_chain(ChainConfig::new("qsc-a", &["tcp://127.0.0.1:26657"]))
//!         .with_chain(ChainConfig::new("qos", &["tcp://127.0.0.1:27657"]));
//!     xrelay::monitoring::init_logging(&config.logging);
//!
//!     let mut relayer = Relayer::new(config, Arc::new(MemoryNodeClient::new()))?;
//!     relayer.add_channel(Channel::new("qsc-a", "qos"), 0)?;
//!
//!     let (_stop, shutdown) = tokio::sync::watch::channel(false);
//!     for handle in relayer.spawn_pollers(shutdown) {
//!         let _ = handle.await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod config;
pub mod consensus;
pub mod core;
pub mod crypto;
pub mod ferry;
pub mod monitoring;
pub mod relayer;

pub use crate::core::error::{Error, ErrorKind, Result};

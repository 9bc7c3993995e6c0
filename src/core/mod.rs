//! Core utilities and common types for the relay.

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::*;

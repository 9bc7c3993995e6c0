//! Error types for the relay core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while relaying.
#[derive(Error, Debug)]
pub enum Error {
    // Ingestion errors (local, never escalate)
    #[error("Stale sequence {sequence}: cursor is already at {cursor}")]
    StaleSequence { sequence: u64, cursor: u64 },

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Report for channel {got} delivered to engine for {expected}")]
    ChannelMismatch { expected: String, got: String },

    #[error("Sequence {sequence} is more than {limit} ahead of cursor {cursor}")]
    BeyondLookahead { sequence: u64, cursor: u64, limit: u64 },

    #[error("Sequence {0} is the last representable sequence")]
    SequenceOverflow(u64),

    // Quorum errors
    #[error("Conflicting fingerprints reported for sequence {0}")]
    Conflicted(u64),

    // Relay attempt errors
    #[error("No node produced a verifiable transaction for sequence {sequence} bound for {to}")]
    QuorumFetchFailed { to: String, sequence: u64 },

    #[error("Fingerprint mismatch from node {node}: expected {expected}, got {actual}")]
    VerificationFailed {
        node: String,
        expected: String,
        actual: String,
    },

    #[error("Signing failed: {0}")]
    SignFailed(String),

    #[error("Post to chain {0} failed on every node")]
    PostFailed(String),

    // Node-level errors (absorbed by failover)
    #[error("Transaction for sequence {sequence} not found on node {node}")]
    NotFound { node: String, sequence: u64 },

    #[error("Node {node} unavailable: {reason}")]
    NodeUnavailable { node: String, reason: String },

    #[error("Request to node {0} timed out")]
    Timeout(String),

    // Configuration errors
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("No engine registered for channel {0}")]
    UnknownChannel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless classification of [`Error`], used in relay outcomes and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    StaleSequence,
    MalformedEvent,
    ChannelMismatch,
    BeyondLookahead,
    SequenceOverflow,
    Conflicted,
    QuorumFetchFailed,
    VerificationFailed,
    SignFailed,
    PostFailed,
    NotFound,
    NodeUnavailable,
    Timeout,
    UnknownChain,
    UnknownChannel,
    Config,
    InvalidKeyFormat,
    Serialization,
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::StaleSequence { .. } => ErrorKind::StaleSequence,
            Error::MalformedEvent(_) => ErrorKind::MalformedEvent,
            Error::ChannelMismatch { .. } => ErrorKind::ChannelMismatch,
            Error::BeyondLookahead { .. } => ErrorKind::BeyondLookahead,
            Error::SequenceOverflow(_) => ErrorKind::SequenceOverflow,
            Error::Conflicted(_) => ErrorKind::Conflicted,
            Error::QuorumFetchFailed { .. } => ErrorKind::QuorumFetchFailed,
            Error::VerificationFailed { .. } => ErrorKind::VerificationFailed,
            Error::SignFailed(_) => ErrorKind::SignFailed,
            Error::PostFailed(_) => ErrorKind::PostFailed,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::NodeUnavailable { .. } => ErrorKind::NodeUnavailable,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::UnknownChain(_) => ErrorKind::UnknownChain,
            Error::UnknownChannel(_) => ErrorKind::UnknownChannel,
            Error::Config(_) => ErrorKind::Config,
            Error::InvalidKeyFormat(_) => ErrorKind::InvalidKeyFormat,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this error belongs to a relay attempt (cursor unchanged, retried on
    /// the next trigger).
    pub fn is_relay_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::QuorumFetchFailed
                | ErrorKind::VerificationFailed
                | ErrorKind::SignFailed
                | ErrorKind::PostFailed
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error::InvalidKeyFormat(err.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        Error::SignFailed(err.to_string())
    }
}

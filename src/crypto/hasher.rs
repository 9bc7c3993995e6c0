//! Fingerprint hashing.
//!
//! The hasher must match the one source chains use to publish transaction hashes,
//! so it is pluggable. SHA-256 is the default.

use crate::core::Fingerprint;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

/// Deterministic hash over a transaction's canonical signable bytes.
pub trait Hasher: Send + Sync {
    /// Hash the given bytes into a fingerprint.
    fn hash(&self, data: &[u8]) -> Fingerprint;
}

/// SHA-256 fingerprints.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash(&self, data: &[u8]) -> Fingerprint {
        sha256(data)
    }
}

/// SHA3-256 fingerprints.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha3Hasher;

impl Hasher for Sha3Hasher {
    fn hash(&self, data: &[u8]) -> Fingerprint {
        sha3_256(data)
    }
}

/// Compute SHA-256 hash of data.
pub fn sha256(data: &[u8]) -> Fingerprint {
    let result = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Fingerprint::new(bytes)
}

/// Compute SHA3-256 hash of data.
pub fn sha3_256(data: &[u8]) -> Fingerprint {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Fingerprint::new(bytes)
}

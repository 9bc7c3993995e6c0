//! Cryptography Module
//!
//! Provides the relay's cryptographic collaborators:
//! - Fingerprint hashing (SHA-256, SHA3-256)
//! - Ed25519 signing of forwarded transactions

pub mod hasher;
pub mod signer;

pub use hasher::{sha256, sha3_256, Hasher, Sha256Hasher, Sha3Hasher};
pub use signer::{Ed25519Signer, Signer};

//! Cross-chain transaction payload.

use crate::core::{Fingerprint, Result};
use crate::crypto::Hasher;
use serde::{Deserialize, Serialize};

/// Signature attached by a relayer before posting to the destination chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    /// Signer public key
    pub public_key: Vec<u8>,
    /// Signature over the signable bytes
    pub signature: Vec<u8>,
}

/// A cross-chain transaction as served by a chain node.
///
/// The payload is opaque to the relay. Integrity is checked by hashing the
/// signable bytes, which never include the signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Source chain
    pub from: String,
    /// Destination chain
    pub to: String,
    /// Sequence number on the channel
    pub sequence: u64,
    /// Source block height
    pub height: u64,
    /// Opaque payload
    pub payload: Vec<u8>,
    /// Relayer signature, set when the destination requires one
    pub signature: Option<TxSignature>,
}

#[derive(Serialize)]
struct SignableView<'a> {
    from: &'a str,
    to: &'a str,
    sequence: u64,
    height: u64,
    payload: &'a [u8],
}

impl Transaction {
    /// Create an unsigned transaction.
    pub fn new(from: &str, to: &str, sequence: u64, height: u64, payload: Vec<u8>) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            sequence,
            height,
            payload,
            signature: None,
        }
    }

    /// Canonical signable bytes.
    pub fn signable_bytes(&self) -> Result<Vec<u8>> {
        let view = SignableView {
            from: &self.from,
            to: &self.to,
            sequence: self.sequence,
            height: self.height,
            payload: &self.payload,
        };
        Ok(bincode::serialize(&view)?)
    }

    /// Fingerprint of the signable bytes under the given hasher.
    pub fn fingerprint(&self, hasher: &dyn Hasher) -> Result<Fingerprint> {
        Ok(hasher.hash(&self.signable_bytes()?))
    }

    /// Whether this transaction is the one at `sequence` on channel `from -> to`.
    pub fn matches(&self, from: &str, to: &str, sequence: u64) -> bool {
        self.from == from && self.to == to && self.sequence == sequence
    }

    /// Whether a relayer signature is attached.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

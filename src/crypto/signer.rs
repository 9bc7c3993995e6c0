//! Relay signing key.
//!
//! Some destination chains only accept transactions carrying the relayer's
//! signature. The relay signs with Ed25519.

use crate::core::{Error, Result};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};

/// Signs bytes with the process's private key.
pub trait Signer: Send + Sync {
    /// Sign a message.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    /// Public key matching the private key used by [`Signer::sign`].
    fn public_key(&self) -> Vec<u8>;
}

/// Ed25519 signer.
#[derive(Clone)]
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Create a signer with a random key pair.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut csprng = rand::rngs::OsRng;
        let mut secret_key_bytes = [0u8; 32];
        csprng.fill_bytes(&mut secret_key_bytes);
        Self {
            signing_key: SigningKey::from_bytes(&secret_key_bytes),
        }
    }

    /// Create from existing signing key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// Create from a hex-encoded 32-byte seed (optionally `0x`-prefixed).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidKeyFormat(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self::from_bytes(&seed))
    }

    /// Get the verifying (public) key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self.signing_key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }

    fn public_key(&self) -> Vec<u8> {
        self.verifying_key().to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &hex::encode(self.verifying_key().to_bytes()))
            .finish()
    }
}

/// Verify an Ed25519 signature with a raw public key.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| Error::InvalidKeyFormat("Invalid public key length".into()))?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| Error::InvalidKeyFormat("Invalid signature length".into()))?;
    let key = VerifyingKey::from_bytes(&key_bytes)?;
    key.verify(message, &Signature::from_bytes(&sig_bytes))?;
    Ok(())
}

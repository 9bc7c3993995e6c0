//! Common types used across the relay modules.

use serde::{Deserialize, Serialize};

/// A 256-bit transaction fingerprint (hash of the canonical signable bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Create a new Fingerprint from bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a zero fingerprint.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Build from a byte slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Get the bytes of the fingerprint.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::zero()
    }
}

/// A directional pair of chains: transactions flow from `from` to `to`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    /// Source chain name
    pub from: String,
    /// Destination chain name
    pub to: String,
}

impl Channel {
    /// Create a new channel.
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Timestamp wrapper for consistent serialization.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Get current UTC timestamp.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Strip the `scheme://` prefix from a node URL.
///
/// `tcp://127.0.0.1:26657` becomes `127.0.0.1:26657`; inputs without a scheme are
/// returned unchanged.
pub fn endpoint_address(url: &str) -> &str {
    match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_zero() {
        let fp = Fingerprint::zero();
        assert_eq!(fp.0, [0u8; 32]);
    }

    #[test]
    fn test_fingerprint_from_hex_prefixed() {
        let hex_str = format!("0x{}", "ab".repeat(32));
        let fp = Fingerprint::from_hex(&hex_str).unwrap();
        assert_eq!(fp.0, [0xab; 32]);
        assert!(Fingerprint::from_hex("abcd").is_err());
    }

    #[test]
    fn test_fingerprint_from_slice() {
        assert!(Fingerprint::from_slice(&[1u8; 32]).is_some());
        assert!(Fingerprint::from_slice(&[1u8; 20]).is_none());
    }

    #[test]
    fn test_channel_display() {
        let channel = Channel::new("qsc-a", "qos");
        assert_eq!(channel.to_string(), "qsc-a -> qos");
    }

    #[test]
    fn test_endpoint_address() {
        assert_eq!(endpoint_address("nats://127.0.0.1"), "127.0.0.1");
        assert_eq!(endpoint_address("tcp://127.0.0.1:26657"), "127.0.0.1:26657");
        assert_eq!(endpoint_address("http://127.0.0.1:8080"), "127.0.0.1:8080");
        assert_eq!(endpoint_address("127.0.0.1:8080"), "127.0.0.1:8080");
    }
}

//! Event reports: a node's claim that a transaction exists at a sequence.

use crate::core::{Channel, Error, Fingerprint, Result};
use serde::{Deserialize, Serialize};

/// A node's attestation of a cross-chain transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReport {
    /// Reporting node address
    pub node: String,
    /// Source chain
    pub from: String,
    /// Destination chain
    pub to: String,
    /// Source block height
    pub height: u64,
    /// Sequence number on the channel
    pub sequence: u64,
    /// Fingerprint of the reported transaction
    pub fingerprint: Fingerprint,
}

impl EventReport {
    /// Create a new report.
    pub fn new(
        node: &str,
        channel: &Channel,
        height: u64,
        sequence: u64,
        fingerprint: Fingerprint,
    ) -> Self {
        Self {
            node: node.to_string(),
            from: channel.from.clone(),
            to: channel.to.clone(),
            height,
            sequence,
            fingerprint,
        }
    }

    /// Channel this report belongs to.
    pub fn channel(&self) -> Channel {
        Channel::new(&self.from, &self.to)
    }

    /// Decode an inbound notification.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::MalformedEvent(e.to_string()))
    }

    /// Encode for the notification transport.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Build a report from chain event tags (`qcp.from`, `qcp.to`, `qcp.hash`,
    /// `qcp.sequence`, `qcp.height`). Unknown tags are ignored.
    pub fn from_tags(node: &str, tags: &[(Vec<u8>, Vec<u8>)]) -> Result<Self> {
        if tags.is_empty() {
            return Err(Error::MalformedEvent("empty tags".to_string()));
        }

        let mut from = None;
        let mut to = None;
        let mut fingerprint = None;
        let mut sequence = None;
        let mut height = 0;

        for (key, value) in tags {
            match key.as_slice() {
                b"qcp.from" => from = Some(tag_string(key, value)?),
                b"qcp.to" => to = Some(tag_string(key, value)?),
                b"qcp.hash" => {
                    fingerprint = Some(Fingerprint::from_slice(value).ok_or_else(|| {
                        Error::MalformedEvent(format!("qcp.hash has {} bytes", value.len()))
                    })?)
                }
                b"qcp.sequence" => sequence = Some(tag_u64(key, value)?),
                b"qcp.height" => height = tag_u64(key, value)?,
                _ => {}
            }
        }

        let missing = |name: &str| Error::MalformedEvent(format!("missing tag {}", name));
        Ok(Self {
            node: node.to_string(),
            from: from.ok_or_else(|| missing("qcp.from"))?,
            to: to.ok_or_else(|| missing("qcp.to"))?,
            height,
            sequence: sequence.ok_or_else(|| missing("qcp.sequence"))?,
            fingerprint: fingerprint.ok_or_else(|| missing("qcp.hash"))?,
        })
    }
}

fn tag_string(key: &[u8], value: &[u8]) -> Result<String> {
    String::from_utf8(value.to_vec()).map_err(|_| {
        Error::MalformedEvent(format!("tag {} is not utf-8", String::from_utf8_lossy(key)))
    })
}

fn tag_u64(key: &[u8], value: &[u8]) -> Result<u64> {
    tag_string(key, value)?.parse().map_err(|_| {
        Error::MalformedEvent(format!("tag {} is not a number", String::from_utf8_lossy(key)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(k: &str, v: &[u8]) -> (Vec<u8>, Vec<u8>) {
        (k.as_bytes().to_vec(), v.to_vec())
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let err = EventReport::decode(&[0xff, 0x01]).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent(_)));
    }

    #[test]
    fn test_decode_encoded_report() {
        let channel = Channel::new("qsc-a", "qos");
        let report = EventReport::new("n1", &channel, 10, 5, Fingerprint::new([3; 32]));
        let decoded = EventReport::decode(&report.encode().unwrap()).unwrap();
        assert_eq!(decoded, report);
        assert_eq!(decoded.channel(), channel);
    }

    #[test]
    fn test_from_tags() {
        let tags = vec![
            tag("qcp.from", b"qsc-a"),
            tag("qcp.to", b"qos"),
            tag("qcp.hash", &[9u8; 32]),
            tag("qcp.sequence", b"42"),
            tag("qcp.height", b"7"),
            tag("other", b"ignored"),
        ];
        let report = EventReport::from_tags("n1", &tags).unwrap();
        assert_eq!(report.sequence, 42);
        assert_eq!(report.height, 7);
        assert_eq!(report.fingerprint, Fingerprint::new([9; 32]));
        assert_eq!(report.node, "n1");
    }

    #[test]
    fn test_from_tags_errors() {
        assert!(EventReport::from_tags("n1", &[]).is_err());

        let missing_hash = vec![
            tag("qcp.from", b"qsc-a"),
            tag("qcp.to", b"qos"),
            tag("qcp.sequence", b"1"),
        ];
        assert!(EventReport::from_tags("n1", &missing_hash).is_err());

        let bad_sequence = vec![
            tag("qcp.from", b"qsc-a"),
            tag("qcp.to", b"qos"),
            tag("qcp.hash", &[1u8; 32]),
            tag("qcp.sequence", b"seven"),
        ];
        assert!(matches!(
            EventReport::from_tags("n1", &bad_sequence),
            Err(Error::MalformedEvent(_))
        ));
    }
}

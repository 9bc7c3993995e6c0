//! Relay configuration.
//!
//! Per-chain node lists and signing requirements, plus the knobs of the relay
//! pipeline. Loaded from JSON.

use crate::core::{Error, Result};
use crate::crypto::Ed25519Signer;
use crate::monitoring::logging::LoggingConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

/// How the ferry fetches a transaction from source nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Ask nodes one at a time, trust the first verified answer
    #[default]
    Failover,
    /// Ask every node concurrently and apply the quorum policy
    Parallel,
}

/// Quorum policy selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuorumPolicyConfig {
    /// Agreement once `success * 2 > failure`
    #[default]
    TwoToOne,
    /// Agreement on the first corroborating report
    FirstResponder,
    /// Agreement once `success * 2 > nodes`
    StrictMajority { nodes: usize },
}

/// Configuration of one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain name
    pub name: String,
    /// Node endpoints, in failover order
    #[serde(deserialize_with = "node_list")]
    pub nodes: Vec<String>,
    /// Whether transactions posted to this chain must carry the relay signature
    #[serde(default)]
    pub signature: bool,
}

impl ChainConfig {
    /// Create a chain config with the given nodes.
    pub fn new(name: &str, nodes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            signature: false,
        }
    }

    /// Require a relay signature on transactions posted to this chain.
    pub fn with_signature(mut self, required: bool) -> Self {
        self.signature = required;
        self
    }
}

/// Accepts either a JSON list or a comma-separated string.
fn node_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Nodes {
        List(Vec<String>),
        Csv(String),
    }

    let nodes = match Nodes::deserialize(deserializer)? {
        Nodes::List(list) => list,
        Nodes::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };
    Ok(nodes
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

/// Relay configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Known chains
    pub chains: Vec<ChainConfig>,
    /// Hex-encoded Ed25519 seed, required when any chain needs signatures
    #[serde(default)]
    pub private_key: Option<String>,
    /// Fetch strategy
    #[serde(default)]
    pub fetch_mode: FetchMode,
    /// Per-node request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Overall deadline for one relay attempt
    #[serde(default)]
    pub relay_deadline_ms: Option<u64>,
    /// Active poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How far ahead of the cursor a report may be; `null` for no limit
    #[serde(default = "default_max_lookahead")]
    pub max_lookahead: Option<u64>,
    /// Quorum policy
    #[serde(default)]
    pub quorum: QuorumPolicyConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_lookahead() -> Option<u64> {
    Some(10_000)
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            private_key: None,
            fetch_mode: FetchMode::default(),
            request_timeout_ms: default_request_timeout_ms(),
            relay_deadline_ms: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_lookahead: default_max_lookahead(),
            quorum: QuorumPolicyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add a chain.
    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chains.push(chain);
        self
    }

    /// Set the private key.
    pub fn with_private_key(mut self, hex_seed: &str) -> Self {
        self.private_key = Some(hex_seed.to_string());
        self
    }

    /// Check node lists and key material.
    pub fn validate(&self) -> Result<()> {
        for chain in &self.chains {
            if chain.nodes.is_empty() {
                return Err(Error::Config(format!("chain {} has no nodes", chain.name)));
            }
        }

        if self.chains.iter().any(|c| c.signature) {
            match &self.private_key {
                None => {
                    return Err(Error::Config(
                        "private_key is required when a chain requires signatures".to_string(),
                    ))
                }
                Some(key) => {
                    Ed25519Signer::from_hex(key)?;
                }
            }
        }

        if let QuorumPolicyConfig::StrictMajority { nodes: 0 } = self.quorum {
            return Err(Error::Config("strict majority needs at least one node".to_string()));
        }
        Ok(())
    }

    /// Look up a chain by name.
    pub fn chain(&self, name: &str) -> Result<&ChainConfig> {
        self.chains
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::UnknownChain(name.to_string()))
    }

    /// Signer for the configured private key, if any.
    pub fn signer(&self) -> Result<Option<Ed25519Signer>> {
        self.private_key
            .as_deref()
            .map(Ed25519Signer::from_hex)
            .transpose()
    }

    /// Per-node request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Overall relay deadline.
    pub fn relay_deadline(&self) -> Option<Duration> {
        self.relay_deadline_ms.map(Duration::from_millis)
    }

    /// Active poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

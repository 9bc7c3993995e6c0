//! Channel registry and inbound message dispatch.
//!
//! Each channel gets its own engine behind its own lock, so channels progress
//! independently while every mutation of one channel's cursor and quorum state
//! is serialized.

use crate::chain::{EventReport, NodeClient};
use crate::config::RelayConfig;
use crate::consensus::{ConsensusEngine, Ingested};
use crate::core::{Channel, Error, Result};
use crate::ferry::Ferry;
use crate::monitoring::{Counter, MetricsSnapshot};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// An engine shared between the dispatcher and its poller.
pub type SharedEngine = Arc<Mutex<ConsensusEngine>>;

/// Routes reports to per-channel engines.
pub struct Relayer {
    config: Arc<RelayConfig>,
    client: Arc<dyn NodeClient>,
    engines: HashMap<Channel, SharedEngine>,
    malformed_events: Counter,
}

impl Relayer {
    /// Create a relayer with no channels.
    pub fn new(config: RelayConfig, client: Arc<dyn NodeClient>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            client,
            engines: HashMap::new(),
            malformed_events: Counter::new(),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &Arc<RelayConfig> {
        &self.config
    }

    /// Register a channel starting at `cursor`.
    pub fn add_channel(&mut self, channel: Channel, cursor: u64) -> Result<SharedEngine> {
        self.config.chain(&channel.from)?;
        self.config.chain(&channel.to)?;
        if self.engines.contains_key(&channel) {
            return Err(Error::Config(format!("channel {} already registered", channel)));
        }

        let ferry = Ferry::new(self.config.clone(), self.client.clone())?;
        let engine = ConsensusEngine::new(channel.clone(), Arc::new(ferry)).with_cursor(cursor);
        let engine = Arc::new(Mutex::new(engine));
        info!(channel = %channel, cursor, "channel registered");
        self.engines.insert(channel, engine.clone());
        Ok(engine)
    }

    /// Engine for `channel`.
    pub fn engine(&self, channel: &Channel) -> Option<SharedEngine> {
        self.engines.get(channel).cloned()
    }

    /// Registered channels.
    pub fn channels(&self) -> Vec<Channel> {
        self.engines.keys().cloned().collect()
    }

    /// Decode an inbound notification and route it to its channel.
    pub async fn dispatch(&self, bytes: &[u8]) -> Result<Ingested> {
        let report = match EventReport::decode(bytes) {
            Ok(report) => report,
            Err(err) => {
                self.malformed_events.inc();
                warn!(error = %err, "dropping malformed event");
                return Err(err);
            }
        };
        self.dispatch_report(report).await
    }

    /// Route a decoded report to its channel.
    pub async fn dispatch_report(&self, report: EventReport) -> Result<Ingested> {
        let channel = report.channel();
        let engine = self
            .engine(&channel)
            .ok_or_else(|| Error::UnknownChannel(channel.to_string()))?;
        let mut engine = engine.lock().await;
        engine.ingest(report).await
    }

    /// Run one active poll on every channel concurrently.
    pub async fn step_all(&self) -> Vec<(Channel, Result<Option<Ingested>>)> {
        let steps = self.engines.iter().map(|(channel, engine)| async move {
            let result = engine.lock().await.step().await;
            (channel.clone(), result)
        });
        join_all(steps).await
    }

    /// Cursor of every channel.
    pub async fn cursors(&self) -> HashMap<Channel, u64> {
        let mut cursors = HashMap::new();
        for (channel, engine) in &self.engines {
            cursors.insert(channel.clone(), engine.lock().await.cursor());
        }
        cursors
    }

    /// Metrics of one channel.
    pub async fn metrics(&self, channel: &Channel) -> Option<MetricsSnapshot> {
        let engine = self.engine(channel)?;
        let snapshot = engine.lock().await.metrics().snapshot();
        Some(snapshot)
    }

    /// Inbound messages dropped because they could not be decoded.
    pub fn malformed_events(&self) -> u64 {
        self.malformed_events.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MemoryNodeClient, Transaction};
    use crate::config::ChainConfig;
    use crate::crypto::Sha256Hasher;

    fn config() -> RelayConfig {
        RelayConfig::default()
            .with_chain(ChainConfig::new("qsc-a", &["n1"]))
            .with_chain(ChainConfig::new("qsc-b", &["m1"]))
            .with_chain(ChainConfig::new("qos", &["d1"]))
    }

    fn relayer() -> (Relayer, Arc<MemoryNodeClient>) {
        let client = Arc::new(MemoryNodeClient::new());
        let mut relayer = Relayer::new(config(), client.clone()).unwrap();
        relayer.add_channel(Channel::new("qsc-a", "qos"), 0).unwrap();
        relayer.add_channel(Channel::new("qsc-b", "qos"), 3).unwrap();
        (relayer, client)
    }

    #[tokio::test]
    async fn test_malformed_event_dropped() {
        let (relayer, _) = relayer();
        let err = relayer.dispatch(b"not an event").await.unwrap_err();
        assert!(matches!(err, Error::MalformedEvent(_)));
        assert_eq!(relayer.malformed_events(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_channel() {
        let (relayer, client) = relayer();
        let tx = Transaction::new("qsc-b", "qos", 3, 9, vec![7]);
        client.insert("m1", tx.clone()).await;
        let fp = tx.fingerprint(&Sha256Hasher).unwrap();

        let report = EventReport::new("m1", &Channel::new("qsc-b", "qos"), 9, 3, fp);
        let ingested = relayer.dispatch(&report.encode().unwrap()).await.unwrap();
        assert_eq!(ingested, Ingested::Relayed { sequence: 3, cursor: 4 });

        let cursors = relayer.cursors().await;
        assert_eq!(cursors[&Channel::new("qsc-a", "qos")], 0);
        assert_eq!(cursors[&Channel::new("qsc-b", "qos")], 4);
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let (relayer, _) = relayer();
        let report = EventReport::new("n1", &Channel::new("qos", "qsc-a"), 1, 0, Default::default());
        assert!(matches!(
            relayer.dispatch_report(report).await,
            Err(Error::UnknownChannel(_))
        ));
    }

    #[tokio::test]
    async fn test_add_channel_validates() {
        let (mut relayer, _) = relayer();
        assert!(relayer.add_channel(Channel::new("qsc-a", "qos"), 0).is_err());
        assert!(matches!(
            relayer.add_channel(Channel::new("qsc-z", "qos"), 0),
            Err(Error::UnknownChain(_))
        ));
        assert_eq!(relayer.channels().len(), 2);
    }

    #[tokio::test]
    async fn test_step_all() {
        let (relayer, client) = relayer();
        client
            .insert("n1", Transaction::new("qsc-a", "qos", 0, 1, vec![1]))
            .await;

        let results = relayer.step_all().await;
        assert_eq!(results.len(), 2);
        for (channel, result) in results {
            let stepped = result.unwrap();
            if channel.from == "qsc-a" {
                assert_eq!(stepped, Some(Ingested::Relayed { sequence: 0, cursor: 1 }));
            } else {
                assert_eq!(stepped, None);
            }
        }

        let metrics = relayer.metrics(&Channel::new("qsc-a", "qos")).await.unwrap();
        assert_eq!(metrics.relays_succeeded, 1);
        assert_eq!(metrics.cursor, 1);
    }
}

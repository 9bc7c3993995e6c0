//! Periodic active polling.
//!
//! A failed step is logged and retried on the next tick; the cursor never moves
//! past a sequence that has not been relayed.

use crate::consensus::Ingested;
use crate::relayer::dispatcher::{Relayer, SharedEngine};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Spawn a loop calling `step` on `engine` every `interval` until `shutdown`
/// flips to `true` or its sender is dropped.
pub fn spawn_poller(
    engine: SharedEngine,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let mut engine = engine.lock().await;
            let channel = engine.channel().clone();
            match engine.step().await {
                Ok(Some(Ingested::Relayed { sequence, cursor })) => {
                    debug!(channel = %channel, sequence, cursor, "poll relayed transaction");
                }
                Ok(_) => {}
                Err(err) => warn!(channel = %channel, error = %err, "poll cycle failed"),
            }
        }

        info!("poller stopped");
    })
}

impl Relayer {
    /// Spawn one poller per registered channel at the configured interval.
    pub fn spawn_pollers(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let interval = self.config().poll_interval();
        self.channels()
            .iter()
            .filter_map(|channel| self.engine(channel))
            .map(|engine| spawn_poller(engine, interval, shutdown.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MemoryNodeClient, Transaction};
    use crate::config::{ChainConfig, RelayConfig};
    use crate::core::Channel;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_poller_relays_and_stops() {
        let client = Arc::new(MemoryNodeClient::new());
        let config = RelayConfig {
            poll_interval_ms: 10,
            ..RelayConfig::default()
        }
        .with_chain(ChainConfig::new("qsc-a", &["n1"]))
        .with_chain(ChainConfig::new("qos", &["d1"]));
        let mut relayer = Relayer::new(config, client.clone()).unwrap();
        let engine = relayer.add_channel(Channel::new("qsc-a", "qos"), 0).unwrap();

        for sequence in 0..3 {
            client
                .insert("n1", Transaction::new("qsc-a", "qos", sequence, 1, vec![sequence as u8]))
                .await;
        }

        let (stop, shutdown) = watch::channel(false);
        let handles = relayer.spawn_pollers(shutdown);
        assert_eq!(handles.len(), 1);

        for _ in 0..100 {
            if engine.lock().await.cursor() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(engine.lock().await.cursor(), 3);

        stop.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(client.submissions().await.len(), 3);
    }
}

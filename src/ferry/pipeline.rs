//! Fetch, verify, sign and post one cross-chain transaction.
//!
//! Node-level errors are absorbed here. Only when every configured node has
//! been exhausted does the relay attempt fail.

use crate::chain::{NodeClient, Transaction, TxSignature};
use crate::config::{FetchMode, RelayConfig};
use crate::consensus::quorum::QuorumPolicy;
use crate::core::{Error, ErrorKind, Fingerprint, Result};
use crate::crypto::{Hasher, Sha256Hasher, Signer};
use crate::ferry::failover::{first_success, log_node_failure, with_timeout};
use crate::monitoring::RelayMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Moves transactions from source to destination chains.
pub struct Ferry {
    config: Arc<RelayConfig>,
    client: Arc<dyn NodeClient>,
    hasher: Arc<dyn Hasher>,
    signer: Option<Arc<dyn Signer>>,
    policy: Arc<dyn QuorumPolicy>,
    metrics: Arc<RelayMetrics>,
}

impl Ferry {
    /// Create a ferry from configuration.
    ///
    /// Uses SHA-256 fingerprints, the configured quorum policy, and the configured
    /// private key for signing.
    pub fn new(config: Arc<RelayConfig>, client: Arc<dyn NodeClient>) -> Result<Self> {
        let signer = config
            .signer()?
            .map(|signer| Arc::new(signer) as Arc<dyn Signer>);
        let policy = config.quorum.build();
        Ok(Self {
            config,
            client,
            hasher: Arc::new(Sha256Hasher),
            signer,
            policy,
            metrics: Arc::new(RelayMetrics::new()),
        })
    }

    /// Use a different fingerprint hasher.
    pub fn with_hasher(mut self, hasher: Arc<dyn Hasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Use a different signer.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Use a different parallel-fetch quorum policy.
    pub fn with_policy(mut self, policy: Arc<dyn QuorumPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Share a metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<RelayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &Arc<RelayConfig> {
        &self.config
    }

    /// Node client in use.
    pub fn client(&self) -> &Arc<dyn NodeClient> {
        &self.client
    }

    /// Hasher in use.
    pub fn hasher(&self) -> &Arc<dyn Hasher> {
        &self.hasher
    }

    /// Metrics sink.
    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.metrics
    }

    /// Relay the transaction at `sequence` from `from` to `to`.
    ///
    /// Fetches with the configured mode, signs when the destination requires it,
    /// and posts with failover. Does not retry.
    pub async fn relay(
        &self,
        from: &str,
        to: &str,
        fingerprint: Fingerprint,
        sequence: u64,
    ) -> Result<()> {
        debug!(from, to, sequence, fingerprint = %fingerprint, "ferrying transaction");
        let started = Instant::now();
        let result = self.relay_inner(from, to, fingerprint, sequence, started).await;

        self.metrics
            .relay_seconds
            .observe(started.elapsed().as_secs_f64());
        match &result {
            Ok(()) => {
                self.metrics.relays_succeeded.inc();
                info!(from, to, sequence, "ferried transaction");
            }
            Err(err) => {
                self.metrics.relays_failed.inc();
                error!(from, to, sequence, error = %err, "relay attempt failed");
            }
        }
        result
    }

    async fn relay_inner(
        &self,
        from: &str,
        to: &str,
        fingerprint: Fingerprint,
        sequence: u64,
        started: Instant,
    ) -> Result<()> {
        let source_nodes = self.config.chain(from)?.nodes.clone();
        let dest_nodes = self.config.chain(to)?.nodes.clone();
        let deadline = self.config.relay_deadline().map(|d| started + d);

        let fetch_failed = || Error::QuorumFetchFailed {
            to: to.to_string(),
            sequence,
        };
        let tx = within(deadline, fetch_failed(), async {
            match self.config.fetch_mode {
                FetchMode::Failover => {
                    self.fetch_failover(from, to, fingerprint, &source_nodes, sequence)
                        .await
                }
                FetchMode::Parallel => self
                    .fetch_parallel(from, to, fingerprint, &source_nodes, sequence)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(fetch_failed),
            }
        })
        .await?;

        let tx = self.sign(to, tx)?;

        within(deadline, Error::PostFailed(to.to_string()), async {
            self.post_failover(to, &tx, &dest_nodes).await.map(|_| ())
        })
        .await
    }

    /// Fetch from `nodes` in order; the first verified transaction wins.
    pub async fn fetch_failover(
        &self,
        from: &str,
        to: &str,
        fingerprint: Fingerprint,
        nodes: &[String],
        sequence: u64,
    ) -> Result<Transaction> {
        let timeout = self.config.request_timeout();
        let result = first_success(nodes, |node| async move {
            let result = fetch_verified(
                self.client.clone(),
                self.hasher.clone(),
                node,
                from.to_string(),
                to.to_string(),
                fingerprint,
                sequence,
                timeout,
            )
            .await;
            if let Err(err) = &result {
                self.note_node_failure(err);
            }
            result
        })
        .await;

        match result {
            Ok((node, tx)) => {
                debug!(node = %node, sequence, "fetched verified transaction");
                Ok(tx)
            }
            Err(_) => Err(Error::QuorumFetchFailed {
                to: to.to_string(),
                sequence,
            }),
        }
    }

    /// Fetch from every node concurrently and apply the quorum policy.
    ///
    /// Returns the verified transactions in node order.
    pub async fn fetch_parallel(
        &self,
        from: &str,
        to: &str,
        fingerprint: Fingerprint,
        nodes: &[String],
        sequence: u64,
    ) -> Result<Vec<Transaction>> {
        let timeout = self.config.request_timeout();
        let mut slots: Vec<Option<Transaction>> = vec![None; nodes.len()];
        let mut tasks = JoinSet::new();

        for (index, node) in nodes.iter().enumerate() {
            let client = self.client.clone();
            let hasher = self.hasher.clone();
            let node = node.clone();
            let from = from.to_string();
            let to = to.to_string();
            tasks.spawn(async move {
                let result = fetch_verified(
                    client,
                    hasher,
                    node.clone(),
                    from,
                    to,
                    fingerprint,
                    sequence,
                    timeout,
                )
                .await;
                (index, node, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(tx))) => slots[index] = Some(tx),
                Ok((_, node, Err(err))) => {
                    log_node_failure(&node, &err);
                    self.note_node_failure(&err);
                }
                Err(err) => {
                    warn!(error = %err, "fetch task aborted");
                    self.metrics.node_failures.inc();
                }
            }
        }

        let fetched: Vec<Transaction> = slots.into_iter().flatten().collect();
        let success = fetched.len();
        let failure = nodes.len() - success;
        debug!(sequence, success, failure, "parallel fetch finished");

        if success > 0 && self.policy.satisfied(success, failure) {
            Ok(fetched)
        } else {
            Err(Error::QuorumFetchFailed {
                to: to.to_string(),
                sequence,
            })
        }
    }

    /// Sign `tx` when the destination chain `to` requires a relay signature.
    pub fn sign(&self, to: &str, mut tx: Transaction) -> Result<Transaction> {
        if !self.config.chain(to)?.signature {
            return Ok(tx);
        }

        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| Error::SignFailed("no private key configured".to_string()))?;
        let bytes = tx.signable_bytes()?;
        let signature = signer.sign(&bytes).map_err(|e| match e {
            Error::SignFailed(_) => e,
            other => Error::SignFailed(other.to_string()),
        })?;

        tx.signature = Some(TxSignature {
            public_key: signer.public_key(),
            signature,
        });
        debug!(to, sequence = tx.sequence, "signed transaction");
        Ok(tx)
    }

    /// Submit `tx` to `nodes` in order; returns the node that accepted it.
    pub async fn post_failover(&self, to: &str, tx: &Transaction, nodes: &[String]) -> Result<String> {
        let timeout = self.config.request_timeout();
        let result = first_success(nodes, |node| async move {
            let result =
                with_timeout(&node, timeout, self.client.submit_transaction(&node, to, tx)).await;
            if let Err(err) = &result {
                self.note_node_failure(err);
            }
            result
        })
        .await;

        match result {
            Ok((node, ())) => {
                debug!(node = %node, to, sequence = tx.sequence, "transaction accepted");
                Ok(node)
            }
            Err(_) => Err(Error::PostFailed(to.to_string())),
        }
    }

    fn note_node_failure(&self, err: &Error) {
        match err.kind() {
            ErrorKind::VerificationFailed => self.metrics.verification_failures.inc(),
            _ => self.metrics.node_failures.inc(),
        }
    }
}

/// Query one node and check the transaction against the request and `fingerprint`.
async fn fetch_verified(
    client: Arc<dyn NodeClient>,
    hasher: Arc<dyn Hasher>,
    node: String,
    from: String,
    to: String,
    fingerprint: Fingerprint,
    sequence: u64,
    timeout: Duration,
) -> Result<Transaction> {
    let tx = with_timeout(&node, timeout, client.query_transaction(&node, &to, sequence))
        .await?
        .ok_or_else(|| Error::NotFound {
            node: node.clone(),
            sequence,
        })?;

    if !tx.matches(&from, &to, sequence) {
        return Err(Error::VerificationFailed {
            node,
            expected: format!("{} -> {} #{}", from, to, sequence),
            actual: format!("{} -> {} #{}", tx.from, tx.to, tx.sequence),
        });
    }

    let actual = tx.fingerprint(hasher.as_ref())?;
    if actual != fingerprint {
        return Err(Error::VerificationFailed {
            node,
            expected: fingerprint.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(tx)
}

/// Run `stage` against an optional deadline, failing with `on_deadline`.
async fn within<T>(
    deadline: Option<Instant>,
    on_deadline: Error,
    stage: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, stage)
            .await
            .unwrap_or(Err(on_deadline)),
        None => stage.await,
    }
}

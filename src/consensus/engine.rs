//! Consensus engine for one relay channel.
//!
//! Owns the channel cursor, feeds node reports to the quorum tracker and, once a
//! sequence is agreed, ferries its transaction and advances the cursor.

use crate::chain::EventReport;
use crate::consensus::quorum::{Decision, QuorumTracker};
use crate::core::{now, Channel, Error, ErrorKind, Fingerprint, Result, Timestamp};
use crate::ferry::failover::{log_node_failure, with_timeout};
use crate::ferry::Ferry;
use crate::monitoring::RelayMetrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of ingesting a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ingested {
    /// Recorded; the sequence is not ready to relay yet
    Pending { sequence: u64 },
    /// The sequence was relayed; `cursor` is the new cursor
    Relayed { sequence: u64, cursor: u64 },
}

/// Result of one relay attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayOutcome {
    /// Sequence attempted
    pub sequence: u64,
    /// Whether the transaction was posted
    pub success: bool,
    /// Failure classification
    pub error: Option<ErrorKind>,
    /// When the attempt finished
    pub finished_at: Timestamp,
}

/// Relay progress for one channel.
pub struct ConsensusEngine {
    channel: Channel,
    cursor: u64,
    tracker: QuorumTracker,
    ferry: Arc<Ferry>,
    metrics: Arc<RelayMetrics>,
    last_outcome: Option<RelayOutcome>,
}

impl ConsensusEngine {
    /// Create an engine at cursor 0.
    ///
    /// The tracker uses the configured quorum policy; metrics are shared with the
    /// ferry.
    pub fn new(channel: Channel, ferry: Arc<Ferry>) -> Self {
        let tracker = QuorumTracker::new(ferry.config().quorum.build());
        let metrics = ferry.metrics().clone();
        Self {
            channel,
            cursor: 0,
            tracker,
            ferry,
            metrics,
            last_outcome: None,
        }
    }

    /// Start from a given sequence.
    pub fn with_cursor(mut self, cursor: u64) -> Self {
        self.cursor = cursor;
        self.metrics.cursor.set(cursor);
        self
    }

    /// Replace the quorum tracker.
    pub fn with_tracker(mut self, tracker: QuorumTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// The channel this engine relays.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Next sequence not yet relayed.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Move the cursor forward. Lower values are ignored.
    pub fn set_cursor(&mut self, cursor: u64) {
        if cursor > self.cursor {
            info!(channel = %self.channel, cursor, "sequence set");
            self.cursor = cursor;
            self.tracker.clear_below(cursor);
            self.metrics.cursor.set(cursor);
        }
    }

    /// Quorum state.
    pub fn tracker(&self) -> &QuorumTracker {
        &self.tracker
    }

    /// Most recent relay attempt.
    pub fn last_outcome(&self) -> Option<&RelayOutcome> {
        self.last_outcome.as_ref()
    }

    /// Metrics shared with the ferry.
    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.metrics
    }

    /// Accept a node report.
    ///
    /// Reports below the cursor are rejected as stale. Reports above the cursor
    /// are recorded but only relayed once every earlier sequence has been; they
    /// stay in the tracker until then, so `max_lookahead` bounds how far ahead a
    /// report may be.
    pub async fn ingest(&mut self, report: EventReport) -> Result<Ingested> {
        if report.from != self.channel.from || report.to != self.channel.to {
            return Err(Error::ChannelMismatch {
                expected: self.channel.to_string(),
                got: report.channel().to_string(),
            });
        }

        if report.sequence < self.cursor {
            self.metrics.stale_reports.inc();
            debug!(channel = %self.channel, sequence = report.sequence, cursor = self.cursor, "stale report");
            return Err(Error::StaleSequence {
                sequence: report.sequence,
                cursor: self.cursor,
            });
        }

        if let Some(limit) = self.ferry.config().max_lookahead {
            if report.sequence - self.cursor > limit {
                self.metrics.lookahead_rejections.inc();
                debug!(channel = %self.channel, node = %report.node, sequence = report.sequence, cursor = self.cursor, limit, "report beyond lookahead");
                return Err(Error::BeyondLookahead {
                    sequence: report.sequence,
                    cursor: self.cursor,
                    limit,
                });
            }
        }

        self.metrics.reports_ingested.inc();
        let sequence = report.sequence;
        let decision = self
            .tracker
            .record(sequence, &report.node, report.fingerprint);
        debug!(channel = %self.channel, node = %report.node, sequence, ?decision, "report recorded");

        match decision {
            Decision::Pending => Ok(Ingested::Pending { sequence }),
            Decision::Conflicted => {
                self.metrics.conflicts.inc();
                warn!(channel = %self.channel, sequence, "conflicting fingerprints reported");
                Err(Error::Conflicted(sequence))
            }
            Decision::Agreed(_) if sequence > self.cursor => {
                debug!(channel = %self.channel, sequence, cursor = self.cursor, "agreed ahead of cursor");
                Ok(Ingested::Pending { sequence })
            }
            Decision::Agreed(fingerprint) => {
                self.relay(sequence, fingerprint).await?;
                self.catch_up().await;
                Ok(Ingested::Relayed {
                    sequence,
                    cursor: self.cursor,
                })
            }
        }
    }

    /// Poll the source nodes for the transaction at the cursor.
    ///
    /// Nodes are asked in configured order; each one holding the transaction
    /// contributes a report. Returns `Ok(None)` when no report was decisive.
    pub async fn step(&mut self) -> Result<Option<Ingested>> {
        let config = self.ferry.config().clone();
        let nodes = &config.chain(&self.channel.from)?.nodes;
        let timeout = config.request_timeout();
        let sequence = self.cursor;
        debug!(channel = %self.channel, sequence, "polling source nodes");

        for node in nodes {
            let query = self
                .ferry
                .client()
                .query_transaction(node, &self.channel.to, sequence);
            let tx = match with_timeout(node, timeout, query).await {
                Ok(Some(tx)) => tx,
                Ok(None) => continue,
                Err(err) => {
                    log_node_failure(node, &err);
                    continue;
                }
            };

            if !tx.matches(&self.channel.from, &self.channel.to, sequence) {
                let err = Error::VerificationFailed {
                    node: node.clone(),
                    expected: format!("{} #{}", self.channel, sequence),
                    actual: format!("{} -> {} #{}", tx.from, tx.to, tx.sequence),
                };
                log_node_failure(node, &err);
                self.metrics.verification_failures.inc();
                continue;
            }

            let fingerprint = tx.fingerprint(self.ferry.hasher().as_ref())?;
            let report = EventReport::new(node, &self.channel, tx.height, sequence, fingerprint);
            match self.ingest(report).await? {
                Ingested::Pending { .. } => continue,
                relayed => return Ok(Some(relayed)),
            }
        }

        Ok(None)
    }

    async fn relay(&mut self, sequence: u64, fingerprint: Fingerprint) -> Result<()> {
        let result = match sequence.checked_add(1) {
            Some(next) => self
                .ferry
                .relay(&self.channel.from, &self.channel.to, fingerprint, sequence)
                .await
                .map(|()| next),
            None => Err(Error::SequenceOverflow(sequence)),
        };
        self.tracker.clear(sequence);

        self.last_outcome = Some(RelayOutcome {
            sequence,
            success: result.is_ok(),
            error: result.as_ref().err().map(Error::kind),
            finished_at: now(),
        });

        let next = result?;
        self.set_cursor(next);
        Ok(())
    }

    /// Relay sequences that reached agreement while waiting behind the cursor.
    async fn catch_up(&mut self) {
        while let Decision::Agreed(fingerprint) = self.tracker.decide(self.cursor) {
            let sequence = self.cursor;
            if self.relay(sequence, fingerprint).await.is_err() {
                break;
            }
        }
    }
}

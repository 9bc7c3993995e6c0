//! In-memory node client.
//!
//! Serves transactions from a table and records submissions. Nodes can be made
//! unavailable, slow, or rejecting to exercise failover.

use crate::chain::client::NodeClient;
use crate::chain::transaction::Transaction;
use crate::core::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    transactions: HashMap<(String, String, u64), Transaction>,
    unavailable: HashSet<String>,
    rejecting: HashSet<String>,
    delays: HashMap<String, Duration>,
    submissions: Vec<Submission>,
    queries: HashMap<String, u64>,
}

/// A transaction accepted by a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub node: String,
    pub to: String,
    pub transaction: Transaction,
}

/// In-memory [`NodeClient`].
#[derive(Default)]
pub struct MemoryNodeClient {
    state: RwLock<State>,
}

impl MemoryNodeClient {
    /// Create an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `tx` from `node` for its destination chain and sequence.
    pub async fn insert(&self, node: &str, tx: Transaction) {
        let key = (node.to_string(), tx.to.clone(), tx.sequence);
        self.state.write().await.transactions.insert(key, tx);
    }

    /// Make every call to `node` fail.
    pub async fn set_unavailable(&self, node: &str, unavailable: bool) {
        let mut state = self.state.write().await;
        if unavailable {
            state.unavailable.insert(node.to_string());
        } else {
            state.unavailable.remove(node);
        }
    }

    /// Make `node` reject submissions.
    pub async fn set_rejecting(&self, node: &str, rejecting: bool) {
        let mut state = self.state.write().await;
        if rejecting {
            state.rejecting.insert(node.to_string());
        } else {
            state.rejecting.remove(node);
        }
    }

    /// Delay every response from `node`.
    pub async fn set_delay(&self, node: &str, delay: Duration) {
        self.state
            .write()
            .await
            .delays
            .insert(node.to_string(), delay);
    }

    /// Accepted submissions, in order.
    pub async fn submissions(&self) -> Vec<Submission> {
        self.state.read().await.submissions.clone()
    }

    /// Number of queries `node` has served.
    pub async fn query_count(&self, node: &str) -> u64 {
        self.state
            .read()
            .await
            .queries
            .get(node)
            .copied()
            .unwrap_or(0)
    }

    async fn enter(&self, node: &str) -> Result<()> {
        let delay = self.state.read().await.delays.get(node).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.read().await.unavailable.contains(node) {
            return Err(Error::NodeUnavailable {
                node: node.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NodeClient for MemoryNodeClient {
    async fn query_transaction(
        &self,
        node: &str,
        to: &str,
        sequence: u64,
    ) -> Result<Option<Transaction>> {
        self.enter(node).await?;
        let mut state = self.state.write().await;
        *state.queries.entry(node.to_string()).or_insert(0) += 1;
        Ok(state
            .transactions
            .get(&(node.to_string(), to.to_string(), sequence))
            .cloned())
    }

    async fn submit_transaction(&self, node: &str, to: &str, tx: &Transaction) -> Result<()> {
        self.enter(node).await?;
        let mut state = self.state.write().await;
        if state.rejecting.contains(node) {
            return Err(Error::NodeUnavailable {
                node: node.to_string(),
                reason: "transaction rejected".to_string(),
            });
        }
        state.submissions.push(Submission {
            node: node.to_string(),
            to: to.to_string(),
            transaction: tx.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_inserted() {
        let client = MemoryNodeClient::new();
        let tx = Transaction::new("qsc-a", "qos", 1, 10, vec![1]);
        client.insert("n1", tx.clone()).await;

        assert_eq!(client.query_transaction("n1", "qos", 1).await.unwrap(), Some(tx));
        assert_eq!(client.query_transaction("n1", "qos", 2).await.unwrap(), None);
        assert_eq!(client.query_transaction("n2", "qos", 1).await.unwrap(), None);
        assert_eq!(client.query_count("n1").await, 2);
    }

    #[tokio::test]
    async fn test_unavailable_node() {
        let client = MemoryNodeClient::new();
        client.set_unavailable("n1", true).await;
        assert!(client.query_transaction("n1", "qos", 1).await.is_err());

        client.set_unavailable("n1", false).await;
        assert!(client.query_transaction("n1", "qos", 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejecting_node() {
        let client = MemoryNodeClient::new();
        let tx = Transaction::new("qsc-a", "qos", 1, 10, vec![1]);
        client.set_rejecting("d1", true).await;

        assert!(client.submit_transaction("d1", "qos", &tx).await.is_err());
        assert!(client.submit_transaction("d2", "qos", &tx).await.is_ok());

        let submissions = client.submissions().await;
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].node, "d2");
    }
}

//! NodeClient trait definition.
//!
//! The relay talks to chain nodes only through this trait, addressed by node
//! endpoint string.

use crate::chain::transaction::Transaction;
use crate::core::Result;
use async_trait::async_trait;

/// Client for querying and submitting cross-chain transactions on chain nodes.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Query the transaction at `sequence` destined for chain `to`.
    ///
    /// Returns `Ok(None)` when the node has no transaction at that sequence yet.
    async fn query_transaction(
        &self,
        node: &str,
        to: &str,
        sequence: u64,
    ) -> Result<Option<Transaction>>;

    /// Submit a transaction to chain `to` through `node`.
    async fn submit_transaction(&self, node: &str, to: &str, tx: &Transaction) -> Result<()>;
}

//! Sequential failover across an ordered endpoint list.

use crate::core::{Error, ErrorKind, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Per-node failures collected while failing over.
pub type NodeFailures = Vec<(String, Error)>;

/// Try `attempt` on each node in order and stop at the first success.
///
/// Returns the winning node with its value, or every node's failure.
pub async fn first_success<T, F, Fut>(
    nodes: &[String],
    mut attempt: F,
) -> std::result::Result<(String, T), NodeFailures>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures = Vec::with_capacity(nodes.len());

    for node in nodes {
        debug!(node = %node, "attempting node");
        match attempt(node.clone()).await {
            Ok(value) => return Ok((node.clone(), value)),
            Err(err) => {
                log_node_failure(node, &err);
                failures.push((node.clone(), err));
            }
        }
    }

    Err(failures)
}

/// Bound a single node call by `timeout`; an elapsed call is [`Error::Timeout`].
pub async fn with_timeout<T>(
    node: &str,
    timeout: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(node.to_string())))
}

/// Fingerprint mismatches point at a faulty or malicious node.
pub(crate) fn log_node_failure(node: &str, err: &Error) {
    match err.kind() {
        ErrorKind::VerificationFailed => error!(node = %node, error = %err, "node served a transaction that failed verification"),
        ErrorKind::NotFound => debug!(node = %node, "node has no transaction yet"),
        _ => warn!(node = %node, error = %err, "node request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let mut tried = Vec::new();
        let result = first_success(&nodes(&["n1", "n2", "n3"]), |node| {
            tried.push(node.clone());
            async move {
                if node == "n1" {
                    Err(Error::Timeout(node))
                } else {
                    Ok(node.len())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), ("n2".to_string(), 2));
        assert_eq!(tried, vec!["n1", "n2"]);
    }

    #[tokio::test]
    async fn test_collects_every_failure() {
        let result: std::result::Result<(String, ()), _> =
            first_success(&nodes(&["n1", "n2"]), |node| async move {
                Err(Error::NodeUnavailable {
                    node,
                    reason: "down".into(),
                })
            })
            .await;

        let failures = result.unwrap_err();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[1].0, "n2");
    }

    #[tokio::test]
    async fn test_empty_node_list() {
        let result: std::result::Result<(String, ()), _> =
            first_success(&[], |_| async { Ok(()) }).await;
        assert!(result.unwrap_err().is_empty());
    }

    #[tokio::test]
    async fn test_timeout() {
        let result: Result<()> = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout(node)) if node == "slow"));
    }
}

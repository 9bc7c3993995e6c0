//! Quorum bookkeeping over node reports.
//!
//! Each sequence collects at most one fingerprint per reporting node. The
//! largest group of matching fingerprints wins once the configured policy is
//! satisfied; a tie between distinct fingerprints is a conflict.

use crate::config::QuorumPolicyConfig;
use crate::core::Fingerprint;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Decides whether corroborating reports outweigh the rest.
pub trait QuorumPolicy: Send + Sync + std::fmt::Debug {
    /// `success` corroborating reports against `failure` conflicting or failed ones.
    fn satisfied(&self, success: usize, failure: usize) -> bool;
}

/// Agreement once `success * 2 > failure`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TwoToOne;

impl QuorumPolicy for TwoToOne {
    fn satisfied(&self, success: usize, failure: usize) -> bool {
        success * 2 > failure
    }
}

/// Agreement on the first corroborating report.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstResponder;

impl QuorumPolicy for FirstResponder {
    fn satisfied(&self, success: usize, _failure: usize) -> bool {
        success >= 1
    }
}

/// Agreement once more than half of the configured nodes corroborate.
#[derive(Clone, Copy, Debug)]
pub struct StrictMajority {
    pub nodes: usize,
}

impl QuorumPolicy for StrictMajority {
    fn satisfied(&self, success: usize, _failure: usize) -> bool {
        success * 2 > self.nodes
    }
}

impl QuorumPolicyConfig {
    /// Instantiate the configured policy.
    pub fn build(&self) -> Arc<dyn QuorumPolicy> {
        match self {
            QuorumPolicyConfig::TwoToOne => Arc::new(TwoToOne),
            QuorumPolicyConfig::FirstResponder => Arc::new(FirstResponder),
            QuorumPolicyConfig::StrictMajority { nodes } => Arc::new(StrictMajority { nodes: *nodes }),
        }
    }
}

/// Outcome of recording a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Not enough corroboration yet
    Pending,
    /// Enough reports agree on this fingerprint
    Agreed(Fingerprint),
    /// Reports disagree and no fingerprint prevails
    Conflicted,
}

/// Grouped view of one sequence's reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tally {
    /// Fingerprint with the most reports
    pub leader: Fingerprint,
    /// Reports for the leader
    pub success: usize,
    /// Reports for any other fingerprint
    pub failure: usize,
    /// Whether another fingerprint has as many reports as the leader
    pub tied: bool,
    /// Number of distinct fingerprints
    pub distinct: usize,
}

/// Per-sequence report store for one channel.
#[derive(Debug)]
pub struct QuorumTracker {
    records: HashMap<u64, HashMap<String, Fingerprint>>,
    policy: Arc<dyn QuorumPolicy>,
}

impl QuorumTracker {
    /// Create a tracker with the given policy.
    pub fn new(policy: Arc<dyn QuorumPolicy>) -> Self {
        Self {
            records: HashMap::new(),
            policy,
        }
    }

    /// The policy in use.
    pub fn policy(&self) -> &Arc<dyn QuorumPolicy> {
        &self.policy
    }

    /// Record `node`'s fingerprint for `sequence` and re-evaluate agreement.
    ///
    /// A node's later report replaces its earlier one.
    pub fn record(&mut self, sequence: u64, node: &str, fingerprint: Fingerprint) -> Decision {
        self.records
            .entry(sequence)
            .or_default()
            .insert(node.to_string(), fingerprint);
        self.decide(sequence)
    }

    /// Current decision for `sequence` without recording anything.
    pub fn decide(&self, sequence: u64) -> Decision {
        let tally = match self.tally(sequence) {
            Some(tally) => tally,
            None => return Decision::Pending,
        };

        if tally.tied {
            Decision::Conflicted
        } else if self.policy.satisfied(tally.success, tally.failure) {
            Decision::Agreed(tally.leader)
        } else if tally.distinct > 1 {
            Decision::Conflicted
        } else {
            Decision::Pending
        }
    }

    /// Group the reports for `sequence` by fingerprint.
    pub fn tally(&self, sequence: u64) -> Option<Tally> {
        let reports = self.records.get(&sequence)?;

        let mut groups: BTreeMap<Fingerprint, usize> = BTreeMap::new();
        for fingerprint in reports.values() {
            *groups.entry(*fingerprint).or_insert(0) += 1;
        }

        let (leader, success) = groups
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(fp, count)| (*fp, *count))?;
        let tied = groups.values().filter(|count| **count == success).count() > 1;

        Some(Tally {
            leader,
            success,
            failure: reports.len() - success,
            tied,
            distinct: groups.len(),
        })
    }

    /// Drop every report for `sequence`.
    pub fn clear(&mut self, sequence: u64) {
        self.records.remove(&sequence);
    }

    /// Drop every report below `sequence`.
    pub fn clear_below(&mut self, sequence: u64) {
        self.records.retain(|seq, _| *seq >= sequence);
    }

    /// Reports recorded for `sequence`, by node.
    pub fn reports_for(&self, sequence: u64) -> Option<&HashMap<String, Fingerprint>> {
        self.records.get(&sequence)
    }

    /// Sequences with at least one report, ascending.
    pub fn pending_sequences(&self) -> Vec<u64> {
        let mut sequences: Vec<u64> = self.records.keys().copied().collect();
        sequences.sort_unstable();
        sequences
    }
}

impl Default for QuorumTracker {
    fn default() -> Self {
        Self::new(Arc::new(TwoToOne))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(byte: u8) -> Fingerprint {
        Fingerprint::new([byte; 32])
    }

    #[test]
    fn test_two_to_one_boundaries() {
        let policy = TwoToOne;
        assert!(policy.satisfied(3, 1));
        assert!(policy.satisfied(1, 1));
        assert!(!policy.satisfied(1, 2));
        assert!(policy.satisfied(2, 0));
        assert!(policy.satisfied(1, 0));
        assert!(!policy.satisfied(0, 0));
    }

    #[test]
    fn test_strict_majority() {
        let policy = StrictMajority { nodes: 3 };
        assert!(!policy.satisfied(1, 0));
        assert!(policy.satisfied(2, 1));
    }

    #[test]
    fn test_single_report_agrees_by_default() {
        let mut tracker = QuorumTracker::default();
        assert_eq!(tracker.record(7, "n1", fp(1)), Decision::Agreed(fp(1)));
        assert_eq!(tracker.record(7, "n2", fp(1)), Decision::Agreed(fp(1)));

        let tally = tracker.tally(7).unwrap();
        assert_eq!(tally.success, 2);
        assert_eq!(tally.failure, 0);
    }

    #[test]
    fn test_latest_report_per_node_wins() {
        let mut tracker = QuorumTracker::new(Arc::new(StrictMajority { nodes: 3 }));
        tracker.record(4, "n1", fp(1));
        tracker.record(4, "n1", fp(2));

        let reports = tracker.reports_for(4).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports["n1"], fp(2));
    }

    #[test]
    fn test_conflicting_reports() {
        let mut tracker = QuorumTracker::new(Arc::new(StrictMajority { nodes: 3 }));
        assert_eq!(tracker.record(8, "n1", fp(1)), Decision::Pending);
        assert_eq!(tracker.record(8, "n2", fp(2)), Decision::Conflicted);

        // a third node breaks the tie
        assert_eq!(tracker.record(8, "n3", fp(1)), Decision::Agreed(fp(1)));
    }

    #[test]
    fn test_tie_is_conflict_under_default_policy() {
        let mut tracker = QuorumTracker::default();
        tracker.record(8, "n1", fp(1));
        assert_eq!(tracker.record(8, "n2", fp(2)), Decision::Conflicted);
    }

    #[test]
    fn test_minority_outweighed() {
        let mut tracker = QuorumTracker::default();
        tracker.record(9, "n1", fp(1));
        tracker.record(9, "n2", fp(1));
        assert_eq!(tracker.record(9, "n3", fp(2)), Decision::Agreed(fp(1)));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut tracker = QuorumTracker::default();
        tracker.record(1, "n1", fp(1));
        tracker.record(2, "n1", fp(1));
        tracker.record(3, "n1", fp(1));

        tracker.clear(2);
        tracker.clear(2);
        assert_eq!(tracker.pending_sequences(), vec![1, 3]);
        assert_eq!(tracker.decide(2), Decision::Pending);

        tracker.clear_below(3);
        assert_eq!(tracker.pending_sequences(), vec![3]);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = QuorumPolicyConfig::FirstResponder.build();
        assert!(policy.satisfied(1, 5));
        let policy = QuorumPolicyConfig::StrictMajority { nodes: 4 }.build();
        assert!(!policy.satisfied(2, 0));
    }
}

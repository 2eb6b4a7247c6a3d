// SPDX-License-Identifier: MIT

//! Execution paths: independent traversal positions through a machine

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle status of a single execution path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStatus {
    Active,
    Waiting,
    Completed,
    Failed,
}

/// Why a path ended in [`PathStatus::Failed`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// No eligible edge and the node is not a valid exit
    DeadEnd { node: String },
    /// A node was entered more often than the configured ceiling
    BudgetExceeded { node: String, limit: u32 },
    /// Cancelled from outside
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::DeadEnd { node } => {
                write!(f, "dead end at '{node}': no eligible transition")
            }
            FailureReason::BudgetExceeded { node, limit } => {
                write!(f, "node '{node}' exceeded invocation ceiling of {limit}")
            }
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One traversed edge in a path's history
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Output attached when a waiting node was resumed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// A visit to a State-kind node
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub state: String,
    pub timestamp: DateTime<Utc>,
}

/// An independent position in the running machine.
///
/// Paths share the engine's variable context but carry their own history,
/// per-node invocation counts, and status. Forking clones all of that under
/// a fresh id.
#[derive(Debug, Clone, Serialize)]
pub struct Path {
    pub id: Uuid,
    pub current_node: String,
    pub status: PathStatus,
    pub history: Vec<HistoryEntry>,
    pub node_invocation_counts: HashMap<String, u32>,
    pub state_transitions: Vec<StateTransition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

impl Path {
    /// Start a fresh path at an entry node. The entry counts as the first
    /// invocation of that node but produces no history entry.
    pub fn start(entry: impl Into<String>) -> Self {
        let entry = entry.into();
        let mut counts = HashMap::new();
        counts.insert(entry.clone(), 1);
        Self {
            id: Uuid::new_v4(),
            current_node: entry,
            status: PathStatus::Active,
            history: Vec::new(),
            node_invocation_counts: counts,
            state_transitions: Vec::new(),
            failure: None,
        }
    }

    /// Clone this path under a new identity, keeping position and history
    pub fn fork(&self) -> Self {
        let mut clone = self.clone();
        clone.id = Uuid::new_v4();
        clone
    }

    pub fn is_active(&self) -> bool {
        self.status == PathStatus::Active
    }

    /// Completed, failed, or otherwise never stepping again
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, PathStatus::Completed | PathStatus::Failed)
    }

    /// Times the named node has been entered on this path
    pub fn invocation_count(&self, node: &str) -> u32 {
        self.node_invocation_counts.get(node).copied().unwrap_or(0)
    }

    pub(crate) fn record_transition(&mut self, from: &str, to: &str, label: Option<String>) {
        self.history.push(HistoryEntry {
            from: from.to_string(),
            to: to.to_string(),
            label,
            timestamp: Utc::now(),
            output: None,
        });
        self.current_node = to.to_string();
        *self
            .node_invocation_counts
            .entry(to.to_string())
            .or_insert(0) += 1;
    }

    pub(crate) fn record_state(&mut self, state: &str) {
        self.state_transitions.push(StateTransition {
            state: state.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        self.status = PathStatus::Failed;
        self.failure = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_counts_entry_without_history() {
        let path = Path::start("begin");
        assert_eq!(path.current_node, "begin");
        assert_eq!(path.status, PathStatus::Active);
        assert!(path.history.is_empty());
        assert_eq!(path.invocation_count("begin"), 1);
    }

    #[test]
    fn test_record_transition() {
        let mut path = Path::start("a");
        path.record_transition("a", "b", Some("go".to_string()));

        assert_eq!(path.current_node, "b");
        assert_eq!(path.history.len(), 1);
        assert_eq!(path.history[0].from, "a");
        assert_eq!(path.history[0].to, "b");
        assert_eq!(path.invocation_count("b"), 1);
    }

    #[test]
    fn test_repeated_visits_accumulate() {
        let mut path = Path::start("a");
        path.record_transition("a", "b", None);
        path.record_transition("b", "a", None);
        path.record_transition("a", "b", None);

        assert_eq!(path.invocation_count("a"), 2);
        assert_eq!(path.invocation_count("b"), 2);
        assert_eq!(path.history.len(), 3);
    }

    #[test]
    fn test_fork_gets_new_id_keeps_history() {
        let mut path = Path::start("a");
        path.record_transition("a", "b", None);

        let fork = path.fork();
        assert_ne!(fork.id, path.id);
        assert_eq!(fork.current_node, "b");
        assert_eq!(fork.history.len(), 1);
        assert_eq!(fork.invocation_count("b"), 1);
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut path = Path::start("a");
        path.fail(FailureReason::Cancelled);
        assert!(path.is_terminal());
        assert!(!path.is_active());
        assert_eq!(path.failure, Some(FailureReason::Cancelled));
    }

    #[test]
    fn test_failure_display() {
        let reason = FailureReason::BudgetExceeded {
            node: "retry".to_string(),
            limit: 3,
        };
        assert_eq!(
            reason.to_string(),
            "node 'retry' exceeded invocation ceiling of 3"
        );
    }
}

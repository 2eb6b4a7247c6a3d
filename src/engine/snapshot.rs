// SPDX-License-Identifier: MIT

//! Read-only projections of engine state

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::path::Path;

/// A point-in-time copy of the full execution state.
///
/// Owned data throughout, so a snapshot stays coherent while the engine
/// keeps mutating.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSnapshot {
    pub version: u64,
    pub context: Value,
    pub paths: Vec<Path>,
    pub error_count: u32,
}

/// How a node should be drawn by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Never entered by any path
    Pending,
    /// Entered before, no path currently here
    Visited,
    /// A failed path stopped here
    Failed,
    /// A live path is currently here
    Active,
}

impl NodeStatus {
    /// Active beats Failed beats Visited beats Pending
    fn rank(self) -> u8 {
        match self {
            NodeStatus::Pending => 0,
            NodeStatus::Visited => 1,
            NodeStatus::Failed => 2,
            NodeStatus::Active => 3,
        }
    }

    pub(crate) fn merge(self, other: NodeStatus) -> NodeStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// Per-node render info
#[derive(Debug, Clone, Serialize)]
pub struct NodeVisual {
    pub visit_count: u32,
    pub status: NodeStatus,
}

/// Aggregated view for renderers: node states plus live path ids.
///
/// When several paths disagree about a node, the highest-priority status
/// wins and visit counts are summed across paths.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationState {
    pub node_states: HashMap<String, NodeVisual>,
    pub active_paths: Vec<Uuid>,
    pub error_count: u32,
}

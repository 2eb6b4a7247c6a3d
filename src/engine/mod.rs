// SPDX-License-Identifier: MIT

//! Machine execution: paths, the tick engine, and snapshot projections

#[allow(clippy::module_inception)]
mod engine;
mod path;
mod snapshot;

pub use engine::{Engine, EngineConfig};
pub use path::{FailureReason, HistoryEntry, Path, PathStatus, StateTransition};
pub use snapshot::{ExecutionSnapshot, NodeStatus, NodeVisual, VisualizationState};

// SPDX-License-Identifier: MIT

//! The machine graph data model
//!
//! Nodes, edges, the [`Machine`] container, and a loader for structured
//! definition files. The model is immutable once loaded; runtime state lives
//! in the execution engine.

pub mod edge;
pub mod loader;
#[allow(clippy::module_inception)]
mod machine;
pub mod node;

pub use edge::{expand_chain, ArrowKind, Edge};
pub use loader::{MachineDef, MachineLoader};
pub use machine::Machine;
pub use node::{Annotation, Attribute, Node, NodeKind};

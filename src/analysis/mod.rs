// SPDX-License-Identifier: MIT

//! Static structural analysis of machine graphs
//!
//! Entry/exit discovery, reachability, orphan detection, cycle detection,
//! and pathfinding. Everything here works on the immutable model and never
//! touches execution state.

mod adjacency;
mod analyzer;
mod validate;

pub use adjacency::Adjacency;
pub use analyzer::Analyzer;
pub use validate::ValidationReport;

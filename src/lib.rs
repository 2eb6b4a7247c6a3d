// SPDX-License-Identifier: MIT

//! machina-rs: a declarative machine graph engine
//!
//! A machine is a typed node/edge graph describing a workflow. This crate
//! loads machine definitions, statically analyzes their structure, and
//! executes them: guard expressions on edges route one or more concurrent
//! paths through the graph against a shared variable context.
//!
//! The three subsystems are independent layers:
//! - [`expr`]: guard expression parsing/evaluation and `{{...}}` templates
//! - [`machine`] and [`analysis`]: the immutable model and its analyzer
//! - [`engine`]: the multi-path tick engine with snapshot projections

pub mod analysis;
pub mod engine;
pub mod error;
pub mod expr;
pub mod machine;

pub use analysis::{Analyzer, ValidationReport};
pub use engine::{Engine, EngineConfig, Path, PathStatus};
pub use error::MachinaError;
pub use expr::VariableContext;
pub use machine::{Machine, MachineLoader};

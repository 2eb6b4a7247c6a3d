// SPDX-License-Identifier: MIT

//! Typed error handling for machina-rs
//!
//! Errors are layered: `ModelError` covers machine construction,
//! `ExpressionError` covers guard/template parsing and evaluation, and
//! `EngineError` is the only class that aborts an execution step. Structural
//! findings (unreachable nodes, cycles, orphans) are not errors at all; they
//! are collected in a [`ValidationReport`](crate::analysis::ValidationReport).

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for machina-rs
#[derive(Debug, Error)]
pub enum MachinaError {
    /// Machine model construction errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Guard/template expression errors
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// Execution engine faults
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper for compatibility
    #[error("{0}")]
    Other(String),
}

/// Errors raised while assembling a [`Machine`](crate::machine::Machine)
/// from a loaded definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Two nodes share the same name
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    /// An edge references a node that does not exist
    #[error("Edge endpoint '{0}' is not a declared node")]
    UnknownEndpoint(String),

    /// A node's parent is not a declared node
    #[error("Node '{node}' has unknown parent '{parent}'")]
    UnknownParent { node: String, parent: String },

    /// A node's parent chain loops back on itself
    #[error("Parent chain of node '{0}' is cyclic")]
    ParentCycle(String),

    /// An edge statement had neither a source/target pair nor a chain
    #[error("Edge declaration is missing endpoints")]
    MissingEndpoints,
}

/// Errors from the guard/template expression grammar.
///
/// These are always recoverable at the guard-evaluation boundary: a guard
/// that fails to parse makes its edge ineligible, it never aborts a step.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpressionError {
    /// The input could not be parsed as an expression
    #[error("Could not parse expression: {fragment}")]
    Parse { fragment: String },

    /// A token appeared where it was not expected
    #[error("Unexpected token '{token}' in expression: {fragment}")]
    UnexpectedToken { token: String, fragment: String },

    /// A string literal was never closed
    #[error("Unterminated string literal in expression: {fragment}")]
    UnterminatedString { fragment: String },

    /// Input ended mid-expression
    #[error("Unexpected end of expression: {fragment}")]
    UnexpectedEnd { fragment: String },
}

/// Hard faults from the execution engine control surface.
///
/// Unlike guard failures or path-local failures, these indicate a
/// model/engine mismatch and propagate to the caller of `step()`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A transition targeted a node absent from the machine
    #[error("Transition target '{0}' does not exist in the machine")]
    UnknownNode(String),

    /// The requested entry node does not exist or is not executable
    #[error("Invalid entry node: {0}")]
    InvalidEntry(String),

    /// `start()` was called on a machine with no Init node
    #[error("Machine has no entry point")]
    NoEntryPoint,

    /// An operation referenced an unknown path id
    #[error("No path with id {0}")]
    PathNotFound(Uuid),

    /// `resume()` was called on a path that is not Waiting
    #[error("Path {0} is not waiting")]
    NotWaiting(Uuid),
}

// SPDX-License-Identifier: MIT

//! Machine definition loader
//!
//! Loads an already-structured machine definition (YAML or JSON) into a
//! [`Machine`]. This is model deserialization only; parsing a textual
//! machine grammar is the job of an external parser.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::edge::{expand_chain, ArrowKind, Edge};
use super::machine::Machine;
use super::node::Node;
use crate::error::{MachinaError, ModelError};

/// A machine definition as read from a file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MachineDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
}

/// An edge statement: either a plain source/target pair or a multi-segment
/// chain whose head fans out to several targets.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeDef {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub chain: Option<Vec<ChainSegment>>,
    #[serde(default)]
    pub arrow: ArrowKind,
    #[serde(default)]
    pub label: Option<String>,
    /// Explicit guard; when absent, a `when:` label prefix is used
    #[serde(default)]
    pub when: Option<String>,
}

/// One segment of a chain statement: a single node or a fan-out list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChainSegment {
    Single(String),
    Many(Vec<String>),
}

impl ChainSegment {
    fn to_vec(&self) -> Vec<String> {
        match self {
            ChainSegment::Single(s) => vec![s.clone()],
            ChainSegment::Many(v) => v.clone(),
        }
    }
}

/// Loads machine definitions from YAML/JSON files
pub struct MachineLoader;

impl MachineLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a machine from a definition file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Machine, MachinaError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a machine from a YAML (or JSON) definition string
    pub fn parse_yaml(content: &str) -> Result<Machine, MachinaError> {
        let def: MachineDef = serde_yaml::from_str(content)?;
        build(&def)
    }
}

impl Default for MachineLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a parsed definition into a checked [`Machine`]
pub fn build(def: &MachineDef) -> Result<Machine, MachinaError> {
    let mut edges = Vec::new();

    for edge_def in &def.edges {
        match (&edge_def.chain, &edge_def.source, &edge_def.target) {
            (Some(chain), _, _) => {
                let segments: Vec<Vec<String>> = chain.iter().map(ChainSegment::to_vec).collect();
                let start = edges.len();
                edges.extend(expand_chain(
                    &segments,
                    edge_def.arrow,
                    edge_def.label.as_deref(),
                ));
                // An explicit `when` overrides any label-derived guard
                if let Some(when) = &edge_def.when {
                    for edge in &mut edges[start..] {
                        edge.guard = Some(when.clone());
                    }
                }
            }
            (None, Some(source), Some(target)) => {
                let guard = edge_def.when.clone().or_else(|| {
                    edge_def.label.as_deref().and_then(Edge::guard_from_label)
                });
                edges.push(Edge {
                    source: source.clone(),
                    target: target.clone(),
                    arrow: edge_def.arrow,
                    label: edge_def.label.clone(),
                    guard,
                });
            }
            _ => return Err(ModelError::MissingEndpoints.into()),
        }
    }

    log::info!(
        "Loaded machine '{}' with {} nodes and {} edges",
        def.name,
        def.nodes.len(),
        edges.len()
    );

    Ok(Machine::new(def.name.clone(), def.nodes.clone(), edges)?)
}

// SPDX-License-Identifier: MIT

//! The machine container: the loaded node/edge graph definition

use std::collections::{HashMap, HashSet};

use serde_json::json;

use super::edge::{ArrowKind, Edge};
use super::node::{Node, NodeKind};
use crate::error::ModelError;
use crate::expr::VariableContext;

/// A loaded machine graph: nodes, edges, lookup index.
///
/// Immutable after construction. Construction checks referential integrity
/// of edge endpoints and parent links, and that no parent chain is cyclic.
#[derive(Debug, Clone)]
pub struct Machine {
    name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<String, usize>,
}

impl Machine {
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<Self, ModelError> {
        let mut index = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.name.clone(), i).is_some() {
                return Err(ModelError::DuplicateNode(node.name.clone()));
            }
        }

        for edge in &edges {
            if !index.contains_key(&edge.source) {
                return Err(ModelError::UnknownEndpoint(edge.source.clone()));
            }
            if !index.contains_key(&edge.target) {
                return Err(ModelError::UnknownEndpoint(edge.target.clone()));
            }
        }

        for node in &nodes {
            if let Some(parent) = &node.parent {
                if !index.contains_key(parent) {
                    return Err(ModelError::UnknownParent {
                        node: node.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        check_parent_chains(&nodes, &index)?;

        Ok(Self {
            name: name.into(),
            nodes,
            edges,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in declaration order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in declaration order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Init-kind nodes in declaration order
    pub fn init_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Init)
    }

    /// Outgoing edges of a node in declaration order.
    ///
    /// Bidirectional edges are traversable from either endpoint; the second
    /// element is the effective target seen from `name`. Edges into
    /// non-executable nodes (Note/Style) are excluded from traversal.
    pub fn outgoing(&self, name: &str) -> Vec<(&Edge, &str)> {
        self.edges
            .iter()
            .filter_map(|edge| {
                if edge.source == name {
                    Some((edge, edge.target.as_str()))
                } else if edge.arrow == ArrowKind::Bidirectional && edge.target == name {
                    Some((edge, edge.source.as_str()))
                } else {
                    None
                }
            })
            .filter(|(_, target)| {
                self.node(target).is_some_and(|n| n.kind.is_executable())
            })
            .collect()
    }

    /// True if the node is a flow terminal: no outgoing edges and not a
    /// Context-kind data sink.
    pub fn is_exit_point(&self, name: &str) -> bool {
        match self.node(name) {
            Some(node) => node.kind != NodeKind::Context && self.outgoing(name).is_empty(),
            None => false,
        }
    }

    /// Build the static preview context from declared attribute defaults.
    ///
    /// Used by external renderers outside execution: zero error count, empty
    /// active state, and every declared attribute value under
    /// `<node>.<attribute>`.
    pub fn static_context(&self) -> VariableContext {
        let mut ctx = VariableContext::new();
        ctx.set("errorCount", json!(0));
        ctx.set("activeState", json!(""));

        for node in &self.nodes {
            for attr in &node.attributes {
                ctx.set(&format!("{}.{}", node.name, attr.name), attr.value.clone());
            }
        }
        ctx
    }
}

/// Walk every parent chain; a revisited name means a cycle
fn check_parent_chains(nodes: &[Node], index: &HashMap<String, usize>) -> Result<(), ModelError> {
    for node in nodes {
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(node.name.as_str());
        let mut current = node.parent.as_deref();

        while let Some(parent) = current {
            if !seen.insert(parent) {
                return Err(ModelError::ParentCycle(node.name.clone()));
            }
            current = index
                .get(parent)
                .and_then(|&i| nodes[i].parent.as_deref());
        }
    }
    Ok(())
}

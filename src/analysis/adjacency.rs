// SPDX-License-Identifier: MIT

//! Adjacency construction for structural analysis

use std::collections::HashMap;

use crate::machine::{ArrowKind, Machine};

/// Forward and reverse adjacency over the executable nodes of a machine.
///
/// Neighbor lists are ordered by edge declaration and duplicate-free.
/// Note/Style decorations are excluded entirely; bidirectional edges are
/// treated as two directed edges.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    forward: HashMap<String, Vec<String>>,
    reverse: HashMap<String, Vec<String>>,
}

impl Adjacency {
    pub fn build(machine: &Machine) -> Self {
        let mut forward: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<String>> = HashMap::new();

        // Every executable node gets an entry so lookups distinguish
        // "no neighbors" from "not a node".
        for node in machine.nodes() {
            if node.kind.is_executable() {
                forward.entry(node.name.clone()).or_default();
                reverse.entry(node.name.clone()).or_default();
            }
        }

        let executable = |name: &str| {
            machine
                .node(name)
                .is_some_and(|n| n.kind.is_executable())
        };

        for edge in machine.edges() {
            if !executable(&edge.source) || !executable(&edge.target) {
                continue;
            }
            push_unique(&mut forward, &edge.source, &edge.target);
            push_unique(&mut reverse, &edge.target, &edge.source);

            if edge.arrow == ArrowKind::Bidirectional {
                push_unique(&mut forward, &edge.target, &edge.source);
                push_unique(&mut reverse, &edge.source, &edge.target);
            }
        }

        Self { forward, reverse }
    }

    /// Directly reachable neighbors of a node, in declaration order
    pub fn neighbors(&self, name: &str) -> &[String] {
        self.forward.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes with an edge into `name`, in declaration order
    pub fn incoming(&self, name: &str) -> &[String] {
        self.reverse.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if the node participates in the adjacency at all
    pub fn contains(&self, name: &str) -> bool {
        self.forward.contains_key(name)
    }
}

fn push_unique(map: &mut HashMap<String, Vec<String>>, from: &str, to: &str) {
    let list = map.entry(from.to_string()).or_default();
    if !list.iter().any(|n| n == to) {
        list.push(to.to_string());
    }
}

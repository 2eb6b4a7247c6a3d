// SPDX-License-Identifier: MIT

//! Structural queries over a machine graph
//!
//! All analyses are O(V+E) except [`Analyzer::find_longest_path`], which is
//! deliberately the naive entry×exit search: workflow graphs are tens to low
//! hundreds of nodes, and BFS termination keeps it correct even with cycles.

use std::collections::{HashMap, HashSet, VecDeque};

use super::adjacency::Adjacency;
use super::validate::ValidationReport;
use crate::machine::{Machine, NodeKind};

/// Static analyzer over a loaded machine.
pub struct Analyzer<'a> {
    machine: &'a Machine,
    adjacency: Adjacency,
}

impl<'a> Analyzer<'a> {
    pub fn new(machine: &'a Machine) -> Self {
        Self {
            machine,
            adjacency: Adjacency::build(machine),
        }
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Entry points: Init-kind nodes plus nodes with no incoming edges.
    ///
    /// Context nodes are data sinks and excluded from entry/exit accounting.
    /// Multiple entry points are legal; validation reports them as a warning.
    pub fn entry_points(&self) -> Vec<String> {
        self.machine
            .nodes()
            .iter()
            .filter(|n| n.kind.is_executable() && n.kind != NodeKind::Context)
            .filter(|n| {
                n.kind == NodeKind::Init || self.adjacency.incoming(&n.name).is_empty()
            })
            .map(|n| n.name.clone())
            .collect()
    }

    /// Exit points: nodes with no outgoing edges that are not Context-kind
    pub fn exit_points(&self) -> Vec<String> {
        self.machine
            .nodes()
            .iter()
            .filter(|n| n.kind.is_executable() && n.kind != NodeKind::Context)
            .filter(|n| self.adjacency.neighbors(&n.name).is_empty())
            .map(|n| n.name.clone())
            .collect()
    }

    /// Nodes not reachable from any Init node.
    ///
    /// Seeded only from true Init nodes, not the broader no-incoming-edge
    /// entry set: a node that merely lacks inbound edges is not an intended
    /// start. Context nodes are excluded from reachability accounting.
    pub fn unreachable_nodes(&self) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        for init in self.machine.init_nodes() {
            if visited.insert(&init.name) {
                queue.push_back(&init.name);
            }
        }
        while let Some(node) = queue.pop_front() {
            for next in self.adjacency.neighbors(node) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        self.machine
            .nodes()
            .iter()
            .filter(|n| n.kind.is_executable() && n.kind != NodeKind::Context)
            .filter(|n| !visited.contains(n.name.as_str()))
            .map(|n| n.name.clone())
            .collect()
    }

    /// Nodes with no incoming and no outgoing edges, excluding Init and
    /// Context kinds
    pub fn orphaned_nodes(&self) -> Vec<String> {
        self.machine
            .nodes()
            .iter()
            .filter(|n| {
                n.kind.is_executable()
                    && n.kind != NodeKind::Init
                    && n.kind != NodeKind::Context
            })
            .filter(|n| {
                self.adjacency.incoming(&n.name).is_empty()
                    && self.adjacency.neighbors(&n.name).is_empty()
            })
            .map(|n| n.name.clone())
            .collect()
    }

    /// Find cycles by depth-first search with an explicit stack.
    ///
    /// When a neighbor is already on the recursion stack, the reported cycle
    /// is the stack slice from that neighbor to the current node, closed
    /// with the repeated entry node (a self-loop on `a` reports `[a, a]`).
    /// Duplicate cycles discovered from different roots are not deduplicated.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut finished: HashSet<String> = HashSet::new();

        for root in self.machine.nodes() {
            if !root.kind.is_executable() || finished.contains(&root.name) {
                continue;
            }

            // (node, next neighbor index) frames instead of recursion;
            // adversarially deep graphs must not grow the call stack.
            let mut stack: Vec<(String, usize)> = vec![(root.name.clone(), 0)];
            let mut on_stack: HashSet<String> = HashSet::new();
            on_stack.insert(root.name.clone());

            while let Some(frame) = stack.last_mut() {
                let (node, index) = (frame.0.clone(), frame.1);
                let neighbors = self.adjacency.neighbors(&node);
                if index >= neighbors.len() {
                    on_stack.remove(&node);
                    finished.insert(node);
                    stack.pop();
                    continue;
                }
                frame.1 += 1;
                let next = neighbors[index].clone();

                if on_stack.contains(&next) {
                    if let Some(position) = stack.iter().position(|(n, _)| *n == next) {
                        let mut cycle: Vec<String> =
                            stack[position..].iter().map(|(n, _)| n.clone()).collect();
                        cycle.push(next);
                        cycles.push(cycle);
                    }
                } else if !finished.contains(&next) {
                    on_stack.insert(next.clone());
                    stack.push((next, 0));
                }
            }
        }

        cycles
    }

    /// Shortest path by edge count (breadth-first); empty means no path
    pub fn find_path(&self, source: &str, target: &str) -> Vec<String> {
        if !self.adjacency.contains(source) || !self.adjacency.contains(target) {
            return Vec::new();
        }
        if source == target {
            return vec![source.to_string()];
        }

        let mut predecessor: HashMap<&str, &str> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(source);
        queue.push_back(source);

        while let Some(node) = queue.pop_front() {
            for next in self.adjacency.neighbors(node) {
                if visited.insert(next) {
                    predecessor.insert(next, node);
                    if next == target {
                        return rebuild_path(&predecessor, source, target);
                    }
                    queue.push_back(next);
                }
            }
        }

        Vec::new()
    }

    /// The longest shortest-path between any (entry, exit) pair.
    ///
    /// Empty if there are no entry or no exit points.
    pub fn find_longest_path(&self) -> Vec<String> {
        let mut longest = Vec::new();
        for entry in self.entry_points() {
            for exit in self.exit_points() {
                let path = self.find_path(&entry, &exit);
                if path.len() > longest.len() {
                    longest = path;
                }
            }
        }
        longest
    }

    /// Collect the full structural report.
    ///
    /// Unreachable and orphaned nodes, or a missing entry point, make the
    /// graph invalid. Cycles and multiple entry points are warnings only:
    /// intentional loops (retry loops) are tolerated by design.
    pub fn validate(&self) -> ValidationReport {
        let unreachable = self.unreachable_nodes();
        let orphaned = self.orphaned_nodes();
        let cycles = self.detect_cycles();
        let entries = self.entry_points();
        let exits = self.exit_points();

        let mut warnings = Vec::new();
        if entries.len() > 1 {
            warnings.push(format!(
                "multiple entry points: {}",
                entries.join(", ")
            ));
        }
        if exits.is_empty() {
            warnings.push("no exit points".to_string());
        }
        if !cycles.is_empty() {
            warnings.push(format!("{} cycle(s) detected", cycles.len()));
        }

        ValidationReport {
            valid: unreachable.is_empty() && orphaned.is_empty() && !entries.is_empty(),
            unreachable,
            orphaned,
            cycles,
            missing_entry: entries.is_empty(),
            missing_exit: exits.is_empty(),
            warnings,
        }
    }
}

fn rebuild_path(
    predecessor: &HashMap<&str, &str>,
    source: &str,
    target: &str,
) -> Vec<String> {
    let mut path = vec![target.to_string()];
    let mut current = target;
    while current != source {
        match predecessor.get(current) {
            Some(prev) => {
                path.push(prev.to_string());
                current = prev;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

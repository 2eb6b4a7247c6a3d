// SPDX-License-Identifier: MIT

//! Edge types for the machine graph

use serde::{Deserialize, Serialize};

/// The arrow kind of an edge.
///
/// Purely advisory metadata for renderers, with one exception:
/// `Bidirectional` edges are traversable in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowKind {
    #[default]
    Plain,
    Dependency,
    Thick,
    Bidirectional,
    Inheritance,
    Composition,
    Aggregation,
}

/// A directed edge between two nodes, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub arrow: ArrowKind,
    /// Raw edge label as written in the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Guard condition; absence means the edge is unconditionally eligible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            arrow: ArrowKind::Plain,
            label: None,
            guard: None,
        }
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn with_arrow(mut self, arrow: ArrowKind) -> Self {
        self.arrow = arrow;
        self
    }

    /// Extract a `when: <expr>` guard from an edge label.
    ///
    /// Labels without the prefix carry no guard.
    pub fn guard_from_label(label: &str) -> Option<String> {
        let trimmed = label.trim();
        let trimmed = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(trimmed);
        let expr = trimmed.trim().strip_prefix("when:")?.trim();
        if expr.is_empty() {
            None
        } else {
            Some(expr.to_string())
        }
    }
}

/// Expand a multi-segment edge statement into atomic edges.
///
/// Chain semantics: each consecutive pair of segments contributes one edge
/// per (source, target) combination, and the previous segment's targets
/// become the next segment's sources. There is no cross product beyond
/// adjacent segments.
pub fn expand_chain(segments: &[Vec<String>], arrow: ArrowKind, label: Option<&str>) -> Vec<Edge> {
    let guard = label.and_then(Edge::guard_from_label);
    let mut edges = Vec::new();

    for pair in segments.windows(2) {
        for source in &pair[0] {
            for target in &pair[1] {
                edges.push(Edge {
                    source: source.clone(),
                    target: target.clone(),
                    arrow,
                    label: label.map(str::to_string),
                    guard: guard.clone(),
                });
            }
        }
    }

    edges
}

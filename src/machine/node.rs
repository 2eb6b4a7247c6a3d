// SPDX-License-Identifier: MIT

//! Node types for the machine graph

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of a node, fixed at load time.
///
/// `Note` and `Style` are non-executable decorations: they never participate
/// in traversal or reachability. `Context` nodes are data sinks whose
/// attribute values the engine writes into the shared variable context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Init,
    Task,
    State,
    Context,
    Tool,
    Note,
    Style,
}

impl NodeKind {
    /// True for kinds that participate in traversal and reachability
    pub fn is_executable(&self) -> bool {
        !matches!(self, NodeKind::Note | NodeKind::Style)
    }
}

/// A declared attribute: name, optional declared type, value
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// An annotation: name with an optional value
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A node in the machine graph.
///
/// Created once when the graph is loaded and immutable thereafter; runtime
/// values of Context-node attributes live in the engine's variable context,
/// not here.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Node {
    /// Unique name within the machine (dotted path implied by nesting)
    pub name: String,
    pub kind: NodeKind,
    /// Nesting parent; the parent chain must be acyclic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Optional human title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Node {
    /// Create a node with no parent, title, attributes or annotations
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            title: None,
            attributes: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Look up an annotation by name
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }

    /// True if an annotation with the given name is present
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

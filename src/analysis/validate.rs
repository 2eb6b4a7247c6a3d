// SPDX-License-Identifier: MIT

//! Validation report produced by the analyzer

use serde::Serialize;

/// The outcome of a full structural validation pass.
///
/// `valid` means the graph has no unreachable nodes, no orphans, and at
/// least one entry point. Cycles and multiple entries only warn.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub unreachable: Vec<String>,
    pub orphaned: Vec<String>,
    pub cycles: Vec<Vec<String>>,
    pub missing_entry: bool,
    pub missing_exit: bool,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// One-line human summary for logs and CLI output
    pub fn summary(&self) -> String {
        if self.valid && self.warnings.is_empty() {
            return "valid".to_string();
        }
        let mut parts = Vec::new();
        if !self.valid {
            parts.push("invalid".to_string());
        }
        if !self.unreachable.is_empty() {
            parts.push(format!("{} unreachable", self.unreachable.len()));
        }
        if !self.orphaned.is_empty() {
            parts.push(format!("{} orphaned", self.orphaned.len()));
        }
        if self.missing_entry {
            parts.push("no entry point".to_string());
        }
        if !self.warnings.is_empty() {
            parts.push(format!("{} warning(s)", self.warnings.len()));
        }
        parts.join(", ")
    }
}

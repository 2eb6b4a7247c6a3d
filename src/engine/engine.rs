// SPDX-License-Identifier: MIT

//! The multi-path execution engine
//!
//! Drives one or more [`Path`]s through a [`Machine`] in discrete ticks.
//! All paths share one variable context; guards are evaluated against it
//! when a path leaves a node, and a node with several eligible edges forks
//! the path. The engine is a single-writer structure: all mutation happens
//! through `&mut self`, and snapshots give renderers owned copies.

use serde_json::{json, Value};
use uuid::Uuid;

use super::path::{FailureReason, Path, PathStatus};
use super::snapshot::{ExecutionSnapshot, NodeStatus, NodeVisual, VisualizationState};
use crate::error::EngineError;
use crate::expr::{self, VariableContext};
use crate::machine::{Machine, NodeKind};

/// Runtime limits for an engine instance
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Maximum times a single path may enter the same node
    pub invocation_ceiling: u32,
    /// Live (active or waiting) path cap; forks past this are dropped
    pub max_live_paths: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            invocation_ceiling: 100,
            max_live_paths: 64,
        }
    }
}

/// The execution engine for one machine.
#[derive(Debug)]
pub struct Engine {
    machine: Machine,
    config: EngineConfig,
    context: VariableContext,
    paths: Vec<Path>,
    version: u64,
    error_count: u32,
}

impl Engine {
    pub fn new(machine: Machine) -> Self {
        Self::with_config(machine, EngineConfig::default())
    }

    pub fn with_config(machine: Machine, config: EngineConfig) -> Self {
        let context = machine.static_context();
        Self {
            machine,
            config,
            context,
            paths: Vec::new(),
            version: 0,
            error_count: 0,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn context(&self) -> &VariableContext {
        &self.context
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn path(&self, id: Uuid) -> Option<&Path> {
        self.paths.iter().find(|p| p.id == id)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// True while at least one path can still take a step
    pub fn has_active_paths(&self) -> bool {
        self.paths.iter().any(Path::is_active)
    }

    /// Start a new path.
    ///
    /// With an explicit entry the node must exist and be either Init-kind or
    /// free of incoming edges. Without one, the first Init node is used.
    pub fn start(&mut self, entry: Option<&str>) -> Result<Uuid, EngineError> {
        let entry = match entry {
            Some(name) => {
                let node = self
                    .machine
                    .node(name)
                    .ok_or_else(|| EngineError::UnknownNode(name.to_string()))?;
                let has_incoming = self.machine.edges().iter().any(|e| e.target == name);
                if !node.kind.is_executable() || node.kind != NodeKind::Init && has_incoming {
                    return Err(EngineError::InvalidEntry(name.to_string()));
                }
                name.to_string()
            }
            None => self
                .machine
                .init_nodes()
                .next()
                .map(|n| n.name.clone())
                .ok_or(EngineError::NoEntryPoint)?,
        };

        let path = Path::start(&entry);
        let id = path.id;
        self.paths.push(path);
        self.apply_entry_effects(self.paths.len() - 1);
        log::info!("Started path {} at '{}'", id, entry);
        self.bump();
        Ok(id)
    }

    /// Advance every active path by one transition.
    ///
    /// The set of paths to step is fixed at the start of the tick, so forks
    /// created during the tick first move on the next one.
    pub fn step(&mut self) -> Result<(), EngineError> {
        let ids: Vec<Uuid> = self
            .paths
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.id)
            .collect();

        for id in ids {
            self.step_path(id)?;
        }
        Ok(())
    }

    /// Run until no path is active or `max_ticks` is reached. Returns the
    /// number of ticks taken.
    pub fn run(&mut self, max_ticks: u32) -> Result<u32, EngineError> {
        let mut ticks = 0;
        while self.has_active_paths() && ticks < max_ticks {
            self.step()?;
            ticks += 1;
        }
        Ok(ticks)
    }

    /// Wake a waiting path, optionally attaching the external output that
    /// arrived. The output lands on the last history entry and in the shared
    /// context under `output.<node>`. A path waiting at its start node has
    /// no history yet; its output is then observable in the context only.
    pub fn resume(&mut self, id: Uuid, output: Option<&str>) -> Result<(), EngineError> {
        let path = self
            .paths
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EngineError::PathNotFound(id))?;
        if path.status != PathStatus::Waiting {
            return Err(EngineError::NotWaiting(id));
        }

        path.status = PathStatus::Active;
        let node = path.current_node.clone();
        if let Some(output) = output {
            if let Some(last) = path.history.last_mut() {
                last.output = Some(output.to_string());
            }
            self.context
                .set(&format!("output.{node}"), json!(output));
        }
        log::info!("Resumed path {} at '{}'", id, node);
        self.bump();
        Ok(())
    }

    /// Cancel a non-terminal path
    pub fn cancel(&mut self, id: Uuid) -> Result<(), EngineError> {
        let path = self
            .paths
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EngineError::PathNotFound(id))?;
        if !path.is_terminal() {
            path.fail(FailureReason::Cancelled);
            log::info!("Cancelled path {}", id);
            self.bump();
        }
        Ok(())
    }

    /// Drop completed and failed paths; returns how many were removed
    pub fn prune_terminal(&mut self) -> usize {
        let before = self.paths.len();
        self.paths.retain(|p| !p.is_terminal());
        let removed = before - self.paths.len();
        if removed > 0 {
            self.bump();
        }
        removed
    }

    /// Write a variable into the shared context
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.context.set(name, value);
        self.bump();
    }

    /// Owned point-in-time copy of the full execution state
    pub fn snapshot(&self) -> ExecutionSnapshot {
        ExecutionSnapshot {
            version: self.version,
            context: self.context.to_json(),
            paths: self.paths.clone(),
            error_count: self.error_count,
        }
    }

    /// Aggregate per-node view for renderers
    pub fn visualization_state(&self) -> VisualizationState {
        let mut node_states: std::collections::HashMap<String, NodeVisual> = self
            .machine
            .nodes()
            .iter()
            .filter(|n| n.kind.is_executable())
            .map(|n| {
                (
                    n.name.clone(),
                    NodeVisual {
                        visit_count: 0,
                        status: NodeStatus::Pending,
                    },
                )
            })
            .collect();

        for path in &self.paths {
            for (node, count) in &path.node_invocation_counts {
                if let Some(visual) = node_states.get_mut(node) {
                    visual.visit_count += count;
                    visual.status = visual.status.merge(NodeStatus::Visited);
                }
            }
            let here = match path.status {
                PathStatus::Active | PathStatus::Waiting => NodeStatus::Active,
                PathStatus::Failed => NodeStatus::Failed,
                PathStatus::Completed => NodeStatus::Visited,
            };
            if let Some(visual) = node_states.get_mut(&path.current_node) {
                visual.status = visual.status.merge(here);
            }
        }

        VisualizationState {
            node_states,
            active_paths: self
                .paths
                .iter()
                .filter(|p| !p.is_terminal())
                .map(|p| p.id)
                .collect(),
            error_count: self.error_count,
        }
    }

    fn step_path(&mut self, id: Uuid) -> Result<(), EngineError> {
        let Some(index) = self.paths.iter().position(|p| p.id == id) else {
            return Err(EngineError::PathNotFound(id));
        };
        if !self.paths[index].is_active() {
            return Ok(());
        }
        let current = self.paths[index].current_node.clone();
        if !self.machine.contains(&current) {
            return Err(EngineError::UnknownNode(current));
        }

        let eligible = self.eligible_edges(&current);

        if eligible.is_empty() {
            if self.machine.is_exit_point(&current) {
                self.paths[index].status = PathStatus::Completed;
                log::info!("Path {} completed at '{}'", id, current);
            } else {
                self.record_error();
                self.paths[index].fail(FailureReason::DeadEnd {
                    node: current.clone(),
                });
                log::warn!("Path {} dead-ended at '{}'", id, current);
            }
            self.bump();
            return Ok(());
        }

        // One fork per extra eligible edge, cloned before anyone moves
        let mut forks: Vec<(Path, String, Option<String>)> = Vec::new();
        let mut live = self.paths.iter().filter(|p| !p.is_terminal()).count();
        for (target, label) in eligible.iter().skip(1) {
            if live >= self.config.max_live_paths {
                log::warn!(
                    "Dropping fork at '{}': live path cap {} reached",
                    current,
                    self.config.max_live_paths
                );
                continue;
            }
            forks.push((self.paths[index].fork(), target.clone(), label.clone()));
            live += 1;
        }

        let (first_target, first_label) = eligible[0].clone();
        self.transition(index, &current, &first_target, first_label);

        for (fork, target, label) in forks {
            log::info!("Forked path {} from {} at '{}'", fork.id, id, current);
            self.paths.push(fork);
            let fork_index = self.paths.len() - 1;
            self.transition(fork_index, &current, &target, label);
        }

        self.bump();
        Ok(())
    }

    /// Outgoing edges whose guard holds, in declaration order. A guard that
    /// fails to parse makes its edge ineligible and counts as an error.
    fn eligible_edges(&mut self, current: &str) -> Vec<(String, Option<String>)> {
        let candidates: Vec<(String, Option<String>, Option<String>)> = self
            .machine
            .outgoing(current)
            .into_iter()
            .map(|(edge, target)| (target.to_string(), edge.label.clone(), edge.guard.clone()))
            .collect();

        let mut eligible = Vec::new();
        let mut guard_errors = 0;
        for (target, label, guard) in candidates {
            match guard {
                None => eligible.push((target, label)),
                Some(guard) => match expr::evaluate_condition(&guard, &self.context) {
                    Ok(true) => eligible.push((target, label)),
                    Ok(false) => {}
                    Err(err) => {
                        guard_errors += 1;
                        log::warn!(
                            "Guard '{}' on {} -> {} failed to parse: {}",
                            guard,
                            current,
                            target,
                            err
                        );
                    }
                },
            }
        }
        for _ in 0..guard_errors {
            self.record_error();
        }
        eligible
    }

    /// Move one path across one edge and apply node-entry effects
    fn transition(&mut self, index: usize, from: &str, to: &str, label: Option<String>) {
        self.paths[index].record_transition(from, to, label);

        let count = self.paths[index].invocation_count(to);
        if count > self.config.invocation_ceiling {
            self.record_error();
            self.paths[index].fail(FailureReason::BudgetExceeded {
                node: to.to_string(),
                limit: self.config.invocation_ceiling,
            });
            log::warn!(
                "Path {} exceeded invocation ceiling at '{}' ({} entries)",
                self.paths[index].id,
                to,
                count
            );
            return;
        }

        self.apply_entry_effects(index);
    }

    /// Effects of arriving at a node: state tracking, context writes, waits
    fn apply_entry_effects(&mut self, index: usize) {
        let name = self.paths[index].current_node.clone();
        let Some(node) = self.machine.node(&name) else {
            return;
        };

        match node.kind {
            NodeKind::State => {
                self.paths[index].record_state(&node.name);
                self.context.set("activeState", json!(node.name));
            }
            NodeKind::Context => {
                for attr in &node.attributes {
                    self.context
                        .set(&format!("{}.{}", node.name, attr.name), attr.value.clone());
                }
            }
            _ => {}
        }

        if node.has_annotation("wait") {
            self.paths[index].status = PathStatus::Waiting;
            log::info!("Path {} waiting at '{}'", self.paths[index].id, node.name);
        }
    }

    fn record_error(&mut self) {
        self.error_count += 1;
        self.context.set("errorCount", json!(self.error_count));
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachineLoader;

    fn machine(yaml: &str) -> Machine {
        MachineLoader::parse_yaml(yaml).unwrap()
    }

    fn linear() -> Machine {
        machine(
            r#"
name: linear
nodes:
  - { name: start, kind: init }
  - { name: work, kind: task }
  - { name: done, kind: task }
edges:
  - { source: start, target: work }
  - { source: work, target: done }
"#,
        )
    }

    #[test]
    fn test_start_default_entry() {
        let mut engine = Engine::new(linear());
        let id = engine.start(None).unwrap();

        let path = engine.path(id).unwrap();
        assert_eq!(path.current_node, "start");
        assert_eq!(path.status, PathStatus::Active);
        assert_eq!(path.invocation_count("start"), 1);
        assert!(path.history.is_empty());
    }

    #[test]
    fn test_start_unknown_entry() {
        let mut engine = Engine::new(linear());
        assert_eq!(
            engine.start(Some("ghost")),
            Err(EngineError::UnknownNode("ghost".to_string()))
        );
    }

    #[test]
    fn test_start_rejects_mid_graph_entry() {
        let mut engine = Engine::new(linear());
        assert_eq!(
            engine.start(Some("work")),
            Err(EngineError::InvalidEntry("work".to_string()))
        );
    }

    #[test]
    fn test_start_without_init() {
        let m = machine(
            r#"
name: no_init
nodes:
  - { name: a, kind: task }
edges: []
"#,
        );
        let mut engine = Engine::new(m);
        assert_eq!(engine.start(None), Err(EngineError::NoEntryPoint));
    }

    #[test]
    fn test_linear_run_completes() {
        let mut engine = Engine::new(linear());
        let id = engine.start(None).unwrap();
        engine.run(10).unwrap();

        let path = engine.path(id).unwrap();
        assert_eq!(path.status, PathStatus::Completed);
        assert_eq!(path.current_node, "done");
        // start -> work -> done is two transitions
        assert_eq!(path.history.len(), 2);
        assert!(!engine.has_active_paths());
    }

    #[test]
    fn test_guard_selects_edge() {
        let m = machine(
            r#"
name: guarded
nodes:
  - { name: start, kind: init }
  - { name: ok, kind: task }
  - { name: retry, kind: task }
edges:
  - { source: start, target: ok, when: "errorCount == 0" }
  - { source: start, target: retry, when: "errorCount > 0" }
"#,
        );
        let mut engine = Engine::new(m);
        let id = engine.start(None).unwrap();
        engine.run(10).unwrap();

        let path = engine.path(id).unwrap();
        assert_eq!(path.current_node, "ok");
        assert_eq!(path.status, PathStatus::Completed);
        assert_eq!(engine.paths().len(), 1);
    }

    #[test]
    fn test_guard_routes_on_variable() {
        let m = machine(
            r#"
name: guarded
nodes:
  - { name: start, kind: init }
  - { name: ok, kind: task }
  - { name: retry, kind: task }
edges:
  - { source: start, target: ok, when: "errorCount == 0" }
  - { source: start, target: retry, when: "errorCount > 0" }
"#,
        );
        let mut engine = Engine::new(m);
        let id = engine.start(None).unwrap();
        engine.set_variable("errorCount", json!(5));
        engine.run(10).unwrap();

        assert_eq!(engine.path(id).unwrap().current_node, "retry");
    }

    #[test]
    fn test_all_guards_false_dead_ends() {
        let m = machine(
            r#"
name: stuck
nodes:
  - { name: start, kind: init }
  - { name: next, kind: task }
edges:
  - { source: start, target: next, when: "ready == true" }
"#,
        );
        let mut engine = Engine::new(m);
        let id = engine.start(None).unwrap();
        engine.step().unwrap();

        let path = engine.path(id).unwrap();
        assert_eq!(path.status, PathStatus::Failed);
        assert!(matches!(
            path.failure,
            Some(FailureReason::DeadEnd { ref node }) if node == "start"
        ));
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.context().get("errorCount"), Some(&json!(1)));
    }

    #[test]
    fn test_unparseable_guard_counts_error_and_blocks_edge() {
        let m = machine(
            r#"
name: broken
nodes:
  - { name: start, kind: init }
  - { name: a, kind: task }
  - { name: b, kind: task }
edges:
  - { source: start, target: a, when: "((" }
  - { source: start, target: b }
"#,
        );
        let mut engine = Engine::new(m);
        let id = engine.start(None).unwrap();
        engine.step().unwrap();

        assert_eq!(engine.path(id).unwrap().current_node, "b");
        assert_eq!(engine.error_count(), 1);
    }

    #[test]
    fn test_fork_on_multiple_eligible_edges() {
        let m = machine(
            r#"
name: fanout
nodes:
  - { name: start, kind: init }
  - { name: a, kind: task }
  - { name: b, kind: task }
  - { name: c, kind: task }
edges:
  - { source: start, target: a }
  - { source: start, target: b }
  - { source: start, target: c }
"#,
        );
        let mut engine = Engine::new(m);
        let original = engine.start(None).unwrap();
        engine.step().unwrap();

        assert_eq!(engine.paths().len(), 3);
        // Original takes the first edge in declaration order
        assert_eq!(engine.path(original).unwrap().current_node, "a");
        let positions: Vec<&str> = engine
            .paths()
            .iter()
            .map(|p| p.current_node.as_str())
            .collect();
        assert!(positions.contains(&"b"));
        assert!(positions.contains(&"c"));
        // Forks share the pre-branch history
        for path in engine.paths() {
            assert_eq!(path.history.len(), 1);
            assert_eq!(path.history[0].from, "start");
        }
    }

    #[test]
    fn test_fork_cap_drops_excess() {
        let m = machine(
            r#"
name: fanout
nodes:
  - { name: start, kind: init }
  - { name: a, kind: task }
  - { name: b, kind: task }
  - { name: c, kind: task }
edges:
  - { source: start, target: a }
  - { source: start, target: b }
  - { source: start, target: c }
"#,
        );
        let mut engine = Engine::with_config(
            m,
            EngineConfig {
                max_live_paths: 2,
                ..Default::default()
            },
        );
        engine.start(None).unwrap();
        engine.step().unwrap();
        assert_eq!(engine.paths().len(), 2);
    }

    #[test]
    fn test_invocation_ceiling() {
        let m = machine(
            r#"
name: pingpong
nodes:
  - { name: a, kind: init }
  - { name: b, kind: task }
edges:
  - { source: a, target: b }
  - { source: b, target: a }
"#,
        );
        let mut engine = Engine::with_config(
            m,
            EngineConfig {
                invocation_ceiling: 3,
                ..Default::default()
            },
        );
        let id = engine.start(None).unwrap();
        engine.run(100).unwrap();

        let path = engine.path(id).unwrap();
        assert_eq!(path.status, PathStatus::Failed);
        assert!(matches!(
            path.failure,
            Some(FailureReason::BudgetExceeded { ref node, limit: 3 }) if node == "a"
        ));
        // a entered 4 times: the start plus three returns
        assert_eq!(path.invocation_count("a"), 4);
        assert_eq!(path.invocation_count("b"), 3);
    }

    #[test]
    fn test_state_node_updates_active_state() {
        let m = machine(
            r#"
name: states
nodes:
  - { name: start, kind: init }
  - { name: reviewing, kind: state }
edges:
  - { source: start, target: reviewing }
"#,
        );
        let mut engine = Engine::new(m);
        let id = engine.start(None).unwrap();
        engine.step().unwrap();

        assert_eq!(engine.context().get("activeState"), Some(&json!("reviewing")));
        let path = engine.path(id).unwrap();
        assert_eq!(path.state_transitions.len(), 1);
        assert_eq!(path.state_transitions[0].state, "reviewing");
    }

    #[test]
    fn test_context_node_writes_attributes() {
        let m = machine(
            r#"
name: ctx
nodes:
  - { name: start, kind: init }
  - name: Config
    kind: context
    attributes:
      - { name: retries, type: number, value: 3 }
  - { name: done, kind: task }
edges:
  - { source: start, target: Config }
  - { source: Config, target: done }
"#,
        );
        let mut engine = Engine::new(m);
        engine.start(None).unwrap();
        // Clobber the statically seeded default; entering the Context node
        // must restore the declared value.
        engine.set_variable("Config.retries", json!(0));
        assert_eq!(engine.context().get("Config.retries"), Some(&json!(0)));
        engine.step().unwrap();

        assert_eq!(engine.context().get("Config.retries"), Some(&json!(3)));
    }

    #[test]
    fn test_wait_and_resume() {
        let m = machine(
            r#"
name: waiting
nodes:
  - { name: start, kind: init }
  - name: approval
    kind: task
    annotations:
      - { name: wait }
  - { name: done, kind: task }
edges:
  - { source: start, target: approval }
  - { source: approval, target: done }
"#,
        );
        let mut engine = Engine::new(m);
        let id = engine.start(None).unwrap();
        engine.step().unwrap();

        assert_eq!(engine.path(id).unwrap().status, PathStatus::Waiting);

        // Waiting paths do not move on their own
        engine.step().unwrap();
        assert_eq!(engine.path(id).unwrap().current_node, "approval");

        engine.resume(id, Some("approved")).unwrap();
        let path = engine.path(id).unwrap();
        assert_eq!(path.status, PathStatus::Active);
        assert_eq!(path.history.last().unwrap().output, Some("approved".to_string()));
        assert_eq!(
            engine.context().get("output.approval"),
            Some(&json!("approved"))
        );

        engine.run(10).unwrap();
        assert_eq!(engine.path(id).unwrap().current_node, "done");
    }

    #[test]
    fn test_resume_at_waiting_entry_node() {
        let m = machine(
            r#"
name: gated
nodes:
  - name: gate
    kind: init
    annotations:
      - { name: wait }
  - { name: done, kind: task }
edges:
  - { source: gate, target: done }
"#,
        );
        let mut engine = Engine::new(m);
        let id = engine.start(None).unwrap();
        assert_eq!(engine.path(id).unwrap().status, PathStatus::Waiting);

        // No transition has happened yet, so the output has no history entry
        // to attach to; it is still observable in the shared context.
        engine.resume(id, Some("go")).unwrap();
        let path = engine.path(id).unwrap();
        assert_eq!(path.status, PathStatus::Active);
        assert!(path.history.is_empty());
        assert_eq!(engine.context().get("output.gate"), Some(&json!("go")));

        engine.run(10).unwrap();
        assert_eq!(engine.path(id).unwrap().current_node, "done");
    }

    #[test]
    fn test_resume_non_waiting_rejected() {
        let mut engine = Engine::new(linear());
        let id = engine.start(None).unwrap();
        assert_eq!(engine.resume(id, None), Err(EngineError::NotWaiting(id)));

        let ghost = Uuid::new_v4();
        assert_eq!(
            engine.resume(ghost, None),
            Err(EngineError::PathNotFound(ghost))
        );
    }

    #[test]
    fn test_cancel() {
        let mut engine = Engine::new(linear());
        let id = engine.start(None).unwrap();
        engine.cancel(id).unwrap();

        let path = engine.path(id).unwrap();
        assert_eq!(path.status, PathStatus::Failed);
        assert_eq!(path.failure, Some(FailureReason::Cancelled));

        // Cancelling twice is a no-op
        engine.cancel(id).unwrap();
    }

    #[test]
    fn test_prune_terminal() {
        let mut engine = Engine::new(linear());
        engine.start(None).unwrap();
        engine.start(None).unwrap();
        engine.run(10).unwrap();

        assert_eq!(engine.prune_terminal(), 2);
        assert!(engine.paths().is_empty());
    }

    #[test]
    fn test_version_advances_on_mutation() {
        let mut engine = Engine::new(linear());
        let v0 = engine.version();
        engine.start(None).unwrap();
        let v1 = engine.version();
        assert!(v1 > v0);
        engine.step().unwrap();
        assert!(engine.version() > v1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut engine = Engine::new(linear());
        engine.start(None).unwrap();
        let snapshot = engine.snapshot();
        engine.run(10).unwrap();

        assert_eq!(snapshot.paths[0].current_node, "start");
        assert!(snapshot.version < engine.version());
    }

    #[test]
    fn test_visualization_state() {
        let mut engine = Engine::new(linear());
        engine.start(None).unwrap();
        engine.step().unwrap();

        let vis = engine.visualization_state();
        assert_eq!(vis.node_states["work"].status, NodeStatus::Active);
        assert_eq!(vis.node_states["start"].status, NodeStatus::Visited);
        assert_eq!(vis.node_states["done"].status, NodeStatus::Pending);
        assert_eq!(vis.node_states["work"].visit_count, 1);
        assert_eq!(vis.active_paths.len(), 1);
    }
}

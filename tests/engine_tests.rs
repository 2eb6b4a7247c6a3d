// SPDX-License-Identifier: MIT

//! End-to-end tests: load a machine definition, analyze it, run it

use proptest::prelude::*;
use serde_json::json;

use machina_rs::analysis::Analyzer;
use machina_rs::engine::{Engine, EngineConfig, FailureReason, PathStatus};
use machina_rs::expr::{self, VariableContext};
use machina_rs::machine::{Edge, Machine, MachineLoader, Node, NodeKind};

fn load(yaml: &str) -> Machine {
    MachineLoader::parse_yaml(yaml).unwrap()
}

const REVIEW_MACHINE: &str = r#"
name: review
nodes:
  - { name: Submitted, kind: init }
  - { name: Review, kind: state }
  - { name: Approved, kind: task }
  - { name: Rejected, kind: task }
edges:
  - { source: Submitted, target: Review }
  - { source: Review, target: Approved, when: "errorCount == 0" }
  - { source: Review, target: Rejected, when: "errorCount > 0" }
"#;

#[test]
fn entry_points_are_init_or_sourceless() {
    let machine = load(
        r#"
name: entries
nodes:
  - { name: begin, kind: init }
  - { name: floating, kind: task }
  - { name: sink, kind: task }
edges:
  - { source: begin, target: sink }
  - { source: floating, target: sink }
"#,
    );
    let analyzer = Analyzer::new(&machine);
    let entries = analyzer.entry_points();

    for entry in &entries {
        let node = machine.node(entry).unwrap();
        let has_incoming = machine.edges().iter().any(|e| &e.target == entry);
        assert!(node.kind == NodeKind::Init || !has_incoming);
    }
    assert_eq!(entries, vec!["begin", "floating"]);
}

#[test]
fn unreachable_nodes_have_no_init_path() {
    let machine = load(
        r#"
name: islands
nodes:
  - { name: begin, kind: init }
  - { name: reached, kind: task }
  - { name: island, kind: task }
  - { name: downstream, kind: task }
edges:
  - { source: begin, target: reached }
  - { source: island, target: downstream }
"#,
    );
    let analyzer = Analyzer::new(&machine);
    let unreachable = analyzer.unreachable_nodes();
    assert_eq!(unreachable, vec!["island", "downstream"]);

    // Soundness: no reported node has a path from any init node
    for node in &unreachable {
        assert!(analyzer.find_path("begin", node).is_empty());
    }
}

#[test]
fn self_loop_reports_closed_cycle() {
    let machine = load(
        r#"
name: loop
nodes:
  - { name: a, kind: task }
edges:
  - { source: a, target: a }
"#,
    );
    let cycles = Analyzer::new(&machine).detect_cycles();
    assert_eq!(cycles, vec![vec!["a", "a"]]);
}

#[test]
fn guard_routes_to_approved_when_clean() {
    let mut engine = Engine::new(load(REVIEW_MACHINE));
    let id = engine.start(None).unwrap();
    engine.run(10).unwrap();

    let path = engine.path(id).unwrap();
    assert_eq!(path.status, PathStatus::Completed);
    assert_eq!(path.current_node, "Approved");
    assert_eq!(engine.context().get("activeState"), Some(&json!("Review")));
}

#[test]
fn guard_routes_to_rejected_on_errors() {
    let mut engine = Engine::new(load(REVIEW_MACHINE));
    let id = engine.start(None).unwrap();
    engine.set_variable("errorCount", json!(5));
    engine.run(10).unwrap();

    let path = engine.path(id).unwrap();
    assert_eq!(path.status, PathStatus::Completed);
    assert_eq!(path.current_node, "Rejected");
}

#[test]
fn history_records_every_transition() {
    let machine = load(
        r#"
name: chain
nodes:
  - { name: n0, kind: init }
  - { name: n1, kind: task }
  - { name: n2, kind: task }
  - { name: n3, kind: task }
  - { name: n4, kind: task }
edges:
  - { source: n0, target: n1 }
  - { source: n1, target: n2 }
  - { source: n2, target: n3 }
  - { source: n3, target: n4 }
"#,
    );
    let mut engine = Engine::new(machine);
    let id = engine.start(None).unwrap();
    engine.run(10).unwrap();

    let path = engine.path(id).unwrap();
    assert_eq!(path.history.len(), 4);
    for (i, entry) in path.history.iter().enumerate() {
        assert_eq!(entry.from, format!("n{}", i));
        assert_eq!(entry.to, format!("n{}", i + 1));
    }
    // Timestamps never go backwards
    for pair in path.history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[test]
fn fork_spawns_one_path_per_eligible_edge() {
    let machine = load(
        r#"
name: fanout
nodes:
  - { name: hub, kind: init }
  - { name: a, kind: task }
  - { name: b, kind: task }
  - { name: c, kind: task }
  - { name: d, kind: task }
edges:
  - { source: hub, target: a }
  - { source: hub, target: b }
  - { source: hub, target: c }
  - { source: hub, target: d }
"#,
    );
    let mut engine = Engine::new(machine);
    let original = engine.start(None).unwrap();
    engine.step().unwrap();

    assert_eq!(engine.paths().len(), 4);
    assert_eq!(engine.path(original).unwrap().current_node, "a");

    let mut positions: Vec<&str> = engine
        .paths()
        .iter()
        .map(|p| p.current_node.as_str())
        .collect();
    positions.sort_unstable();
    assert_eq!(positions, vec!["a", "b", "c", "d"]);

    // Every fork carries the shared prefix but a distinct id
    let mut ids: Vec<_> = engine.paths().iter().map(|p| p.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[test]
fn ping_pong_trips_invocation_ceiling() {
    let machine = load(
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
        machine,
        EngineConfig {
            invocation_ceiling: 3,
            ..Default::default()
        },
    );
    let id = engine.start(None).unwrap();
    engine.run(1000).unwrap();

    let path = engine.path(id).unwrap();
    assert_eq!(path.status, PathStatus::Failed);
    assert!(matches!(
        path.failure,
        Some(FailureReason::BudgetExceeded { ref node, limit: 3 }) if node == "a"
    ));
    assert!(engine.error_count() > 0);
}

#[test]
fn template_resolution() {
    let mut ctx = VariableContext::new();
    ctx.set("name", json!("Ada"));

    assert_eq!(expr::resolve_template("Hello {{name}}", &ctx), "Hello Ada");
    // Unresolvable spans stay verbatim
    assert_eq!(expr::resolve_template("{{missing}}", &ctx), "{{missing}}");
}

#[test]
fn nested_context_values_route_guards() {
    let machine = load(
        r#"
name: nested
nodes:
  - { name: start, kind: init }
  - name: Requirements
    kind: context
    attributes:
      - { name: needsCustomTool, type: boolean, value: true }
  - { name: build_tool, kind: tool }
  - { name: reuse, kind: task }
edges:
  - { source: start, target: Requirements }
  - { source: Requirements, target: build_tool, when: "Requirements.needsCustomTool" }
  - { source: Requirements, target: reuse, when: "!Requirements.needsCustomTool" }
"#,
    );
    let mut engine = Engine::new(machine);
    let id = engine.start(None).unwrap();
    engine.run(10).unwrap();

    assert_eq!(engine.path(id).unwrap().current_node, "build_tool");
}

#[test]
fn snapshot_round_trips_to_json() {
    let mut engine = Engine::new(load(REVIEW_MACHINE));
    engine.start(None).unwrap();
    engine.run(10).unwrap();

    let text = serde_json::to_string(&engine.snapshot()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["error_count"], json!(0));
    assert_eq!(value["paths"][0]["status"], json!("completed"));
    assert_eq!(value["context"]["activeState"], json!("Review"));
}

#[test]
fn validation_accepts_review_machine() {
    let machine = load(REVIEW_MACHINE);
    let report = Analyzer::new(&machine).validate();
    assert!(report.valid);
    assert!(report.cycles.is_empty());
    assert!(!report.missing_exit);
}

fn chain_machine(names: &[String], extra_edges: &[(usize, usize)]) -> Machine {
    let nodes: Vec<Node> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            Node::new(
                name,
                if i == 0 { NodeKind::Init } else { NodeKind::Task },
            )
        })
        .collect();
    let mut edges: Vec<Edge> = names
        .windows(2)
        .map(|pair| Edge::new(&pair[0], &pair[1]))
        .collect();
    for &(from, to) in extra_edges {
        edges.push(Edge::new(&names[from % names.len()], &names[to % names.len()]));
    }
    Machine::new("generated", nodes, edges).unwrap()
}

proptest! {
    // Forward-only extra edges can never make a chain cyclic
    #[test]
    fn prop_forward_chains_are_acyclic(len in 2usize..12, seed in 0usize..100) {
        let names: Vec<String> = (0..len).map(|i| format!("n{i}")).collect();
        let from = seed % (len - 1);
        let to = from + 1 + seed % (len - from - 1);
        let machine = chain_machine(&names, &[(from, to)]);
        let analyzer = Analyzer::new(&machine);

        prop_assert!(analyzer.detect_cycles().is_empty());
        prop_assert!(analyzer.unreachable_nodes().is_empty());
    }

    // A linear chain always runs to completion with len-1 transitions
    #[test]
    fn prop_linear_chain_completes(len in 2usize..10) {
        let names: Vec<String> = (0..len).map(|i| format!("n{i}")).collect();
        let machine = chain_machine(&names, &[]);
        let mut engine = Engine::new(machine);
        let id = engine.start(None).unwrap();
        engine.run(len as u32 + 1).unwrap();

        let path = engine.path(id).unwrap();
        prop_assert_eq!(&path.status, &PathStatus::Completed);
        prop_assert_eq!(path.history.len(), len - 1);
        prop_assert_eq!(path.current_node.as_str(), names[len - 1].as_str());
    }

    // Duplicate edges never produce duplicate neighbors
    #[test]
    fn prop_adjacency_dedups(len in 2usize..8, dup in 0usize..6) {
        let names: Vec<String> = (0..len).map(|i| format!("n{i}")).collect();
        let dup_edge = (dup % (len - 1), dup % (len - 1) + 1);
        let machine = chain_machine(&names, &[dup_edge]);
        let analyzer = Analyzer::new(&machine);

        for name in &names {
            let neighbors = analyzer.adjacency().neighbors(name);
            let mut sorted: Vec<&String> = neighbors.iter().collect();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), neighbors.len());
        }
    }
}

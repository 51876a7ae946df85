//! End-to-end executor scenarios: pipelines, fan-out, readiness gating,
//! batch independence, and failure surfacing.

use std::collections::HashMap;
use std::time::Duration;

use batchdag_runtime::{
    BodyError, Cell, Executor, ExecutorConfig, Graph, GraphNode, MiniBatch, Placement, PortMap,
    RuntimeError,
};

/// A CPU node mapping one input port to one output port through `f`.
fn map_node(
    input: &'static str,
    output: &'static str,
    f: impl Fn(f64) -> f64 + Send + Sync + 'static,
) -> GraphNode {
    let mut node = GraphNode::with_body(Placement::Cpu, move |inputs: &PortMap, outputs| {
        let v = inputs[input].as_f64()?;
        outputs.insert(output.to_string(), Cell::F64(f(v)));
        Ok(())
    });
    node.add_input(input, Cell::default());
    node.add_output(output, Cell::default());
    node
}

fn seed(entries: &[(&str, &[f64])]) -> HashMap<String, MiniBatch> {
    entries
        .iter()
        .map(|(name, values)| {
            (
                name.to_string(),
                values.iter().map(|&v| Cell::F64(v)).collect(),
            )
        })
        .collect()
}

fn f64s(batch: &MiniBatch) -> Vec<f64> {
    batch.iter().map(|cell| cell.as_f64().unwrap()).collect()
}

fn assert_f64s(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-12, "{actual:?} vs {expected:?}");
    }
}

/// S1: multiply then divide over one batch of three cells.
#[test]
fn linear_pipeline_single_batch() {
    let mut graph = Graph::new();
    let multiply = graph.add_node(map_node("multiplyin", "multiplyout", |v| v * 2.0));
    let divide = graph.add_node(map_node("multiplyout", "divideout", |v| v / 10.0));
    assert!(graph.add_edge(multiply, divide));

    let mut exec = Executor::new(graph, vec![seed(&[("multiplyin", &[1.0, 2.0, 3.0])])]);
    let stats = exec.run().unwrap();
    assert_eq!(stats.executed_tasks, 2);

    let out = exec.graph().mini_batch(divide, 0, "divideout").unwrap();
    assert_f64s(&f64s(&out), &[0.2, 0.4, 0.6]);
}

/// The upstream's published outputs land, by content, in the downstream's
/// input slot.
#[test]
fn propagation_matches_upstream_output() {
    let mut graph = Graph::new();
    let multiply = graph.add_node(map_node("multiplyin", "multiplyout", |v| v * 2.0));
    let divide = graph.add_node(map_node("multiplyout", "divideout", |v| v / 10.0));
    graph.add_edge(multiply, divide);

    let mut exec = Executor::new(graph, vec![seed(&[("multiplyin", &[1.0, 2.0])])]);
    exec.run().unwrap();

    let published = exec
        .graph()
        .mini_batch(multiply, 0, "multiplyout")
        .unwrap()
        .clone();
    let received = exec
        .graph()
        .mini_batch(divide, 0, "multiplyout")
        .unwrap()
        .clone();
    assert_eq!(published, received);
    assert_f64s(&f64s(&published), &[2.0, 4.0]);
}

/// S4: two batches through the S1 pipeline stay independent.
#[test]
fn batches_do_not_cross_contaminate() {
    let mut graph = Graph::new();
    let multiply = graph.add_node(map_node("multiplyin", "multiplyout", |v| v * 2.0));
    let divide = graph.add_node(map_node("multiplyout", "divideout", |v| v / 10.0));
    graph.add_edge(multiply, divide);

    let inputs = vec![
        seed(&[("multiplyin", &[1.0])]),
        seed(&[("multiplyin", &[5.0])]),
    ];
    let mut exec = Executor::new(graph, inputs);
    let stats = exec.run().unwrap();
    assert_eq!(stats.executed_tasks, 4);

    let first = exec.graph().mini_batch(divide, 0, "divideout").unwrap().clone();
    let second = exec.graph().mini_batch(divide, 1, "divideout").unwrap().clone();
    assert_f64s(&f64s(&first), &[0.2]);
    assert_f64s(&f64s(&second), &[1.0]);
}

/// S5: a seeded source fans out to two sinks with different bodies.
#[test]
fn fan_out_to_independent_sinks() {
    let mut graph = Graph::new();
    let source = graph.add_node({
        let mut node = GraphNode::new(Placement::Cpu);
        node.add_output("r", Cell::default());
        node
    });
    let plus_one = graph.add_node(map_node("r", "out", |v| v + 1.0));
    let times_ten = graph.add_node(map_node("r", "out", |v| v * 10.0));
    assert!(graph.add_edge(source, plus_one));
    assert!(graph.add_edge(source, times_ten));

    let mut exec = Executor::new(graph, vec![seed(&[("r", &[3.0])])]);
    exec.run().unwrap();

    let left = exec.graph().mini_batch(plus_one, 0, "out").unwrap().clone();
    let right = exec.graph().mini_batch(times_ten, 0, "out").unwrap().clone();
    assert_f64s(&f64s(&left), &[4.0]);
    assert_f64s(&f64s(&right), &[30.0]);
}

/// S6: a join node executes only after both parents have published, whatever
/// order the workers pop tasks in.
#[test]
fn join_waits_for_both_parents() {
    let mut graph = Graph::new();
    let left = graph.add_node(map_node("seed_a", "a", |v| v));
    let right = graph.add_node(map_node("seed_b", "b", |v| v));
    let join = graph.add_node({
        let mut node = GraphNode::with_body(Placement::Cpu, |inputs: &PortMap, outputs| {
            let a = inputs["a"].as_f64()?;
            let b = inputs["b"].as_f64()?;
            outputs.insert("sum".to_string(), Cell::F64(a + b));
            Ok(())
        });
        node.add_input("a", Cell::default());
        node.add_input("b", Cell::default());
        node.add_output("sum", Cell::default());
        node
    });
    assert!(graph.add_edge(left, join));
    assert!(graph.add_edge(right, join));

    let inputs = vec![seed(&[("seed_a", &[2.0]), ("seed_b", &[3.0])])];
    let mut exec = Executor::with_config(
        graph,
        inputs,
        ExecutorConfig {
            workers: 4,
            ..ExecutorConfig::default()
        },
    );
    exec.run().unwrap();

    let sum = exec.graph().mini_batch(join, 0, "sum").unwrap();
    assert_f64s(&f64s(&sum), &[5.0]);
}

#[test]
fn empty_graph_returns_immediately() {
    let mut exec = Executor::new(Graph::new(), Vec::new());
    let stats = exec.run().unwrap();
    assert_eq!(stats.executed_tasks, 0);
    assert_eq!(stats.requeues, 0);
}

#[test]
fn single_root_runs_alone() {
    let mut graph = Graph::new();
    let multiply = graph.add_node(map_node("multiplyin", "multiplyout", |v| v * 2.0));

    let mut exec = Executor::new(graph, vec![seed(&[("multiplyin", &[1.0, 2.0, 3.0])])]);
    let stats = exec.run().unwrap();
    assert_eq!(stats.executed_tasks, 1);

    let out = exec.graph().mini_batch(multiply, 0, "multiplyout").unwrap();
    assert_f64s(&f64s(&out), &[2.0, 4.0, 6.0]);
}

/// A failing body cancels the run and surfaces as the returned error.
#[test]
fn body_failure_is_surfaced() {
    let mut graph = Graph::new();
    let failing = graph.add_node({
        let mut node = GraphNode::with_body(Placement::Cpu, |_: &PortMap, _: &mut PortMap| {
            Err(BodyError::Custom("device unavailable".to_string()))
        });
        node.add_input("in", Cell::default());
        node.add_output("out", Cell::default());
        node
    });

    let mut exec = Executor::new(graph, vec![seed(&[("in", &[1.0])])]);
    let err = exec.run().unwrap_err();
    match err {
        RuntimeError::Body {
            node_id, batch_id, ..
        } => {
            assert_eq!(node_id, failing);
            assert_eq!(batch_id, 0);
        }
        other => panic!("expected body error, got {other}"),
    }
}

/// A variant mismatch inside a body is a body failure, not a hang.
#[test]
fn variant_mismatch_is_surfaced() {
    let mut graph = Graph::new();
    graph.add_node(map_node("in", "out", |v| v));

    let inputs = vec![HashMap::from([(
        "in".to_string(),
        MiniBatch::from_cells(vec![Cell::Text("not a float".to_string())]),
    )])];
    let mut exec = Executor::new(graph, inputs);
    let err = exec.run().unwrap_err();
    assert!(matches!(err, RuntimeError::Body { .. }));
}

/// Ragged input columns on a join node are rejected.
#[test]
fn ragged_inputs_are_surfaced() {
    let mut graph = Graph::new();
    let join = graph.add_node({
        let mut node = GraphNode::new(Placement::Cpu);
        node.add_input("a", Cell::default());
        node.add_input("b", Cell::default());
        node.add_output("out", Cell::default());
        node
    });

    let inputs = vec![seed(&[("a", &[1.0, 2.0]), ("b", &[5.0])])];
    let mut exec = Executor::new(graph, inputs);
    let err = exec.run().unwrap_err();
    match err {
        RuntimeError::RaggedInputs { node_id, batch_id } => {
            assert_eq!(node_id, join);
            assert_eq!(batch_id, 0);
        }
        other => panic!("expected ragged-inputs error, got {other}"),
    }
}

/// A task whose inputs never arrive trips the watchdog instead of spinning
/// forever.
#[test]
fn unsatisfiable_readiness_stalls_out() {
    let mut graph = Graph::new();
    graph.add_node(map_node("never_seeded", "out", |v| v));

    let cfg = ExecutorConfig {
        workers: 2,
        watchdog_interval: Duration::from_millis(10),
        stall_timeout: Duration::from_millis(100),
        ..ExecutorConfig::default()
    };
    let mut exec = Executor::with_config(graph, vec![HashMap::new()], cfg);
    let err = exec.run().unwrap_err();
    match err {
        RuntimeError::Stalled { remaining, .. } => assert!(remaining >= 1),
        other => panic!("expected stall, got {other}"),
    }
}

/// Invalid configuration is rejected before any work starts.
#[test]
fn invalid_config_is_rejected() {
    let cfg = ExecutorConfig {
        watchdog_interval: Duration::from_millis(100),
        stall_timeout: Duration::from_millis(1),
        ..ExecutorConfig::default()
    };
    let mut exec = Executor::with_config(Graph::new(), Vec::new(), cfg);
    assert!(matches!(exec.run(), Err(RuntimeError::Config(_))));
}

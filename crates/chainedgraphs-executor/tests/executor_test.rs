//! Integration tests for the level executor.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chainedgraphs_executor::{
  ChannelReport, ExecutionError, Executor, ExecutorConfig, FailurePolicy, NodeEvent, NodePhase,
  NodeStatus, NoopReport, RunStatus, SkipReason,
};
use chainedgraphs_graph::{ActionError, Chain, GraphBuilder, NodeAction, NodeInputs, NodeRef};
use chainedgraphs_resolver::{ExecutionPlan, LevelResolver, Resolver};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

fn constant(value: Value) -> impl NodeAction {
  move |_: &NodeInputs| Ok::<_, ActionError>(value.clone())
}

fn failing(message: &'static str) -> impl NodeAction {
  move |_: &NodeInputs| Err::<Value, _>(ActionError::new(message))
}

/// Counts invocations before returning `value`.
fn counted(calls: Arc<AtomicUsize>, value: Value) -> impl NodeAction {
  move |_: &NodeInputs| {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok::<_, ActionError>(value.clone())
  }
}

fn node(graph: &str, node: &str) -> NodeRef {
  NodeRef::new(graph, node)
}

fn single_worker(policy: FailurePolicy) -> Executor {
  Executor::new(
    ExecutorConfig::default()
      .with_max_workers(1)
      .with_failure_policy(policy),
  )
}

fn drain(receiver: &mut UnboundedReceiver<NodeEvent>) -> Vec<NodeEvent> {
  let mut events = Vec::new();
  while let Ok(event) = receiver.try_recv() {
    events.push(event);
  }
  events
}

/// n1 fails, n2 depends on n1, n3 is independent and n4 depends on n3.
fn failing_chain(calls: Arc<AtomicUsize>) -> (Chain, ExecutionPlan) {
  let mut builder = GraphBuilder::new("g");
  builder
    .add_node("n1", failing("boom"), &[])
    .unwrap()
    .add_node("n2", counted(calls.clone(), json!("n2")), &["n1"])
    .unwrap()
    .add_node("n3", counted(calls.clone(), json!("n3")), &[])
    .unwrap()
    .add_node("n4", counted(calls, json!("n4")), &["n3"])
    .unwrap();

  let mut chain = Chain::new();
  chain.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();
  (chain, plan)
}

#[tokio::test]
async fn test_fail_fast_finishes_level_and_skips_later_levels() {
  let calls = Arc::new(AtomicUsize::new(0));
  let (chain, plan) = failing_chain(calls.clone());

  let outcome = single_worker(FailurePolicy::FailFast)
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.status, RunStatus::Failed);
  assert!(!outcome.is_success());
  assert_eq!(outcome.status_of(&node("g", "n1")), Some(NodeStatus::Failed));
  // n3 shares a level with n1, so it runs even though n1 failed first.
  assert_eq!(outcome.output(&node("g", "n3")), Some(&json!("n3")));
  assert_eq!(
    outcome.result(&node("g", "n2")).unwrap().skip_reason(),
    Some(&SkipReason::DependencyFailed {
      dependency: node("g", "n1")
    })
  );
  assert_eq!(
    outcome.result(&node("g", "n4")).unwrap().skip_reason(),
    Some(&SkipReason::RunAborted)
  );
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(outcome.results.len(), 4);
}

#[tokio::test]
async fn test_fail_fast_siblings_run_with_many_workers() {
  let mut builder = GraphBuilder::new("g");
  builder
    .add_node("a", failing("boom"), &[])
    .unwrap()
    .add_node("b", constant(json!("b")), &[])
    .unwrap()
    .add_node("c", constant(json!("c")), &[])
    .unwrap()
    .add_node("d", constant(json!("d")), &["b"])
    .unwrap();
  let mut chain = Chain::new();
  chain.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();

  for workers in [1, 8] {
    let executor = Executor::new(
      ExecutorConfig::default()
        .with_max_workers(workers)
        .with_failure_policy(FailurePolicy::FailFast),
    );
    for _ in 0..20 {
      let outcome = executor
        .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
        .await
        .unwrap();

      assert_eq!(outcome.status, RunStatus::Failed);
      assert_eq!(outcome.output(&node("g", "b")), Some(&json!("b")));
      assert_eq!(outcome.output(&node("g", "c")), Some(&json!("c")));
      assert_eq!(
        outcome.result(&node("g", "d")).unwrap().skip_reason(),
        Some(&SkipReason::RunAborted),
        "workers = {}",
        workers
      );
    }
  }
}

#[tokio::test]
async fn test_best_effort_runs_unrelated_nodes() {
  let calls = Arc::new(AtomicUsize::new(0));
  let (chain, plan) = failing_chain(calls.clone());

  let outcome = single_worker(FailurePolicy::BestEffort)
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.status, RunStatus::Failed);
  assert_eq!(outcome.status_of(&node("g", "n2")), Some(NodeStatus::Skipped));
  assert_eq!(outcome.output(&node("g", "n3")), Some(&json!("n3")));
  assert_eq!(outcome.output(&node("g", "n4")), Some(&json!("n4")));
  assert_eq!(calls.load(Ordering::SeqCst), 2);

  let failures = outcome.failures();
  assert_eq!(failures.len(), 1);
  assert_eq!(failures[0].node, node("g", "n1"));
  assert_eq!(failures[0].error, "boom");
}

#[tokio::test]
async fn test_skip_propagates_transitively() {
  let calls = Arc::new(AtomicUsize::new(0));
  let mut builder = GraphBuilder::new("g");
  builder
    .add_node("root", failing("bad input"), &[])
    .unwrap()
    .add_node("mid", counted(calls.clone(), json!(1)), &["root"])
    .unwrap()
    .add_node("leaf", counted(calls.clone(), json!(2)), &["mid"])
    .unwrap();
  let mut chain = Chain::new();
  chain.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();

  let outcome = single_worker(FailurePolicy::BestEffort)
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(
    outcome.result(&node("g", "leaf")).unwrap().skip_reason(),
    Some(&SkipReason::DependencyFailed {
      dependency: node("g", "mid")
    })
  );
  assert_eq!(outcome.count(NodeStatus::Skipped), 2);
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cross_graph_inputs() {
  let mut extract = GraphBuilder::new("extract");
  extract
    .add_node("read", constant(json!({"rows": 3})), &[])
    .unwrap();

  let mut load = GraphBuilder::new("load");
  load
    .add_node(
      "write",
      |inputs: &NodeInputs| {
        let rows = inputs
          .get(&NodeRef::new("extract", "read"))
          .and_then(|v| v["rows"].as_u64())
          .ok_or_else(|| ActionError::new("missing rows"))?;
        Ok::<_, ActionError>(json!({"written": rows, "inputs": inputs.len()}))
      },
      &[],
    )
    .unwrap();

  let mut chain = Chain::new();
  chain
    .add_graph(extract.finalize().unwrap())
    .unwrap()
    .add_graph(load.finalize().unwrap())
    .unwrap();
  chain.add_link(("extract", "read"), ("load", "write")).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();

  let outcome = Executor::default()
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap();

  assert!(outcome.is_success());
  assert_eq!(
    outcome.output(&node("load", "write")),
    Some(&json!({"written": 3, "inputs": 1}))
  );
}

#[tokio::test]
async fn test_events_started_then_terminal() {
  let calls = Arc::new(AtomicUsize::new(0));
  let (chain, plan) = failing_chain(calls);
  let (report, mut receiver) = ChannelReport::channel();

  let outcome = single_worker(FailurePolicy::BestEffort)
    .run(&chain, &plan, Arc::new(report), CancellationToken::new())
    .await
    .unwrap();

  let events = drain(&mut receiver);
  let phases: Vec<(String, NodePhase)> = events
    .iter()
    .map(|e| (e.node.to_string(), e.phase))
    .collect();
  assert_eq!(
    phases,
    vec![
      ("g/n1".to_string(), NodePhase::Started),
      ("g/n1".to_string(), NodePhase::Failed),
      ("g/n3".to_string(), NodePhase::Started),
      ("g/n3".to_string(), NodePhase::Succeeded),
      ("g/n2".to_string(), NodePhase::Skipped),
      ("g/n4".to_string(), NodePhase::Started),
      ("g/n4".to_string(), NodePhase::Succeeded),
    ]
  );
  assert!(events.iter().all(|e| e.execution_id == outcome.execution_id));
  assert_eq!(events[1].detail.as_deref(), Some("boom"));
  assert_eq!(events[3].detail.as_deref(), Some(r#""n3""#));
}

#[tokio::test]
async fn test_single_worker_runs_are_deterministic() {
  let mut builder = GraphBuilder::new("a");
  for id in ["x", "y", "z", "w"] {
    builder.add_node(id, constant(json!(id)), &[]).unwrap();
  }
  builder.add_node("sink", constant(json!(0)), &["x", "y", "z", "w"]).unwrap();
  let mut other = GraphBuilder::new("b");
  other.add_node("tail", constant(json!(1)), &[]).unwrap();

  let mut chain = Chain::new();
  chain
    .add_graph(builder.finalize().unwrap())
    .unwrap()
    .add_graph(other.finalize().unwrap())
    .unwrap();
  chain.add_link(("a", "sink"), ("b", "tail")).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();

  let executor = single_worker(FailurePolicy::FailFast);
  let mut orders = Vec::new();
  for _ in 0..2 {
    let (report, mut receiver) = ChannelReport::channel();
    executor
      .run(&chain, &plan, Arc::new(report), CancellationToken::new())
      .await
      .unwrap();
    let order: Vec<(NodeRef, NodePhase)> = drain(&mut receiver)
      .into_iter()
      .map(|e| (e.node, e.phase))
      .collect();
    orders.push(order);
  }

  assert_eq!(orders[0].len(), 12);
  assert_eq!(orders[0], orders[1]);
}

#[tokio::test]
async fn test_levels_do_not_overlap() {
  let mut builder = GraphBuilder::new("g");
  let slow = |_: &NodeInputs| {
    std::thread::sleep(Duration::from_millis(10));
    Ok::<_, ActionError>(json!(null))
  };
  builder
    .add_node("a", slow, &[])
    .unwrap()
    .add_node("b", slow, &[])
    .unwrap()
    .add_node("c", slow, &["a"])
    .unwrap()
    .add_node("d", slow, &["a", "b"])
    .unwrap()
    .add_node("e", slow, &["c", "d"])
    .unwrap();
  let mut chain = Chain::new();
  chain.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();
  let (report, mut receiver) = ChannelReport::channel();

  let outcome = Executor::new(ExecutorConfig::default().with_max_workers(4))
    .run(&chain, &plan, Arc::new(report), CancellationToken::new())
    .await
    .unwrap();
  assert!(outcome.is_success());

  let events = drain(&mut receiver);
  assert_eq!(events.len(), 10);
  for (i, event) in events.iter().enumerate() {
    if event.phase != NodePhase::Started {
      continue;
    }
    let level = plan.level_of(&event.node).unwrap();
    // Every node of an earlier level has already terminated.
    for earlier in plan.levels()[..level].iter().flatten() {
      let terminated = events[..i]
        .iter()
        .any(|e| &e.node == earlier && e.phase.is_terminal());
      assert!(terminated, "{} started before {} finished", event.node, earlier);
    }
  }
}

#[tokio::test]
async fn test_cancel_before_run() {
  let calls = Arc::new(AtomicUsize::new(0));
  let mut builder = GraphBuilder::new("g");
  builder
    .add_node("a", counted(calls.clone(), json!(1)), &[])
    .unwrap()
    .add_node("b", counted(calls.clone(), json!(2)), &["a"])
    .unwrap();
  let mut chain = Chain::new();
  chain.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();

  let cancel = CancellationToken::new();
  cancel.cancel();
  let (report, mut receiver) = ChannelReport::channel();
  let outcome = Executor::default()
    .run(&chain, &plan, Arc::new(report), cancel)
    .await
    .unwrap();

  assert_eq!(outcome.status, RunStatus::Cancelled);
  assert_eq!(calls.load(Ordering::SeqCst), 0);
  assert!(
    outcome
      .skipped()
      .all(|(_, reason)| reason == &SkipReason::Cancelled)
  );
  assert_eq!(outcome.count(NodeStatus::Skipped), 2);
  assert!(
    drain(&mut receiver)
      .iter()
      .all(|e| e.phase == NodePhase::Skipped)
  );
  assert!(matches!(
    outcome.into_result(),
    Err(ExecutionError::Cancelled)
  ));
}

#[tokio::test]
async fn test_cancel_during_run_lets_running_node_finish() {
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  let calls = Arc::new(AtomicUsize::new(0));

  let mut builder = GraphBuilder::new("g");
  builder
    .add_node(
      "first",
      move |_: &NodeInputs| {
        trigger.cancel();
        Ok::<_, ActionError>(json!("done"))
      },
      &[],
    )
    .unwrap()
    .add_node("second", counted(calls.clone(), json!(2)), &["first"])
    .unwrap();
  let mut chain = Chain::new();
  chain.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();

  let outcome = Executor::default()
    .run(&chain, &plan, Arc::new(NoopReport), cancel)
    .await
    .unwrap();

  assert_eq!(outcome.status, RunStatus::Cancelled);
  assert_eq!(outcome.output(&node("g", "first")), Some(&json!("done")));
  assert_eq!(
    outcome.result(&node("g", "second")).unwrap().skip_reason(),
    Some(&SkipReason::Cancelled)
  );
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_action_is_a_failure() {
  let mut builder = GraphBuilder::new("g");
  builder
    .add_node(
      "explode",
      |_: &NodeInputs| -> Result<Value, ActionError> { panic!("kaboom") },
      &[],
    )
    .unwrap();
  let mut chain = Chain::new();
  chain.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();

  let outcome = Executor::default()
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.status, RunStatus::Failed);
  assert_eq!(
    outcome.result(&node("g", "explode")).unwrap().error(),
    Some("action panicked: kaboom")
  );
}

fn overlap_chain(active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> (Chain, ExecutionPlan) {
  let mut builder = GraphBuilder::new("g");
  for id in ["a", "b", "c", "d"] {
    let active = active.clone();
    let peak = peak.clone();
    builder
      .add_node(
        id,
        move |_: &NodeInputs| {
          let now = active.fetch_add(1, Ordering::SeqCst) + 1;
          peak.fetch_max(now, Ordering::SeqCst);
          std::thread::sleep(Duration::from_millis(50));
          active.fetch_sub(1, Ordering::SeqCst);
          Ok::<_, ActionError>(json!(null))
        },
        &[],
      )
      .unwrap();
  }
  let mut chain = Chain::new();
  chain.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&chain).unwrap();
  (chain, plan)
}

#[tokio::test]
async fn test_worker_bound_is_respected() {
  let active = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));
  let (chain, plan) = overlap_chain(active.clone(), peak.clone());

  Executor::new(ExecutorConfig::default().with_max_workers(1))
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(peak.load(Ordering::SeqCst), 1);

  let peak = Arc::new(AtomicUsize::new(0));
  let (chain, plan) = overlap_chain(active, peak.clone());
  Executor::new(ExecutorConfig::default().with_max_workers(4))
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap();
  let observed = peak.load(Ordering::SeqCst);
  assert!((2..=4).contains(&observed), "peak concurrency {}", observed);
}

#[tokio::test]
async fn test_plan_for_other_chain_is_rejected() {
  let mut builder = GraphBuilder::new("g");
  builder.add_node("a", constant(json!(1)), &[]).unwrap();
  let mut full = Chain::new();
  full.add_graph(builder.finalize().unwrap()).unwrap();
  let plan = LevelResolver::new().resolve(&full).unwrap();

  let calls = Arc::new(AtomicUsize::new(0));
  let mut builder = GraphBuilder::new("g");
  builder
    .add_node("b", counted(calls.clone(), json!(2)), &[])
    .unwrap();
  let mut other = Chain::new();
  other.add_graph(builder.finalize().unwrap()).unwrap();

  let err = Executor::default()
    .run(&other, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, ExecutionError::UnknownNode { ref node } if node == &NodeRef::new("g", "a")));
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_run_into_result() {
  let calls = Arc::new(AtomicUsize::new(0));
  let (chain, plan) = failing_chain(calls);

  let err = single_worker(FailurePolicy::FailFast)
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap()
    .into_result()
    .unwrap_err();

  assert_eq!(err.to_string(), "1 node(s) failed: g/n1: boom");
}

#[tokio::test]
async fn test_empty_plan_succeeds() {
  let chain = Chain::new();
  let plan = LevelResolver::new().resolve(&chain).unwrap();

  let outcome = Executor::default()
    .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
    .await
    .unwrap();

  assert!(outcome.is_success());
  assert!(outcome.results.is_empty());
}

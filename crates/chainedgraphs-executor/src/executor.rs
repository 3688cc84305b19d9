//! Level-by-level plan execution.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chainedgraphs_graph::{Chain, NodeAction, NodeInputs, NodeRef};
use chainedgraphs_resolver::ExecutionPlan;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ExecutorConfig, FailurePolicy};
use crate::error::ExecutionError;
use crate::events::{NodeEvent, RunReport};
use crate::result::{NodeResult, RunOutcome, RunStatus, SkipReason};

/// Runs resolved plans.
///
/// Levels run strictly in order. Inside a level, nodes are dispatched in plan
/// order onto blocking workers, at most `max_workers` at a time, and the level
/// completes only when every dispatched node has reached a terminal state.
/// With a single worker the event order is fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct Executor {
  config: ExecutorConfig,
}

impl Executor {
  pub fn new(config: ExecutorConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ExecutorConfig {
    &self.config
  }

  /// Execute `plan` against the actions in `chain`.
  ///
  /// Node failures do not make this return an error; they are recorded in the
  /// returned [`RunOutcome`]. Use [`RunOutcome::into_result`] to turn a failed
  /// or cancelled outcome into an error.
  pub async fn run(
    &self,
    chain: &Chain,
    plan: &ExecutionPlan,
    report: Arc<dyn RunReport>,
    cancel: CancellationToken,
  ) -> Result<RunOutcome, ExecutionError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    LevelRun {
      chain,
      plan,
      report,
      cancel,
      policy: self.config.failure_policy,
      workers: Arc::new(Semaphore::new(self.config.worker_count())),
      execution_id,
      results: BTreeMap::new(),
    }
    .execute()
    .await
  }
}

/// State of a single run.
struct LevelRun<'a> {
  chain: &'a Chain,
  plan: &'a ExecutionPlan,
  report: Arc<dyn RunReport>,
  cancel: CancellationToken,
  policy: FailurePolicy,
  workers: Arc<Semaphore>,
  execution_id: String,
  results: BTreeMap<NodeRef, NodeResult>,
}

impl LevelRun<'_> {
  #[instrument(
    name = "chain_run",
    skip(self),
    fields(
      execution_id = %self.execution_id,
    )
  )]
  async fn execute(mut self) -> Result<RunOutcome, ExecutionError> {
    let start = Instant::now();

    // Check the whole plan up front so a mismatch never leaves a partial run.
    for node in self.plan.nodes() {
      if self.chain.node(node).is_none() {
        return Err(ExecutionError::UnknownNode { node: node.clone() });
      }
    }

    info!(
      execution_id = %self.execution_id,
      nodes = self.plan.node_count(),
      levels = self.plan.level_count(),
      policy = ?self.policy,
      workers = self.workers.available_permits(),
      "chain_run_started"
    );

    let plan = self.plan;
    for (index, level) in plan.levels().iter().enumerate() {
      debug!(
        execution_id = %self.execution_id,
        level = index,
        nodes = level.len(),
        "level_started"
      );

      // Fail-fast only stops levels after the one with the failure.
      let halted = self.policy == FailurePolicy::FailFast
        && self.results.values().any(|r| r.error().is_some());

      let mut handles = Vec::with_capacity(level.len());
      for node in level {
        if let Some(reason) = self.skip_reason(node, halted) {
          self.skip(node, reason);
          continue;
        }

        let permit = tokio::select! {
          biased;
          _ = self.cancel.cancelled() => None,
          permit = self.workers.clone().acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
          self.skip(node, SkipReason::Cancelled);
          continue;
        };

        // Waiting for a worker may have outlasted a cancel.
        if self.cancel.is_cancelled() {
          drop(permit);
          self.skip(node, SkipReason::Cancelled);
          continue;
        }

        handles.push(self.dispatch(node, permit));
      }

      let finished = futures::future::join_all(handles).await;
      for joined in finished {
        let (node, result) = joined.map_err(|e| ExecutionError::Worker {
          message: format!("task join error: {}", e),
        })?;
        self.results.insert(node, result);
      }
    }

    let status = self.final_status();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match status {
      RunStatus::Succeeded => info!(
        execution_id = %self.execution_id,
        elapsed_ms,
        "chain_run_completed"
      ),
      RunStatus::Failed => error!(
        execution_id = %self.execution_id,
        elapsed_ms,
        failures = self.results.values().filter(|r| r.error().is_some()).count(),
        "chain_run_failed"
      ),
      RunStatus::Cancelled => warn!(
        execution_id = %self.execution_id,
        elapsed_ms,
        "chain_run_cancelled"
      ),
    }

    Ok(RunOutcome {
      execution_id: self.execution_id,
      status,
      results: self.results,
      elapsed_ms,
    })
  }

  /// Reason a node must not start, checked before waiting for a worker.
  ///
  /// Cancellation wins over dependency failure so a cancelled run reports
  /// every unstarted node as cancelled. `halted` is set for levels after a
  /// fail-fast failure.
  fn skip_reason(&self, node: &NodeRef, halted: bool) -> Option<SkipReason> {
    if self.cancel.is_cancelled() {
      return Some(SkipReason::Cancelled);
    }
    let failed_dependency = self
      .plan
      .dependencies(node)
      .iter()
      .find(|dep| !self.results.get(*dep).is_some_and(NodeResult::is_success));
    if let Some(dependency) = failed_dependency {
      return Some(SkipReason::DependencyFailed {
        dependency: dependency.clone(),
      });
    }
    halted.then_some(SkipReason::RunAborted)
  }

  fn skip(&mut self, node: &NodeRef, reason: SkipReason) {
    debug!(
      execution_id = %self.execution_id,
      node = %node,
      reason = %reason,
      "node_skipped"
    );
    let result = NodeResult::Skipped { reason };
    self
      .report
      .record(NodeEvent::terminal(&self.execution_id, node, &result));
    self.results.insert(node.clone(), result);
  }

  /// Start a node on a blocking worker. The permit is released only after
  /// the terminal event has been recorded.
  fn dispatch(
    &self,
    node: &NodeRef,
    permit: OwnedSemaphorePermit,
  ) -> JoinHandle<(NodeRef, NodeResult)> {
    let inputs: NodeInputs = self
      .plan
      .dependencies(node)
      .iter()
      .filter_map(|dep| {
        self
          .results
          .get(dep)
          .and_then(NodeResult::output)
          .map(|output| (dep.clone(), output.clone()))
      })
      .collect();

    // Presence was checked before the first level started.
    let action: Option<Arc<dyn NodeAction>> = self.chain.node(node).map(|n| n.action().clone());

    debug!(
      execution_id = %self.execution_id,
      node = %node,
      inputs = inputs.len(),
      "node_started"
    );
    self
      .report
      .record(NodeEvent::started(&self.execution_id, node));

    let node = node.clone();
    let report = self.report.clone();
    let execution_id = self.execution_id.clone();

    tokio::task::spawn_blocking(move || {
      let _permit = permit;
      let start = Instant::now();

      let outcome = match action {
        Some(action) => {
          panic::catch_unwind(AssertUnwindSafe(|| action.execute(&inputs))).map_err(panic_message)
        }
        None => Err("node has no action".to_string()),
      };
      let elapsed_ms = start.elapsed().as_millis() as u64;

      let result = match outcome {
        Ok(Ok(output)) => {
          debug!(
            execution_id = %execution_id,
            node = %node,
            elapsed_ms,
            "node_succeeded"
          );
          NodeResult::Succeeded { output, elapsed_ms }
        }
        Ok(Err(e)) => {
          debug!(
            execution_id = %execution_id,
            node = %node,
            elapsed_ms,
            error = %e,
            "node_failed"
          );
          NodeResult::Failed {
            error: e.to_string(),
            elapsed_ms,
          }
        }
        Err(message) => {
          debug!(
            execution_id = %execution_id,
            node = %node,
            elapsed_ms,
            panic = %message,
            "node_failed"
          );
          NodeResult::Failed {
            error: format!("action panicked: {}", message),
            elapsed_ms,
          }
        }
      };

      report.record(NodeEvent::terminal(&execution_id, &node, &result));

      (node, result)
    })
  }

  fn final_status(&self) -> RunStatus {
    let cancelled = self
      .results
      .values()
      .any(|r| matches!(r.skip_reason(), Some(SkipReason::Cancelled)));
    if cancelled {
      RunStatus::Cancelled
    } else if self.results.values().any(|r| r.error().is_some()) {
      RunStatus::Failed
    } else {
      RunStatus::Succeeded
    }
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_string()
  }
}

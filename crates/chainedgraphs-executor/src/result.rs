//! Per-node results and the aggregate run outcome.

use std::collections::BTreeMap;
use std::fmt;

use chainedgraphs_graph::NodeRef;
use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, NodeFailure};

/// Why a node was never started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
  /// A direct dependency failed or was itself skipped.
  DependencyFailed { dependency: NodeRef },
  /// An earlier failure stopped the run under fail-fast.
  RunAborted,
  /// The run was cancelled before the node started.
  Cancelled,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::DependencyFailed { dependency } => {
        write!(f, "dependency '{}' did not succeed", dependency)
      }
      SkipReason::RunAborted => f.write_str("run aborted after an earlier failure"),
      SkipReason::Cancelled => f.write_str("run cancelled"),
    }
  }
}

/// Terminal state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
  Succeeded,
  Failed,
  Skipped,
}

/// Outcome of one node. Written once by the worker that ran it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeResult {
  Succeeded {
    output: serde_json::Value,
    elapsed_ms: u64,
  },
  Failed {
    error: String,
    elapsed_ms: u64,
  },
  Skipped {
    reason: SkipReason,
  },
}

impl NodeResult {
  pub fn status(&self) -> NodeStatus {
    match self {
      NodeResult::Succeeded { .. } => NodeStatus::Succeeded,
      NodeResult::Failed { .. } => NodeStatus::Failed,
      NodeResult::Skipped { .. } => NodeStatus::Skipped,
    }
  }

  pub fn output(&self) -> Option<&serde_json::Value> {
    match self {
      NodeResult::Succeeded { output, .. } => Some(output),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      NodeResult::Failed { error, .. } => Some(error),
      _ => None,
    }
  }

  pub fn skip_reason(&self) -> Option<&SkipReason> {
    match self {
      NodeResult::Skipped { reason } => Some(reason),
      _ => None,
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, NodeResult::Succeeded { .. })
  }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Succeeded,
  Failed,
  Cancelled,
}

/// Result of executing a whole plan.
#[derive(Debug, Clone)]
pub struct RunOutcome {
  /// Unique execution ID.
  pub execution_id: String,
  pub status: RunStatus,
  /// Result of every node in the plan.
  pub results: BTreeMap<NodeRef, NodeResult>,
  pub elapsed_ms: u64,
}

impl RunOutcome {
  pub fn is_success(&self) -> bool {
    self.status == RunStatus::Succeeded
  }

  pub fn result(&self, node: &NodeRef) -> Option<&NodeResult> {
    self.results.get(node)
  }

  pub fn status_of(&self, node: &NodeRef) -> Option<NodeStatus> {
    self.results.get(node).map(NodeResult::status)
  }

  pub fn output(&self, node: &NodeRef) -> Option<&serde_json::Value> {
    self.results.get(node).and_then(NodeResult::output)
  }

  /// Failed nodes in (graph, node) order.
  pub fn failures(&self) -> Vec<NodeFailure> {
    self
      .results
      .iter()
      .filter_map(|(node, result)| {
        result.error().map(|error| NodeFailure {
          node: node.clone(),
          error: error.to_string(),
        })
      })
      .collect()
  }

  /// Skipped nodes in (graph, node) order.
  pub fn skipped(&self) -> impl Iterator<Item = (&NodeRef, &SkipReason)> + '_ {
    self
      .results
      .iter()
      .filter_map(|(node, result)| result.skip_reason().map(|reason| (node, reason)))
  }

  /// Count of nodes per terminal status.
  pub fn count(&self, status: NodeStatus) -> usize {
    self
      .results
      .values()
      .filter(|r| r.status() == status)
      .count()
  }

  /// Turn a failed or cancelled outcome into an error.
  pub fn into_result(self) -> Result<RunOutcome, ExecutionError> {
    match self.status {
      RunStatus::Succeeded => Ok(self),
      RunStatus::Failed => Err(ExecutionError::NodeFailures {
        failures: self.failures(),
      }),
      RunStatus::Cancelled => Err(ExecutionError::Cancelled),
    }
  }
}

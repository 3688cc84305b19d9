//! Executor errors.

use chainedgraphs_graph::NodeRef;
use serde::{Deserialize, Serialize};

/// A node that ran and failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
  pub node: NodeRef,
  pub error: String,
}

/// Errors that can occur while executing a plan.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
  /// The plan names a node the chain does not contain.
  #[error("plan references node '{node}' which is not in the chain")]
  UnknownNode { node: NodeRef },

  /// A worker could not be joined.
  #[error("worker failed: {message}")]
  Worker { message: String },

  /// One or more nodes failed during the run.
  #[error("{} node(s) failed: {}", failures.len(), format_failures(failures))]
  NodeFailures { failures: Vec<NodeFailure> },

  /// The run was cancelled before every node could start.
  #[error("execution cancelled")]
  Cancelled,
}

fn format_failures(failures: &[NodeFailure]) -> String {
  failures
    .iter()
    .map(|f| format!("{}: {}", f.node, f.error))
    .collect::<Vec<_>>()
    .join("; ")
}

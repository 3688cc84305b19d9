use chainedgraphs_graph::{GraphError, NodeRef};
use thiserror::Error;

/// Errors that can occur while resolving a chain into a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  /// A graph or link in the chain is malformed.
  #[error(transparent)]
  Graph(#[from] GraphError),

  /// The merged dependency graph contains a cycle.
  #[error("cycle detected in chain: {}", format_path(path))]
  Cycle { path: Vec<NodeRef> },
}

fn format_path(path: &[NodeRef]) -> String {
  path
    .iter()
    .map(|node| node.to_string())
    .collect::<Vec<_>>()
    .join(" -> ")
}

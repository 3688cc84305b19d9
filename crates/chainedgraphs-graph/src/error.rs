use thiserror::Error;

use crate::ids::{GraphId, NodeId, NodeRef};

/// Errors raised while constructing graphs, links and chains.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("duplicate node '{node}' in graph '{graph}'")]
  DuplicateNode { graph: GraphId, node: NodeId },

  #[error("node '{node}' in graph '{graph}' depends on unknown predecessor '{predecessor}'")]
  UnknownPredecessor {
    graph: GraphId,
    node: NodeId,
    predecessor: NodeId,
  },

  #[error("unknown node: {node}")]
  UnknownNode { node: NodeRef },

  #[error("link from '{node}' to itself")]
  SelfLink { node: NodeRef },

  #[error("link from '{from}' to '{to}' stays inside one graph")]
  SameGraphLink { from: NodeRef, to: NodeRef },

  #[error("duplicate graph: {graph}")]
  DuplicateGraph { graph: GraphId },

  #[error("cycle detected in graph '{graph}': {}", format_path(path))]
  Cycle { graph: GraphId, path: Vec<NodeId> },
}

fn format_path(path: &[NodeId]) -> String {
  path
    .iter()
    .map(|id| id.as_str())
    .collect::<Vec<_>>()
    .join(" -> ")
}

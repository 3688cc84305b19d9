use std::fmt;
use std::sync::Arc;

use crate::action::NodeAction;
use crate::ids::NodeId;

/// A node in a single graph.
#[derive(Clone)]
pub struct Node {
  pub(crate) id: NodeId,
  pub(crate) action: Arc<dyn NodeAction>,
  /// Intra-graph dependencies, deduplicated, in declaration order.
  pub(crate) predecessors: Vec<NodeId>,
  /// Filled in when the owning graph is finalized.
  pub(crate) successors: Vec<NodeId>,
}

impl Node {
  pub fn id(&self) -> &NodeId {
    &self.id
  }

  pub fn action(&self) -> &Arc<dyn NodeAction> {
    &self.action
  }

  pub fn predecessors(&self) -> &[NodeId] {
    &self.predecessors
  }

  pub fn successors(&self) -> &[NodeId] {
    &self.successors
  }
}

impl fmt::Debug for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Node")
      .field("id", &self.id)
      .field("predecessors", &self.predecessors)
      .field("successors", &self.successors)
      .finish_non_exhaustive()
  }
}

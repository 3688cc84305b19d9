use std::collections::BTreeMap;

use chainedgraphs_graph::NodeRef;

/// A resolved chain: every node assigned to a level.
///
/// Nodes in level `k` depend only on nodes in levels `< k`, and nodes within
/// one level are independent of each other. Within a level nodes are sorted
/// by (graph, node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
  levels: Vec<Vec<NodeRef>>,
  /// Direct dependencies of each node, intra- and cross-graph, sorted.
  dependencies: BTreeMap<NodeRef, Vec<NodeRef>>,
  level_of: BTreeMap<NodeRef, usize>,
}

impl ExecutionPlan {
  pub(crate) fn new(
    levels: Vec<Vec<NodeRef>>,
    dependencies: BTreeMap<NodeRef, Vec<NodeRef>>,
  ) -> Self {
    let level_of = levels
      .iter()
      .enumerate()
      .flat_map(|(i, level)| level.iter().map(move |node| (node.clone(), i)))
      .collect();
    Self {
      levels,
      dependencies,
      level_of,
    }
  }

  pub fn levels(&self) -> &[Vec<NodeRef>] {
    &self.levels
  }

  pub fn level_count(&self) -> usize {
    self.levels.len()
  }

  /// Index of the level a node was placed in.
  pub fn level_of(&self, node: &NodeRef) -> Option<usize> {
    self.level_of.get(node).copied()
  }

  /// Direct dependencies of `node`; empty for unknown nodes.
  pub fn dependencies(&self, node: &NodeRef) -> &[NodeRef] {
    self
      .dependencies
      .get(node)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// All nodes in execution order.
  pub fn nodes(&self) -> impl Iterator<Item = &NodeRef> + '_ {
    self.levels.iter().flatten()
  }

  pub fn node_count(&self) -> usize {
    self.level_of.len()
  }

  pub fn is_empty(&self) -> bool {
    self.levels.is_empty()
  }
}

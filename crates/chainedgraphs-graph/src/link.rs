use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::ids::{GraphId, NodeRef};

/// A cross-graph dependency: `target` runs only after `source` completes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChainLink {
  pub source: NodeRef,
  pub target: NodeRef,
}

/// The set of cross-graph links of a chain.
///
/// Duplicate links collapse. Cycle checking is left to the resolver, which
/// sees intra-graph edges and links together.
#[derive(Debug, Clone, Default)]
pub struct ChainLinkTable {
  links: BTreeSet<ChainLink>,
}

impl ChainLinkTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record that `target` depends on `source`.
  ///
  /// Both endpoints must exist in `graphs` and belong to different graphs.
  /// Returns `false` when the link was already present. The table is left
  /// untouched on error.
  pub fn add_link(
    &mut self,
    graphs: &BTreeMap<GraphId, Graph>,
    source: NodeRef,
    target: NodeRef,
  ) -> Result<bool, GraphError> {
    check_registered(graphs, &source)?;
    check_registered(graphs, &target)?;
    if source == target {
      return Err(GraphError::SelfLink { node: source });
    }
    if source.graph == target.graph {
      return Err(GraphError::SameGraphLink {
        from: source,
        to: target,
      });
    }

    Ok(self.links.insert(ChainLink { source, target }))
  }

  /// Links in (source, target) order.
  pub fn iter(&self) -> impl Iterator<Item = &ChainLink> + '_ {
    self.links.iter()
  }

  pub fn contains(&self, source: &NodeRef, target: &NodeRef) -> bool {
    self.links.contains(&ChainLink {
      source: source.clone(),
      target: target.clone(),
    })
  }

  pub fn len(&self) -> usize {
    self.links.len()
  }

  pub fn is_empty(&self) -> bool {
    self.links.is_empty()
  }
}

/// Fail with [`GraphError::UnknownNode`] unless `node` names a node of a
/// registered graph.
pub fn check_registered(
  graphs: &BTreeMap<GraphId, Graph>,
  node: &NodeRef,
) -> Result<(), GraphError> {
  let known = graphs
    .get(&node.graph)
    .is_some_and(|graph| graph.contains(&node.node));
  if known {
    Ok(())
  } else {
    Err(GraphError::UnknownNode { node: node.clone() })
  }
}

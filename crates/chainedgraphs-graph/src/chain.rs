use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::ids::{GraphId, NodeRef};
use crate::link::ChainLinkTable;
use crate::node::Node;

/// A set of graphs joined by cross-graph links.
///
/// The chain is the unit handed to the resolver and, once resolved, to the
/// executor. Graphs are kept ordered by id.
#[derive(Debug, Clone, Default)]
pub struct Chain {
  graphs: BTreeMap<GraphId, Graph>,
  links: ChainLinkTable,
}

impl Chain {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a finalized graph.
  pub fn add_graph(&mut self, graph: Graph) -> Result<&mut Self, GraphError> {
    if self.graphs.contains_key(graph.id()) {
      return Err(GraphError::DuplicateGraph {
        graph: graph.id().clone(),
      });
    }
    self.graphs.insert(graph.id().clone(), graph);
    Ok(self)
  }

  /// Link two nodes of registered graphs. See [`ChainLinkTable::add_link`].
  pub fn add_link(
    &mut self,
    source: impl Into<NodeRef>,
    target: impl Into<NodeRef>,
  ) -> Result<bool, GraphError> {
    self
      .links
      .add_link(&self.graphs, source.into(), target.into())
  }

  pub fn graphs(&self) -> &BTreeMap<GraphId, Graph> {
    &self.graphs
  }

  pub fn graph(&self, id: &GraphId) -> Option<&Graph> {
    self.graphs.get(id)
  }

  pub fn links(&self) -> &ChainLinkTable {
    &self.links
  }

  /// Look up a node anywhere in the chain.
  pub fn node(&self, node: &NodeRef) -> Option<&Node> {
    self.graphs.get(&node.graph)?.node(&node.node)
  }

  /// Total number of nodes across all graphs.
  pub fn node_count(&self) -> usize {
    self.graphs.values().map(Graph::len).sum()
  }
}

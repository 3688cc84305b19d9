use std::collections::HashMap;
use std::sync::Arc;

use crate::action::NodeAction;
use crate::error::GraphError;
use crate::ids::{GraphId, NodeId};
use crate::node::Node;

/// Collects nodes for a graph before it is validated.
///
/// Predecessors are referenced by id and checked in [`GraphBuilder::finalize`],
/// so nodes may be added in any order.
#[derive(Debug)]
pub struct GraphBuilder {
  id: GraphId,
  nodes: Vec<Node>,
  index: HashMap<NodeId, usize>,
}

impl GraphBuilder {
  pub fn new(id: impl Into<GraphId>) -> Self {
    Self {
      id: id.into(),
      nodes: Vec::new(),
      index: HashMap::new(),
    }
  }

  /// Add a node with its intra-graph predecessors.
  ///
  /// Fails with [`GraphError::DuplicateNode`] without touching the builder if
  /// the id is already taken.
  pub fn add_node(
    &mut self,
    id: impl Into<NodeId>,
    action: impl NodeAction + 'static,
    predecessors: &[&str],
  ) -> Result<&mut Self, GraphError> {
    self.add_shared_node(id, Arc::new(action), predecessors)
  }

  /// Like [`GraphBuilder::add_node`] for an action that is already shared.
  pub fn add_shared_node(
    &mut self,
    id: impl Into<NodeId>,
    action: Arc<dyn NodeAction>,
    predecessors: &[&str],
  ) -> Result<&mut Self, GraphError> {
    let id = id.into();
    if self.index.contains_key(&id) {
      return Err(GraphError::DuplicateNode {
        graph: self.id.clone(),
        node: id,
      });
    }

    let mut deduped: Vec<NodeId> = Vec::with_capacity(predecessors.len());
    for pred in predecessors {
      let pred = NodeId::new(*pred);
      if !deduped.contains(&pred) {
        deduped.push(pred);
      }
    }

    self.index.insert(id.clone(), self.nodes.len());
    self.nodes.push(Node {
      id,
      action,
      predecessors: deduped,
      successors: Vec::new(),
    });
    Ok(self)
  }

  /// Validate predecessors and acyclicity, producing an immutable graph.
  pub fn finalize(self) -> Result<Graph, GraphError> {
    let Self {
      id,
      mut nodes,
      index,
    } = self;

    for node in &nodes {
      for pred in &node.predecessors {
        if !index.contains_key(pred) {
          return Err(GraphError::UnknownPredecessor {
            graph: id,
            node: node.id.clone(),
            predecessor: pred.clone(),
          });
        }
      }
    }

    // Successors follow insertion order of the dependent node.
    let mut successors: Vec<Vec<NodeId>> = vec![Vec::new(); nodes.len()];
    for node in &nodes {
      for pred in &node.predecessors {
        successors[index[pred]].push(node.id.clone());
      }
    }
    for (node, succ) in nodes.iter_mut().zip(successors) {
      node.successors = succ;
    }

    let graph = Graph { id, nodes, index };
    if let Some(path) = graph.find_cycle() {
      return Err(GraphError::Cycle {
        graph: graph.id,
        path,
      });
    }
    Ok(graph)
  }
}

/// A validated, acyclic graph of nodes. Immutable once built.
#[derive(Debug, Clone)]
pub struct Graph {
  id: GraphId,
  /// Nodes in insertion order.
  nodes: Vec<Node>,
  index: HashMap<NodeId, usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
  Unvisited,
  InProgress,
  Done,
}

impl Graph {
  pub fn id(&self) -> &GraphId {
    &self.id
  }

  /// Node ids in insertion order. Each call starts a fresh iteration.
  pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + Clone + '_ {
    self.nodes.iter().map(|n| &n.id)
  }

  pub fn node(&self, id: &NodeId) -> Option<&Node> {
    self.index.get(id).map(|&i| &self.nodes[i])
  }

  pub fn contains(&self, id: &NodeId) -> bool {
    self.index.contains_key(id)
  }

  pub fn predecessors(&self, id: &NodeId) -> &[NodeId] {
    self.node(id).map(|n| n.predecessors()).unwrap_or(&[])
  }

  pub fn successors(&self, id: &NodeId) -> &[NodeId] {
    self.node(id).map(|n| n.successors()).unwrap_or(&[])
  }

  /// Intra-graph edges as `(dependency, dependent)` pairs.
  pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> + '_ {
    self
      .nodes
      .iter()
      .flat_map(|n| n.predecessors.iter().map(move |p| (p, &n.id)))
  }

  /// Nodes with no intra-graph predecessors.
  pub fn entry_points(&self) -> impl Iterator<Item = &NodeId> + '_ {
    self
      .nodes
      .iter()
      .filter(|n| n.predecessors.is_empty())
      .map(|n| &n.id)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Three-color depth-first search with an explicit stack.
  ///
  /// Returns the first cycle found, with its starting node repeated at the end.
  fn find_cycle(&self) -> Option<Vec<NodeId>> {
    let mut color = vec![Color::Unvisited; self.nodes.len()];
    // (node index, next successor position)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..self.nodes.len() {
      if color[root] != Color::Unvisited {
        continue;
      }
      color[root] = Color::InProgress;
      stack.push((root, 0));

      while let Some(top) = stack.last_mut() {
        let current = top.0;
        let successors = &self.nodes[current].successors;
        if top.1 == successors.len() {
          color[current] = Color::Done;
          stack.pop();
          continue;
        }

        let child = self.index[&successors[top.1]];
        top.1 += 1;

        match color[child] {
          Color::Unvisited => {
            color[child] = Color::InProgress;
            stack.push((child, 0));
          }
          Color::InProgress => {
            let start = stack.iter().position(|&(i, _)| i == child)?;
            let mut path: Vec<NodeId> = stack[start..]
              .iter()
              .map(|&(i, _)| self.nodes[i].id.clone())
              .collect();
            path.push(self.nodes[child].id.clone());
            return Some(path);
          }
          Color::Done => {}
        }
      }
    }

    None
  }
}

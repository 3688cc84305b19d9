use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a graph within a chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(String);

impl GraphId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for GraphId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for GraphId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

impl From<String> for GraphId {
  fn from(id: String) -> Self {
    Self(id)
  }
}

/// Identifier of a node, unique within its owning graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for NodeId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

impl From<String> for NodeId {
  fn from(id: String) -> Self {
    Self(id)
  }
}

/// A node addressed across the whole chain.
///
/// Ordering is by graph id first, then node id. The resolver relies on this
/// ordering for its within-level tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
  pub graph: GraphId,
  pub node: NodeId,
}

impl NodeRef {
  pub fn new(graph: impl Into<GraphId>, node: impl Into<NodeId>) -> Self {
    Self {
      graph: graph.into(),
      node: node.into(),
    }
  }
}

impl From<(&str, &str)> for NodeRef {
  fn from((graph, node): (&str, &str)) -> Self {
    Self::new(graph, node)
  }
}

impl fmt::Display for NodeRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.graph, self.node)
  }
}

use std::collections::BTreeMap;

use thiserror::Error;

use crate::ids::NodeRef;

/// Failure reported by a node action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
  message: String,
}

impl ActionError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}

/// Outputs of a node's direct dependencies, intra- and cross-graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInputs {
  values: BTreeMap<NodeRef, serde_json::Value>,
}

impl NodeInputs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, from: NodeRef, value: serde_json::Value) {
    self.values.insert(from, value);
  }

  pub fn get(&self, from: &NodeRef) -> Option<&serde_json::Value> {
    self.values.get(from)
  }

  /// Iterate inputs in (graph, node) order.
  pub fn iter(&self) -> impl Iterator<Item = (&NodeRef, &serde_json::Value)> {
    self.values.iter()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Render the inputs as a JSON object keyed by `graph/node`.
  pub fn to_json(&self) -> serde_json::Value {
    serde_json::Value::Object(
      self
        .values
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect(),
    )
  }
}

impl FromIterator<(NodeRef, serde_json::Value)> for NodeInputs {
  fn from_iter<I: IntoIterator<Item = (NodeRef, serde_json::Value)>>(iter: I) -> Self {
    Self {
      values: iter.into_iter().collect(),
    }
  }
}

/// The work a node performs.
///
/// Actions are opaque blocking calls. The executor runs each one on a worker
/// thread exactly once per run, handing it the outputs of its dependencies.
pub trait NodeAction: Send + Sync {
  fn execute(&self, inputs: &NodeInputs) -> Result<serde_json::Value, ActionError>;
}

impl<F> NodeAction for F
where
  F: Fn(&NodeInputs) -> Result<serde_json::Value, ActionError> + Send + Sync,
{
  fn execute(&self, inputs: &NodeInputs) -> Result<serde_json::Value, ActionError> {
    self(inputs)
  }
}

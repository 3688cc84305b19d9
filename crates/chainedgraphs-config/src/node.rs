use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub node_id: String,
  /// Predecessors within the same graph.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<String>,
  pub action: ActionDef,
}

/// Built-in node behaviours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDef {
  /// Return a fixed value.
  Const { value: serde_json::Value },
  /// Return the outputs of all dependencies keyed by `graph/node`.
  Collect,
  /// Fail with the given message.
  Fail { message: String },
  /// Block for `ms` milliseconds, then return the dependency outputs.
  Sleep { ms: u64 },
}

use serde::{Deserialize, Serialize};

use crate::enums::FailurePolicy;
use crate::node::NodeDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDef {
  pub name: String,
  pub graphs: Vec<GraphDef>,
  #[serde(default)]
  pub links: Vec<LinkDef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure_policy: Option<FailurePolicy>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDef {
  pub graph_id: String,
  pub nodes: Vec<NodeDef>,
}

/// A cross-graph dependency: `to` waits for `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDef {
  pub from: EndpointDef,
  pub to: EndpointDef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDef {
  pub graph: String,
  pub node: String,
}

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chainedgraphs_config::{ActionDef, ChainDef};
use chainedgraphs_executor::ExecutorConfig;
use chainedgraphs_graph::{ActionError, Chain, GraphBuilder, GraphError, NodeAction, NodeInputs};
use tracing::debug;

/// A chain built from a definition, with the executor settings it asked for.
pub struct LoadedChain {
  pub name: String,
  pub chain: Chain,
  pub config: ExecutorConfig,
}

/// Node behaviours available to chain files.
#[derive(Debug, Clone)]
pub enum BuiltinAction {
  Const(serde_json::Value),
  Collect,
  Fail(String),
  Sleep(Duration),
}

impl From<ActionDef> for BuiltinAction {
  fn from(def: ActionDef) -> Self {
    match def {
      ActionDef::Const { value } => BuiltinAction::Const(value),
      ActionDef::Collect => BuiltinAction::Collect,
      ActionDef::Fail { message } => BuiltinAction::Fail(message),
      ActionDef::Sleep { ms } => BuiltinAction::Sleep(Duration::from_millis(ms)),
    }
  }
}

impl NodeAction for BuiltinAction {
  fn execute(&self, inputs: &NodeInputs) -> Result<serde_json::Value, ActionError> {
    match self {
      BuiltinAction::Const(value) => Ok(value.clone()),
      BuiltinAction::Collect => Ok(inputs.to_json()),
      BuiltinAction::Fail(message) => Err(ActionError::new(message.clone())),
      BuiltinAction::Sleep(duration) => {
        std::thread::sleep(*duration);
        Ok(inputs.to_json())
      }
    }
  }
}

/// Read and parse a chain definition file.
pub async fn read_chain_def(path: &Path) -> Result<ChainDef> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read chain file: {}", path.display()))?;
  parse_chain_def(&content)
    .with_context(|| format!("failed to parse chain file: {}", path.display()))
}

pub fn parse_chain_def(content: &str) -> Result<ChainDef> {
  Ok(serde_json::from_str(content)?)
}

/// Build graphs and links from a definition.
///
/// Graphs are finalized one by one, so a malformed graph is reported before
/// any link is considered. Repeated links are accepted once.
pub fn load(def: ChainDef) -> Result<LoadedChain, GraphError> {
  let mut chain = Chain::new();

  for graph in def.graphs {
    let mut builder = GraphBuilder::new(graph.graph_id);
    for node in graph.nodes {
      let depends_on: Vec<&str> = node.depends_on.iter().map(String::as_str).collect();
      builder.add_node(node.node_id, BuiltinAction::from(node.action), &depends_on)?;
    }
    chain.add_graph(builder.finalize()?)?;
  }

  for link in def.links {
    let from = (link.from.graph.as_str(), link.from.node.as_str());
    let to = (link.to.graph.as_str(), link.to.node.as_str());
    if !chain.add_link(from, to)? {
      debug!(
        from = %format!("{}/{}", from.0, from.1),
        to = %format!("{}/{}", to.0, to.1),
        "duplicate_link_ignored"
      );
    }
  }

  let mut config = ExecutorConfig::default();
  if let Some(policy) = def.failure_policy {
    config = config.with_failure_policy(policy);
  }
  if let Some(max_workers) = def.max_workers {
    config = config.with_max_workers(max_workers);
  }

  Ok(LoadedChain {
    name: def.name,
    chain,
    config,
  })
}

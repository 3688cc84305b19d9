use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chainedgraphs_config::ChainDef;
use chainedgraphs_executor::{Executor, RunOutcome, RunReport};
use chainedgraphs_resolver::{LevelResolver, Resolver};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::loader;
use crate::report::LogReport;

const DEMO_CHAIN: &str = include_str!("../demos/etl.json");

/// Where the chain definition comes from.
#[derive(Debug, Clone)]
pub enum ChainSource {
  File(PathBuf),
  Demo,
}

/// Loads, resolves and runs one chain.
pub struct App {
  verbose: bool,
}

impl App {
  pub fn new(verbose: bool) -> Self {
    Self { verbose }
  }

  /// Run the chain to completion, printing node results as JSON on stdout.
  ///
  /// Returns an error for invalid definitions, cycles, failed nodes and
  /// interrupted runs.
  pub async fn run(&self, source: ChainSource) -> Result<()> {
    let def = match &source {
      ChainSource::File(path) => loader::read_chain_def(path).await?,
      ChainSource::Demo => loader::parse_chain_def(DEMO_CHAIN).context("failed to parse demo chain")?,
    };

    let cancel = CancellationToken::new();
    let interrupt = {
      let cancel = cancel.clone();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          warn!("interrupt_received");
          cancel.cancel();
        }
      })
    };

    let result = self.execute(def, cancel).await;
    interrupt.abort();

    let outcome = result?;
    println!("{}", serde_json::to_string_pretty(&outputs(&outcome))?);
    outcome.into_result().context("chain run did not succeed")?;
    Ok(())
  }

  async fn execute(&self, def: ChainDef, cancel: CancellationToken) -> Result<RunOutcome> {
    let loaded = loader::load(def).context("invalid chain definition")?;
    info!(
      chain = %loaded.name,
      graphs = loaded.chain.graphs().len(),
      nodes = loaded.chain.node_count(),
      links = loaded.chain.links().len(),
      "chain_loaded"
    );

    let plan = LevelResolver::new()
      .resolve(&loaded.chain)
      .with_context(|| format!("failed to resolve chain '{}'", loaded.name))?;

    let report: Arc<dyn RunReport> = Arc::new(LogReport::new(self.verbose));
    Executor::new(loaded.config)
      .run(&loaded.chain, &plan, report, cancel)
      .await
      .with_context(|| format!("failed to execute chain '{}'", loaded.name))
  }
}

/// Node results keyed by `graph/node`.
fn outputs(outcome: &RunOutcome) -> serde_json::Map<String, serde_json::Value> {
  outcome
    .results
    .iter()
    .map(|(node, result)| {
      let value = serde_json::to_value(result).unwrap_or(serde_json::Value::Null);
      (node.to_string(), value)
    })
    .collect()
}

//! Run report events and sinks.
//!
//! The executor emits one event when a node starts and one when it reaches a
//! terminal state. Nodes that never start emit only `Skipped`. What a sink
//! does with events (print, persist, aggregate) is up to the sink.

use chainedgraphs_graph::NodeRef;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::result::NodeResult;

/// Lifecycle phase reported for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePhase {
  Started,
  Succeeded,
  Failed,
  Skipped,
}

impl NodePhase {
  pub fn is_terminal(self) -> bool {
    !matches!(self, NodePhase::Started)
  }
}

/// A single node lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEvent {
  pub execution_id: String,
  pub node: NodeRef,
  pub phase: NodePhase,
  /// Output for successes, error for failures, reason for skips.
  pub detail: Option<String>,
}

impl NodeEvent {
  pub(crate) fn started(execution_id: &str, node: &NodeRef) -> Self {
    Self {
      execution_id: execution_id.to_string(),
      node: node.clone(),
      phase: NodePhase::Started,
      detail: None,
    }
  }

  pub(crate) fn terminal(execution_id: &str, node: &NodeRef, result: &NodeResult) -> Self {
    let (phase, detail) = match result {
      NodeResult::Succeeded { output, .. } => (NodePhase::Succeeded, output.to_string()),
      NodeResult::Failed { error, .. } => (NodePhase::Failed, error.clone()),
      NodeResult::Skipped { reason } => (NodePhase::Skipped, reason.to_string()),
    };
    Self {
      execution_id: execution_id.to_string(),
      node: node.clone(),
      phase,
      detail: Some(detail),
    }
  }
}

/// Receives node events during a run.
///
/// Called from the executor and from worker threads; implementations must
/// not block for long.
pub trait RunReport: Send + Sync {
  fn record(&self, event: NodeEvent);
}

/// A report that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopReport;

impl RunReport for NoopReport {
  fn record(&self, _event: NodeEvent) {}
}

/// A report that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelReport {
  // Unbounded so a slow consumer never stalls a worker. Volume is at most
  // two events per node.
  sender: mpsc::UnboundedSender<NodeEvent>,
}

impl ChannelReport {
  pub fn new(sender: mpsc::UnboundedSender<NodeEvent>) -> Self {
    Self { sender }
  }

  /// Create a report together with the receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<NodeEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl RunReport for ChannelReport {
  fn record(&self, event: NodeEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}

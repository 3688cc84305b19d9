//! chainedgraphs graph model
//!
//! This crate provides the input side of a chained run:
//! - [`Graph`]: an acyclic set of nodes with intra-graph edges, built through
//!   [`GraphBuilder`] and immutable once finalized
//! - [`ChainLinkTable`]: cross-graph dependencies between nodes of different graphs
//! - [`Chain`]: the registered graphs together with their links
//! - [`NodeAction`]: the single capability a node carries
//!
//! Ordering and execution live in `chainedgraphs-resolver` and
//! `chainedgraphs-executor`.

mod action;
mod chain;
mod error;
mod graph;
mod ids;
mod link;
mod node;

pub use action::{ActionError, NodeAction, NodeInputs};
pub use chain::Chain;
pub use error::GraphError;
pub use graph::{Graph, GraphBuilder};
pub use ids::{GraphId, NodeId, NodeRef};
pub use link::{ChainLink, ChainLinkTable, check_registered};
pub use node::Node;

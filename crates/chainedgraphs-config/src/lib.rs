//! chainedgraphs config
//!
//! This crate contains the serializable chain definition types. They describe
//! graphs, nodes and cross-graph links as plain data, before the binary's
//! loader validates them and turns them into a runnable chain.
//!
//! Definitions are read from JSON files passed on the command line.

mod chain;
mod enums;
mod node;

pub use chain::{ChainDef, EndpointDef, GraphDef, LinkDef};
pub use enums::FailurePolicy;
pub use node::{ActionDef, NodeDef};

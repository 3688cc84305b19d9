//! Executor for resolved chainedgraphs plans.
//!
//! # Architecture
//!
//! ```text
//! Executor
//! ├── new(config) - worker bound and failure policy
//! └── run(chain, plan, report, cancel) -> RunOutcome
//!
//! per level, in order
//! ├── skip nodes whose dependencies did not succeed
//! ├── acquire a worker permit (or observe cancellation)
//! ├── spawn_blocking(action.execute(inputs))
//! └── join every dispatched node before the next level
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use chainedgraphs_executor::{Executor, ExecutorConfig, NoopReport};
//!
//! let plan = LevelResolver::new().resolve(&chain)?;
//! let outcome = Executor::new(ExecutorConfig::default())
//!   .run(&chain, &plan, Arc::new(NoopReport), CancellationToken::new())
//!   .await?;
//! ```

mod config;
mod error;
mod events;
mod executor;
mod result;

pub use config::{ExecutorConfig, FailurePolicy};
pub use error::{ExecutionError, NodeFailure};
pub use events::{ChannelReport, NodeEvent, NodePhase, NoopReport, RunReport};
pub use executor::Executor;
pub use result::{NodeResult, NodeStatus, RunOutcome, RunStatus, SkipReason};

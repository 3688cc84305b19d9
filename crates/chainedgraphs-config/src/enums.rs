use serde::{Deserialize, Serialize};

/// What the executor does after a node fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
  /// Let the current level finish, then start no node of a later level.
  #[default]
  FailFast,
  /// Keep running every node whose dependencies all succeeded.
  BestEffort,
}

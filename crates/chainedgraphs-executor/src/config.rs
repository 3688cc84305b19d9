use std::num::NonZeroUsize;

pub use chainedgraphs_config::FailurePolicy;

/// Configuration for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
  /// Upper bound on actions running at once. Zero is treated as one.
  pub max_workers: usize,
  pub failure_policy: FailurePolicy,
}

impl ExecutorConfig {
  pub fn with_max_workers(mut self, max_workers: usize) -> Self {
    self.max_workers = max_workers;
    self
  }

  pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
    self.failure_policy = failure_policy;
    self
  }

  pub(crate) fn worker_count(&self) -> usize {
    self.max_workers.max(1)
  }
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      max_workers: std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1),
      failure_policy: FailurePolicy::default(),
    }
  }
}

use std::io::{self, Write};
use std::sync::Mutex;

use chainedgraphs_executor::{NodeEvent, NodePhase, RunReport};

/// Prints node events as one line each.
///
/// Failures and skips are always shown. Starts and successful outputs only
/// appear when verbose.
pub struct LogReport<W = io::Stderr> {
  verbose: bool,
  out: Mutex<W>,
}

impl LogReport {
  pub fn new(verbose: bool) -> Self {
    Self::with_writer(verbose, io::stderr())
  }
}

impl<W: Write + Send> LogReport<W> {
  pub fn with_writer(verbose: bool, out: W) -> Self {
    Self {
      verbose,
      out: Mutex::new(out),
    }
  }

  #[cfg(test)]
  fn into_inner(self) -> W {
    match self.out.into_inner() {
      Ok(out) => out,
      Err(poisoned) => poisoned.into_inner(),
    }
  }

  fn line(&self, event: &NodeEvent) -> Option<String> {
    let detail = event.detail.as_deref().unwrap_or_default();
    match event.phase {
      NodePhase::Started if self.verbose => Some(format!("[started]   {}", event.node)),
      NodePhase::Succeeded if self.verbose => {
        Some(format!("[succeeded] {} -> {}", event.node, detail))
      }
      NodePhase::Succeeded => Some(format!("[succeeded] {}", event.node)),
      NodePhase::Failed => Some(format!("[failed]    {}: {}", event.node, detail)),
      NodePhase::Skipped => Some(format!("[skipped]   {}: {}", event.node, detail)),
      NodePhase::Started => None,
    }
  }
}

impl<W: Write + Send> RunReport for LogReport<W> {
  fn record(&self, event: NodeEvent) {
    let Some(line) = self.line(&event) else {
      return;
    };
    if let Ok(mut out) = self.out.lock() {
      // Write errors are ignored.
      let _ = writeln!(out, "{}", line);
    }
  }
}

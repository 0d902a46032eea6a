use std::sync::atomic::{AtomicU64, Ordering};

/// How an accepted task's execution ended, as seen by the pool.
///
/// A task that returned `Err` counts as `Completed`: the pool does not look at
/// task results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
  Completed,
  Panicked,
}

/// Snapshot of a pool's monotonic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
  /// Tasks accepted by `submit`.
  pub submitted: u64,
  pub rejected: u64,
  /// Accepted tasks that finished, including those that panicked.
  pub completed: u64,
  pub panicked: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
  submitted: AtomicU64,
  rejected: AtomicU64,
  completed: AtomicU64,
  panicked: AtomicU64,
}

impl StatsRecorder {
  pub(crate) fn record_submitted(&self) {
    self.submitted.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn record_rejected(&self) {
    self.rejected.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn record_outcome(&self, outcome: TaskOutcome) {
    self.completed.fetch_add(1, Ordering::Relaxed);
    if outcome == TaskOutcome::Panicked {
      self.panicked.fetch_add(1, Ordering::Relaxed);
    }
  }

  pub(crate) fn snapshot(&self) -> PoolStats {
    PoolStats {
      submitted: self.submitted.load(Ordering::Relaxed),
      rejected: self.rejected.load(Ordering::Relaxed),
      completed: self.completed.load(Ordering::Relaxed),
      panicked: self.panicked.load(Ordering::Relaxed),
    }
  }
}

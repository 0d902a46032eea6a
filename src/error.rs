use thiserror::Error;

/// Errors reported by the bulkhead pool itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  #[error("Illegal pool size: {capacity}")]
  InvalidCapacity { capacity: usize },

  /// Every capacity token is held by an admitted task.
  #[error("pool is full")]
  PoolFull { capacity: usize },

  #[error("pool is closed: dispatch loop is no longer running")]
  QueueClosed,

  #[error("task panicked: {message}")]
  TaskPanicked { message: String },
}

/// Why a [`TaskContext`](crate::TaskContext) is done.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
  #[error("context cancelled")]
  Cancelled,

  #[error("context deadline exceeded")]
  DeadlineExceeded,
}

/// Errors returned by a task's own execution.
///
/// The pool never looks at these; they exist so task implementations have a
/// common error type to return (and so `ctx.check()?` works inside a task).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
  #[error("execution failed: {error}")]
  Failed { error: String },

  #[error("context cancelled")]
  Cancelled,

  #[error("context deadline exceeded")]
  DeadlineExceeded,

  #[error(transparent)]
  Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl TaskError {
  pub fn failed(error: impl Into<String>) -> Self {
    TaskError::Failed { error: error.into() }
  }

  /// Returns a short stable label (snake_case) for use in logs.
  pub fn as_label(&self) -> &'static str {
    match self {
      TaskError::Failed { .. } => "task_failed",
      TaskError::Cancelled => "task_cancelled",
      TaskError::DeadlineExceeded => "task_deadline_exceeded",
      TaskError::Other(_) => "task_other",
    }
  }
}

impl From<ContextError> for TaskError {
  fn from(err: ContextError) -> Self {
    match err {
      ContextError::Cancelled => TaskError::Cancelled,
      ContextError::DeadlineExceeded => TaskError::DeadlineExceeded,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejection_error_reads_pool_is_full() {
    let err = PoolError::PoolFull { capacity: 3 };
    assert_eq!(err.to_string(), "pool is full");
  }

  #[test]
  fn context_errors_convert_into_task_errors() {
    let err: TaskError = ContextError::DeadlineExceeded.into();
    assert_eq!(err.as_label(), "task_deadline_exceeded");
    let err: TaskError = ContextError::Cancelled.into();
    assert!(matches!(err, TaskError::Cancelled));
  }
}

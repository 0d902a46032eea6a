//! Explicit cancellation context handed to every task.
//!
//! A [`TaskContext`] bundles a [`CancellationToken`], an optional deadline and a
//! small immutable key/value bag. Contexts form a tree: children derived with
//! [`TaskContext::with_cancel`] or [`TaskContext::with_timeout`] are cancelled
//! when their parent is, and never outlive the parent's deadline.

use crate::error::ContextError;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct TaskContext {
  token: CancellationToken,
  deadline: Option<Instant>,
  values: Arc<HashMap<String, String>>,
}

impl TaskContext {
  /// An empty root context: no deadline, no values, cancelled only by an
  /// explicit [`cancel`](Self::cancel).
  pub fn background() -> Self {
    Self::default()
  }

  /// Returns this context with `key` bound to `value`. Cancellation scope and
  /// deadline are shared with `self`.
  pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    Arc::make_mut(&mut self.values).insert(key.into(), value.into());
    self
  }

  pub fn value(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  pub fn values(&self) -> &HashMap<String, String> {
    &self.values
  }

  /// Derives a child with its own cancellation scope.
  pub fn with_cancel(&self) -> TaskContext {
    TaskContext {
      token: self.token.child_token(),
      deadline: self.deadline,
      values: self.values.clone(),
    }
  }

  /// Derives a child that expires at `deadline`, or at the parent's deadline if
  /// that comes first.
  pub fn with_deadline(&self, deadline: Instant) -> TaskContext {
    let effective = match self.deadline {
      Some(parent) if parent <= deadline => parent,
      _ => deadline,
    };
    TaskContext {
      token: self.token.child_token(),
      deadline: Some(effective),
      values: self.values.clone(),
    }
  }

  /// A `timeout` too large to express as an instant adds no deadline; the
  /// child keeps the parent's.
  pub fn with_timeout(&self, timeout: Duration) -> TaskContext {
    match Instant::now().checked_add(timeout) {
      Some(deadline) => self.with_deadline(deadline),
      None => self.with_cancel(),
    }
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  /// Time left until the deadline; `Some(Duration::ZERO)` once it has passed.
  pub fn remaining(&self) -> Option<Duration> {
    self
      .deadline
      .map(|deadline| deadline.saturating_duration_since(Instant::now()))
  }

  /// Cancels this context and every context derived from it.
  pub fn cancel(&self) {
    self.token.cancel();
  }

  pub fn token(&self) -> &CancellationToken {
    &self.token
  }

  pub fn is_done(&self) -> bool {
    self.err().is_some()
  }

  /// Explicit cancellation takes precedence over an expired deadline.
  pub fn err(&self) -> Option<ContextError> {
    if self.token.is_cancelled() {
      return Some(ContextError::Cancelled);
    }
    match self.deadline {
      Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
      _ => None,
    }
  }

  pub fn check(&self) -> Result<(), ContextError> {
    match self.err() {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  /// Resolves once the context is cancelled or its deadline passes.
  pub async fn done(&self) {
    match self.deadline {
      Some(deadline) => {
        tokio::select! {
          _ = self.token.cancelled() => {},
          _ = tokio::time::sleep_until(deadline) => {},
        }
      }
      None => self.token.cancelled().await,
    }
  }
}

use crate::context::TaskContext;
use crate::error::{PoolError, TaskError};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The future a task hands to the pool for execution.
/// It must be `Send` and `'static`; the pool drives it on its own Tokio task.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

type RejectionHandler = Box<dyn Fn(&TaskContext, &str, &PoolError) + Send + Sync + 'static>;

/// A unit of work accepted by [`BulkheadPool`](crate::BulkheadPool).
///
/// `execute` receives a context whose deadline is bound to the pool's timeout.
/// The deadline is advisory: a task that never looks at `ctx` keeps running (and
/// keeps its capacity token) until it returns.
///
/// # Example
/// ```
/// use futures_bulkhead::{PoolError, Task, TaskContext, TaskError, TaskFuture};
///
/// struct Ping;
///
/// impl Task for Ping {
///   fn execute(&self, ctx: TaskContext) -> TaskFuture {
///     Box::pin(async move {
///       ctx.check()?;
///       Ok::<_, TaskError>(())
///     })
///   }
///
///   fn on_rejected(&self, _ctx: &TaskContext, message: &str, _error: &PoolError) {
///     eprintln!("ping rejected: {message}");
///   }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
  /// Produces the future doing the actual work.
  fn execute(&self, ctx: TaskContext) -> TaskFuture;

  /// Called synchronously from `submit`, on the submitter's thread, when the
  /// pool refuses the task.
  fn on_rejected(&self, _ctx: &TaskContext, message: &str, error: &PoolError) {
    tracing::debug!(%error, "Task rejected: {}", message);
  }
}

impl<T: Task + ?Sized> Task for Arc<T> {
  fn execute(&self, ctx: TaskContext) -> TaskFuture {
    (**self).execute(ctx)
  }

  fn on_rejected(&self, ctx: &TaskContext, message: &str, error: &PoolError) {
    (**self).on_rejected(ctx, message, error)
  }
}

impl<T: Task + ?Sized> Task for Box<T> {
  fn execute(&self, ctx: TaskContext) -> TaskFuture {
    (**self).execute(ctx)
  }

  fn on_rejected(&self, ctx: &TaskContext, message: &str, error: &PoolError) {
    (**self).on_rejected(ctx, message, error)
  }
}

/// Closure-backed task. The closure builds a fresh future per execution; share
/// state through `Arc` captured by the closure.
pub struct TaskFn<F> {
  f: F,
  rejection_handler: Option<RejectionHandler>,
}

impl<F> TaskFn<F> {
  pub fn new(f: F) -> Self {
    Self {
      f,
      rejection_handler: None,
    }
  }

  /// Sets the callback invoked when the pool rejects this task.
  pub fn with_rejection_handler(mut self, handler: impl Fn(&TaskContext, &str, &PoolError) + Send + Sync + 'static) -> Self {
    self.rejection_handler = Some(Box::new(handler));
    self
  }
}

impl<F> fmt::Debug for TaskFn<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskFn")
      .field("has_rejection_handler", &self.rejection_handler.is_some())
      .finish_non_exhaustive()
  }
}

impl<F, Fut> Task for TaskFn<F>
where
  F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
  fn execute(&self, ctx: TaskContext) -> TaskFuture {
    Box::pin((self.f)(ctx))
  }

  fn on_rejected(&self, ctx: &TaskContext, message: &str, error: &PoolError) {
    match &self.rejection_handler {
      Some(handler) => handler(ctx, message, error),
      None => tracing::debug!(%error, "Task rejected: {}", message),
    }
  }
}

/// A submitted task paired with the caller's context, from admission until the
/// runner consumes it.
pub(crate) struct ContextualTask {
  pub(crate) task_id: u64,
  pub(crate) ctx: TaskContext,
  pub(crate) task: Box<dyn Task>,
}

impl fmt::Debug for ContextualTask {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContextualTask")
      .field("task_id", &self.task_id)
      .field("ctx", &self.ctx)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[tokio::test]
  async fn task_fn_runs_closure_with_context() {
    let task = TaskFn::new(|ctx: TaskContext| async move {
      match ctx.value("who") {
        Some("tester") => Ok(()),
        _ => Err(TaskError::failed("missing value")),
      }
    });

    let ctx = TaskContext::background().with_value("who", "tester");
    assert!(task.execute(ctx).await.is_ok());
    assert!(task.execute(TaskContext::background()).await.is_err());
  }

  #[test]
  fn task_fn_forwards_rejection_to_handler() {
    let rejections = Arc::new(AtomicUsize::new(0));
    let counter = rejections.clone();
    let task = Arc::new(
      TaskFn::new(|_ctx: TaskContext| async { Ok::<(), TaskError>(()) }).with_rejection_handler(move |_ctx, message, _err| {
        assert_eq!(message, "pool is full");
        counter.fetch_add(1, Ordering::SeqCst);
      }),
    );

    let err = PoolError::PoolFull { capacity: 1 };
    // Through the Arc blanket impl.
    task.on_rejected(&TaskContext::background(), &err.to_string(), &err);
    assert_eq!(rejections.load(Ordering::SeqCst), 1);
  }
}

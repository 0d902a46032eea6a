use crate::recover;
use crate::stats::{StatsRecorder, TaskOutcome};
use crate::task::ContextualTask;
use crate::task_queue::Admitted;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, trace};

/// Runs one admitted task to completion on the current Tokio task.
///
/// The task sees a child of its submitter's context bound to `timeout`. A panic,
/// either while building the future or while polling it, is logged and swallowed.
/// The capacity token goes back to the set when this future finishes or is
/// dropped, whichever way the task ended.
pub(crate) async fn run_admitted_task(
  pool_name: Arc<String>,
  timeout: Duration,
  admitted: Admitted,
  stats: Arc<StatsRecorder>,
) {
  let Admitted { entry, token: _token } = admitted;

  let ContextualTask { task_id, ctx, task } = entry;

  let started = recover::recover(|| {
    let deadline_ctx = ctx.with_timeout(timeout);
    let future = task.execute(deadline_ctx.clone());
    (deadline_ctx, future)
  });

  let execution = match started {
    Ok((deadline_ctx, future)) => {
      // Cancel the child scope on exit so nothing derived from it outlives the run.
      let _cancel_on_exit = deadline_ctx.token().clone().drop_guard();
      recover::recover_future(future).await
    }
    Err(err) => Err(err),
  };

  let outcome = match execution {
    Ok(result) => {
      let result = match &result {
        Ok(()) => "ok",
        Err(err) => err.as_label(),
      };
      trace!(pool_name = %*pool_name, %task_id, result, "Task completed.");
      TaskOutcome::Completed
    }
    Err(err) => {
      error!(pool_name = %*pool_name, %task_id, "Task terminated abnormally: {}", err);
      TaskOutcome::Panicked
    }
  };
  stats.record_outcome(outcome);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::TaskContext;
  use crate::error::{ContextError, TaskError};
  use crate::task::{Task, TaskFn};
  use crate::task_queue::{QueueProducer, TaskQueue};
  use std::sync::atomic::{AtomicBool, Ordering};

  async fn admit(task: impl Task) -> (QueueProducer, Admitted) {
    let (producer, mut consumer) = TaskQueue::new(1).split();
    producer
      .try_push(ContextualTask {
        task_id: 0,
        ctx: TaskContext::background(),
        task: Box::new(task),
      })
      .unwrap();
    let admitted = consumer.recv().await.unwrap();
    (producer, admitted)
  }

  #[tokio::test]
  async fn token_is_released_after_a_panic() {
    fn explode() -> Result<(), TaskError> {
      panic!("boom")
    }
    let task = TaskFn::new(|_ctx: TaskContext| async { explode() });
    let (producer, admitted) = admit(task).await;
    assert_eq!(producer.tokens().available(), 0);

    let stats = Arc::new(StatsRecorder::default());
    run_admitted_task(Arc::new("runner".to_string()), Duration::from_secs(1), admitted, stats.clone()).await;

    assert_eq!(producer.tokens().available(), 1);
    assert_eq!(stats.snapshot().panicked, 1);
  }

  #[tokio::test]
  async fn token_is_released_after_a_task_error() {
    let task = TaskFn::new(|_ctx: TaskContext| async { Err::<(), TaskError>(TaskError::failed("nope")) });
    let (producer, admitted) = admit(task).await;

    let stats = Arc::new(StatsRecorder::default());
    run_admitted_task(Arc::new("runner".to_string()), Duration::from_secs(1), admitted, stats.clone()).await;

    assert_eq!(producer.tokens().available(), 1);
    assert_eq!(stats.snapshot().completed, 1);
    assert_eq!(stats.snapshot().panicked, 0);
  }

  #[tokio::test]
  async fn unrepresentable_timeout_still_runs_the_task() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let task = TaskFn::new(move |ctx: TaskContext| {
      let flag = flag.clone();
      async move {
        flag.store(ctx.deadline().is_none(), Ordering::SeqCst);
        Ok::<(), TaskError>(())
      }
    });
    let (producer, admitted) = admit(task).await;

    let stats = Arc::new(StatsRecorder::default());
    run_admitted_task(Arc::new("runner".to_string()), Duration::MAX, admitted, stats.clone()).await;

    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(stats.snapshot().completed, 1);
    assert_eq!(stats.snapshot().panicked, 0);
    assert_eq!(producer.tokens().available(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn task_observes_deadline_derived_from_timeout() {
    let saw_deadline = Arc::new(AtomicBool::new(false));
    let flag = saw_deadline.clone();
    let task = TaskFn::new(move |ctx: TaskContext| {
      let flag = flag.clone();
      async move {
        ctx.done().await;
        flag.store(ctx.err() == Some(ContextError::DeadlineExceeded), Ordering::SeqCst);
        Ok::<(), TaskError>(())
      }
    });
    let (producer, admitted) = admit(task).await;

    let stats = Arc::new(StatsRecorder::default());
    run_admitted_task(Arc::new("runner".to_string()), Duration::from_millis(50), admitted, stats.clone()).await;

    assert!(saw_deadline.load(Ordering::SeqCst));
    assert_eq!(producer.tokens().available(), 1);
  }
}

use crate::config::PoolConfig;
use crate::context::TaskContext;
use crate::error::PoolError;
use crate::runner;
use crate::stats::{PoolStats, StatsRecorder};
use crate::task::{ContextualTask, Task};
use crate::task_queue::{QueueConsumer, QueueProducer, Rejected, TaskQueue};

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle as TokioHandle;
use tracing::{debug, info, info_span, trace, Instrument};

lazy_static::lazy_static! {
  static ref NEXT_POOL_TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// A bulkhead: runs at most `capacity` tasks at once and turns away the rest.
///
/// `submit` never waits. It either takes one of the pool's capacity tokens and
/// queues the task for the dispatch loop, or calls the task's
/// [`on_rejected`](Task::on_rejected) and returns [`PoolError::PoolFull`].
/// Every accepted task runs on its own Tokio task with a context whose deadline
/// is the pool's timeout; its token is returned when it finishes, however it
/// finishes.
///
/// The dispatch loop lives as long as the pool. There is no shutdown: dropping
/// the pool stops the loop once the queue is drained, and tasks already running
/// are left to complete.
#[derive(Debug)]
pub struct BulkheadPool {
  pool_name: Arc<String>,
  timeout: Duration,
  producer: QueueProducer,
  stats: Arc<StatsRecorder>,
}

impl BulkheadPool {
  /// Creates a pool named "bulkhead" on the current Tokio runtime.
  ///
  /// # Panics
  /// Panics if `capacity` is zero, or if called outside a Tokio runtime.
  pub fn new(capacity: usize, timeout_millis: u64) -> Arc<Self> {
    let config = match PoolConfig::builder()
      .capacity(capacity)
      .timeout_millis(timeout_millis)
      .build()
    {
      Ok(config) => config,
      Err(err) => panic!("{}", err),
    };
    Self::with_config(config, TokioHandle::current())
  }

  /// Creates a pool from a validated config, spawning its dispatch loop on `tokio_handle`.
  pub fn with_config(config: PoolConfig, tokio_handle: TokioHandle) -> Arc<Self> {
    let (producer, consumer) = TaskQueue::new(config.capacity).split();
    let pool_name = Arc::new(config.name);
    let stats = Arc::new(StatsRecorder::default());

    let worker_pool_name = pool_name.clone();
    let worker_stats = stats.clone();
    let worker_tokio_handle = tokio_handle.clone();
    let timeout = config.timeout;

    tokio_handle.spawn(
      async move {
        Self::run_dispatch_loop(worker_pool_name, timeout, consumer, worker_tokio_handle, worker_stats).await;
      }
      .instrument(info_span!("bulkhead_dispatch_loop", name = %*pool_name)),
    );

    Arc::new(Self {
      pool_name,
      timeout,
      producer,
      stats,
    })
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  pub fn capacity(&self) -> usize {
    self.producer.tokens().capacity()
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  /// Tokens currently free for new submissions.
  pub fn available_tokens(&self) -> usize {
    self.producer.tokens().available()
  }

  /// Tasks admitted and not yet completed (queued or running).
  pub fn in_flight(&self) -> usize {
    self.capacity() - self.available_tokens()
  }

  pub fn stats(&self) -> PoolStats {
    self.stats.snapshot()
  }

  /// Admits `task` if a capacity token is free.
  ///
  /// Runs entirely on the caller's thread and does not need to be called from
  /// inside the runtime. On rejection, `task.on_rejected` is called before this
  /// returns.
  ///
  /// # Errors
  /// Returns `PoolError::PoolFull` when every token is held, or
  /// `PoolError::QueueClosed` if the dispatch loop is no longer running (its
  /// runtime was shut down).
  pub fn submit<T: Task>(&self, ctx: TaskContext, task: T) -> Result<(), PoolError> {
    let task_id = NEXT_POOL_TASK_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let entry = ContextualTask {
      task_id,
      ctx,
      task: Box::new(task),
    };

    match self.producer.try_push(entry) {
      Ok(()) => {
        self.stats.record_submitted();
        debug!(
          pool_name = %*self.pool_name,
          %task_id,
          available = self.available_tokens(),
          "Submitted task."
        );
        Ok(())
      }
      Err(Rejected { entry, error }) => {
        self.stats.record_rejected();
        debug!(
          pool_name = %*self.pool_name,
          %task_id,
          capacity = self.capacity(),
          "Rejected task: {}", error
        );
        entry.task.on_rejected(&entry.ctx, &error.to_string(), &error);
        Err(error)
      }
    }
  }

  async fn run_dispatch_loop(
    pool_name: Arc<String>,
    timeout: Duration,
    mut consumer: QueueConsumer,
    tasks_tokio_handle: TokioHandle,
    stats: Arc<StatsRecorder>,
  ) {
    info!(name = %*pool_name, "Dispatch loop started.");

    while let Some(admitted) = consumer.recv().await {
      let task_id = admitted.entry.task_id;
      trace!(name = %*pool_name, %task_id, "Dequeued task. Spawning runner.");

      tasks_tokio_handle.spawn(
        runner::run_admitted_task(pool_name.clone(), timeout, admitted, stats.clone())
          .instrument(info_span!("bulkhead_task", pool_name = %*pool_name, %task_id)),
      );
    }

    info!(name = %*pool_name, "Task queue closed. Dispatch loop stopped.");
  }
}

impl Drop for BulkheadPool {
  fn drop(&mut self) {
    debug!(
      pool_name = %*self.pool_name,
      in_flight = self.in_flight(),
      "BulkheadPool dropped. Dispatch loop will stop once the queue is drained."
    );
  }
}

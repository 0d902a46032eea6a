use futures_bulkhead::{BulkheadPool, Task, TaskContext, TaskError, TaskFn};
use std::time::Duration;
use tracing::info;

const THREAD_NAME: &str = "thread_name";

fn sleeping_task(delay_ms: u64) -> impl Task {
  TaskFn::new(move |ctx: TaskContext| {
    async move {
      let name = ctx.value(THREAD_NAME).unwrap_or("?").to_string();
      info!("Task {} starting, deadline in {:?}, will sleep for {}ms", name, ctx.remaining(), delay_ms);
      tokio::select! {
        _ = ctx.done() => {
          info!("Task {} stopped early: {:?}", name, ctx.err());
          ctx.check()?;
        }
        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
          info!("Task {} finished after {}ms", name, delay_ms);
        }
      }
      Ok::<(), TaskError>(())
    }
  })
  .with_rejection_handler(|ctx, message, _err| {
    info!("Task {} rejected: {}", ctx.value(THREAD_NAME).unwrap_or("?"), message);
  })
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Basic Usage Example ---");

  // Two slots, 300ms deadline per task.
  let pool = BulkheadPool::new(2, 300);

  for i in 0..4u64 {
    let ctx = TaskContext::background().with_value(THREAD_NAME, i.to_string());
    // The third and fourth submissions find both slots taken.
    match pool.submit(ctx, sleeping_task(100 + i * 200)) {
      Ok(()) => info!("Submitted task {}", i),
      Err(e) => info!("Submit for task {} failed: {}", i, e),
    }
  }

  tokio::time::sleep(Duration::from_millis(500)).await;
  info!("Stats: {:?}", pool.stats());
  info!("--- Basic Usage Example End ---");
}

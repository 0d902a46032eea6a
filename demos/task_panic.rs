use futures_bulkhead::{BulkheadPool, TaskContext, TaskError, TaskFn};
use std::time::Duration;
use tracing::info;

fn explode() -> Result<(), TaskError> {
  panic!("This task is designed to panic!")
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Task Panic Example ---");

  let pool = BulkheadPool::new(1, 200);

  let panicking = TaskFn::new(|_ctx: TaskContext| async {
    info!("Panicking Task: Starting...");
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("Panicking Task: About to panic!");
    explode()
  });
  pool
    .submit(TaskContext::background(), panicking)
    .expect("pool should have a free slot");

  // The panic is isolated and the single slot is handed back.
  while pool.in_flight() > 0 {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  info!("Slot released after panic. Stats: {:?}", pool.stats());

  let healthy = TaskFn::new(|_ctx: TaskContext| async {
    info!("Healthy Task: running after the panic.");
    Ok::<(), TaskError>(())
  });
  pool
    .submit(TaskContext::background(), healthy)
    .expect("slot should be free again");

  tokio::time::sleep(Duration::from_millis(50)).await;
  info!("Final stats: {:?}", pool.stats());
  info!("--- Task Panic Example End ---");
}

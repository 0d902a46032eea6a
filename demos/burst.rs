use futures_bulkhead::{BulkheadPool, TaskContext, TaskError, TaskFn};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .with_target(false)
    .init();

  info!("--- Burst Example (capacity 100, 1000 submitters) ---");

  let pool = BulkheadPool::new(100, 50);
  let completed = Arc::new(AtomicU64::new(0));

  let delays: Vec<u64> = {
    let mut rng = rand::rng();
    (0..1000).map(|_| rng.random_range(0..100)).collect()
  };

  let mut submitters = Vec::with_capacity(delays.len());
  for (i, delay_ms) in delays.into_iter().enumerate() {
    let pool = pool.clone();
    let completed = completed.clone();
    submitters.push(tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(delay_ms)).await;
      let task = TaskFn::new(move |_ctx: TaskContext| {
        let completed = completed.clone();
        async move {
          tokio::time::sleep(Duration::from_millis(50)).await;
          completed.fetch_add(1, Ordering::Relaxed);
          Ok::<(), TaskError>(())
        }
      });
      let ctx = TaskContext::background().with_value("thread_name", i.to_string());
      pool.submit(ctx, task).is_ok()
    }));
  }

  let mut accepted = 0u64;
  for submitter in submitters {
    if let Ok(true) = submitter.await {
      accepted += 1;
    }
  }

  while pool.in_flight() > 0 {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  info!(
    "Accepted: {}, completed: {}, stats: {:?}",
    accepted,
    completed.load(Ordering::Relaxed),
    pool.stats()
  );
  info!("--- Burst Example End ---");
}

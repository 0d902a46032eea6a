//! A Tokio-based bulkhead: a bounded pool that runs at most `capacity` futures
//! at once, rejects excess work instead of queuing it, hands every accepted task
//! a deadline, and keeps a panicking task from taking anything else down.

mod config;
mod context;
mod error;
mod pool;
mod recover;
mod runner;
mod stats;
mod task;
mod task_queue;

pub use config::{PoolConfig, PoolConfigBuilder};
pub use context::TaskContext;
pub use error::{ContextError, PoolError, TaskError};
pub use pool::BulkheadPool;
pub use recover::{panic_message, recover, recover_future};
pub use stats::PoolStats;
pub use task::{Task, TaskFn, TaskFuture};

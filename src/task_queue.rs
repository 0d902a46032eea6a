use crate::error::PoolError;
use crate::task::ContextualTask;

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

/// A fixed set of `capacity` interchangeable tokens.
///
/// Acquisition never waits. A token goes back to the set when its
/// [`CapacityToken`] is dropped, so release can neither fail nor block.
#[derive(Debug, Clone)]
pub(crate) struct CapacityTokens {
  semaphore: Arc<Semaphore>,
  capacity: usize,
}

impl CapacityTokens {
  pub(crate) fn new(capacity: usize) -> Self {
    Self {
      semaphore: Arc::new(Semaphore::new(capacity)),
      capacity,
    }
  }

  pub(crate) fn try_acquire(&self) -> Option<CapacityToken> {
    match self.semaphore.clone().try_acquire_owned() {
      Ok(permit) => Some(CapacityToken { _permit: permit }),
      Err(_) => None,
    }
  }

  pub(crate) fn available(&self) -> usize {
    self.semaphore.available_permits()
  }

  pub(crate) fn capacity(&self) -> usize {
    self.capacity
  }
}

/// One token taken from [`CapacityTokens`]. Returned to the set on drop.
#[derive(Debug)]
pub(crate) struct CapacityToken {
  _permit: OwnedSemaphorePermit,
}

/// An accepted task together with the token it holds. The token stays with the
/// task through dispatch and execution.
pub(crate) struct Admitted {
  pub(crate) entry: ContextualTask,
  pub(crate) token: CapacityToken,
}

impl fmt::Debug for Admitted {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Admitted")
      .field("task_id", &self.entry.task_id)
      .finish_non_exhaustive()
  }
}

/// A push that was refused. The entry is handed back so the caller can notify
/// the task.
#[derive(Debug)]
pub(crate) struct Rejected {
  pub(crate) entry: ContextualTask,
  pub(crate) error: PoolError,
}

/// The admission queue and the token set as a single bounded structure.
///
/// The underlying channel is unbounded, but every message in it owns a
/// [`CapacityToken`], so it never holds more than `capacity` entries and a full
/// queue can only ever coincide with an exhausted token set.
#[derive(Debug)]
pub(crate) struct TaskQueue {
  tx: mpsc::UnboundedSender<Admitted>,
  rx: mpsc::UnboundedReceiver<Admitted>,
  tokens: CapacityTokens,
}

impl TaskQueue {
  pub(crate) fn new(capacity: usize) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      tx,
      rx,
      tokens: CapacityTokens::new(capacity),
    }
  }

  /// Splits the queue into its producer and consumer halves.
  pub(crate) fn split(self) -> (QueueProducer, QueueConsumer) {
    (
      QueueProducer {
        tx: self.tx,
        tokens: self.tokens,
      },
      QueueConsumer { rx: self.rx },
    )
  }
}

/// Producer half, owned by the pool's admission gate.
#[derive(Debug)]
pub(crate) struct QueueProducer {
  tx: mpsc::UnboundedSender<Admitted>,
  tokens: CapacityTokens,
}

impl QueueProducer {
  /// Takes a token and enqueues `entry` without waiting.
  ///
  /// Fails with [`PoolError::PoolFull`] when no token is left, or
  /// [`PoolError::QueueClosed`] when the consumer is gone. A token taken for a
  /// failed send is released before returning.
  pub(crate) fn try_push(&self, entry: ContextualTask) -> Result<(), Rejected> {
    let token = match self.tokens.try_acquire() {
      Some(token) => token,
      None => {
        return Err(Rejected {
          entry,
          error: PoolError::PoolFull {
            capacity: self.tokens.capacity(),
          },
        })
      }
    };

    match self.tx.send(Admitted { entry, token }) {
      Ok(()) => Ok(()),
      Err(mpsc::error::SendError(admitted)) => {
        let Admitted { entry, token } = admitted;
        drop(token);
        Err(Rejected {
          entry,
          error: PoolError::QueueClosed,
        })
      }
    }
  }

  pub(crate) fn tokens(&self) -> &CapacityTokens {
    &self.tokens
  }
}

/// Consumer half. Not clonable: the dispatch loop is the only reader.
#[derive(Debug)]
pub(crate) struct QueueConsumer {
  rx: mpsc::UnboundedReceiver<Admitted>,
}

impl QueueConsumer {
  /// Waits for the next admitted task. `None` once every producer is dropped
  /// and the queue is drained.
  pub(crate) async fn recv(&mut self) -> Option<Admitted> {
    self.rx.recv().await
  }
}

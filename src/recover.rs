//! Run a closure or future and turn a panic into a [`PoolError::TaskPanicked`].

use crate::error::PoolError;

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&'static str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_string()
  }
}

/// Calls `f`, capturing a panic as an error value.
pub fn recover<F, R>(f: F) -> Result<R, PoolError>
where
  F: FnOnce() -> R,
{
  panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| PoolError::TaskPanicked {
    message: panic_message(payload.as_ref()),
  })
}

/// Drives `future` to completion, capturing a panic raised while polling it.
pub async fn recover_future<Fut>(future: Fut) -> Result<Fut::Output, PoolError>
where
  Fut: Future,
{
  AssertUnwindSafe(future)
    .catch_unwind()
    .await
    .map_err(|payload| PoolError::TaskPanicked {
      message: panic_message(payload.as_ref()),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn recover_passes_through_values() {
    assert_eq!(recover(|| 41 + 1), Ok(42));
  }

  #[test]
  fn recover_captures_str_and_string_payloads() {
    let err = recover(|| panic!("static message")).unwrap_err();
    assert_eq!(
      err,
      PoolError::TaskPanicked {
        message: "static message".to_string()
      }
    );

    let id = 7;
    let err = recover(|| panic!("task {} exploded", id)).unwrap_err();
    assert_eq!(err.to_string(), "task panicked: task 7 exploded");
  }

  #[test]
  fn unknown_payloads_get_a_placeholder() {
    let err = recover(|| std::panic::panic_any(17u32)).unwrap_err();
    assert_eq!(
      err,
      PoolError::TaskPanicked {
        message: "unknown panic payload".to_string()
      }
    );
  }

  #[tokio::test]
  async fn recover_future_captures_panics_after_an_await() {
    let result = recover_future(async {
      tokio::task::yield_now().await;
      panic!("late failure");
    })
    .await;

    assert!(matches!(result, Err(PoolError::TaskPanicked { message }) if message == "late failure"));
  }
}

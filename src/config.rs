//! Configuration for a [`BulkheadPool`](crate::BulkheadPool).

use crate::error::PoolError;

use std::time::Duration;

use tokio::sync::Semaphore;

const DEFAULT_NAME: &str = "bulkhead";
const DEFAULT_CAPACITY: usize = 25;
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Validated pool settings. Capacity and timeout are fixed for the pool's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
  pub(crate) name: String,
  pub(crate) capacity: usize,
  pub(crate) timeout: Duration,
}

impl PoolConfig {
  pub fn builder() -> PoolConfigBuilder {
    PoolConfigBuilder::new()
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }
}

/// Builder for [`PoolConfig`].
#[derive(Debug, Clone)]
pub struct PoolConfigBuilder {
  name: String,
  capacity: usize,
  timeout: Duration,
}

impl PoolConfigBuilder {
  /// Creates a builder with default values.
  pub fn new() -> Self {
    Self {
      name: DEFAULT_NAME.to_string(),
      capacity: DEFAULT_CAPACITY,
      timeout: DEFAULT_TIMEOUT,
    }
  }

  /// Name used in log fields.
  ///
  /// Default: "bulkhead"
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Maximum number of tasks admitted and not yet completed.
  ///
  /// Default: 25
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  /// Deadline given to each task, measured from the moment it starts running.
  ///
  /// Default: 1s
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn timeout_millis(self, millis: u64) -> Self {
    self.timeout(Duration::from_millis(millis))
  }

  /// # Errors
  /// Returns [`PoolError::InvalidCapacity`] for a capacity of zero or one the
  /// underlying semaphore cannot represent.
  pub fn build(self) -> Result<PoolConfig, PoolError> {
    if self.capacity == 0 || self.capacity > Semaphore::MAX_PERMITS {
      return Err(PoolError::InvalidCapacity {
        capacity: self.capacity,
      });
    }
    Ok(PoolConfig {
      name: self.name,
      capacity: self.capacity,
      timeout: self.timeout,
    })
  }
}

impl Default for PoolConfigBuilder {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_applied() {
    let config = PoolConfig::builder().build().unwrap();
    assert_eq!(config.name(), "bulkhead");
    assert_eq!(config.capacity(), 25);
    assert_eq!(config.timeout(), Duration::from_secs(1));
  }

  #[test]
  fn overrides_are_kept() {
    let config = PoolConfig::builder()
      .name("payments")
      .capacity(4)
      .timeout_millis(50)
      .build()
      .unwrap();
    assert_eq!(config.name(), "payments");
    assert_eq!(config.capacity(), 4);
    assert_eq!(config.timeout(), Duration::from_millis(50));
  }

  #[test]
  fn zero_capacity_is_rejected() {
    let err = PoolConfig::builder().capacity(0).build().unwrap_err();
    assert_eq!(err, PoolError::InvalidCapacity { capacity: 0 });
    assert_eq!(err.to_string(), "Illegal pool size: 0");
  }

  #[test]
  fn zero_timeout_is_allowed() {
    let config = PoolConfig::builder().timeout_millis(0).build().unwrap();
    assert_eq!(config.timeout(), Duration::ZERO);
  }
}

//! Client-wide dispatch configuration.

use std::time::Duration;

/// Retry and deadline parameters for acknowledged calls.
///
/// One config is supplied when the dispatcher is built and applies to every
/// call it makes. `total_timeout: None` means retry forever at
/// `resend_interval` cadence; callers that need bounded blocking must set a
/// timeout.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Interval between request resends while no reply has arrived.
    pub resend_interval: Duration,

    /// Upper bound on the whole call, measured from the first send.
    /// `None` means unbounded.
    pub total_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            resend_interval: Duration::from_millis(500),
            total_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl ClientConfig {
    /// Create a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `resend_interval` is zero, or exceeds
    /// `total_timeout` when one is set (no resend could ever fire before
    /// the deadline).
    pub fn new(
        resend_interval: Duration,
        total_timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            resend_interval,
            total_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a config that retries forever at the given cadence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroResendInterval`] for a zero interval.
    pub fn unbounded(resend_interval: Duration) -> Result<Self, ConfigError> {
        Self::new(resend_interval, None)
    }

    /// Check the invariants between the two durations.
    ///
    /// Run once at dispatcher construction, never per call.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resend_interval.is_zero() {
            return Err(ConfigError::ZeroResendInterval);
        }
        if let Some(timeout) = self.total_timeout {
            if self.resend_interval > timeout {
                return Err(ConfigError::ResendExceedsTimeout {
                    resend_interval: self.resend_interval,
                    total_timeout: timeout,
                });
            }
        }
        Ok(())
    }
}

/// Invalid [`ClientConfig`] detected at construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The resend interval is zero, which would busy-spin the retry loop.
    #[error("resend interval must be non-zero")]
    ZeroResendInterval,

    /// The resend interval is longer than the total timeout, so the call
    /// would expire before any resend.
    #[error("resend interval {resend_interval:?} exceeds total timeout {total_timeout:?}")]
    ResendExceedsTimeout {
        /// Configured resend interval.
        resend_interval: Duration,
        /// Configured total timeout.
        total_timeout: Duration,
    },
}

//! Store configuration, built once at startup and passed in explicitly.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the row lock timeout in milliseconds.
pub const LOCK_TIMEOUT_ENV: &str = "LOYALTY_LOCK_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: expected a number of milliseconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// How long a unit waits for a row lock. `None` blocks until the lock is free.
    pub lock_timeout: Option<Duration>,
}

impl StoreConfig {
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Build the config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lock_timeout = match lookup(LOCK_TIMEOUT_ENV) {
            None => None,
            Some(raw) => {
                let millis = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout {
                        var: LOCK_TIMEOUT_ENV,
                        value: raw.clone(),
                    })?;
                Some(Duration::from_millis(millis))
            }
        };
        Ok(Self { lock_timeout })
    }
}

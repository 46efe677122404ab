//! Configuration for consistency checks.

use crate::key::DEFAULT_KEY_FIELD;
use std::time::Duration;

/// Options for a collection diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Identity field used to align documents.
    pub key_field: String,
}

impl DiffOptions {
    /// Creates options with the default key field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identity field.
    #[must_use]
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            key_field: DEFAULT_KEY_FIELD.to_string(),
        }
    }
}

/// Configuration for retrying transient catalog errors.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry. Zero re-queries immediately.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Creates a configuration that re-queries immediately up to
    /// `max_attempts` times.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Configuration for replica-set and index consistency checks.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConfig {
    /// Options for each collection diff.
    pub diff: DiffOptions,
    /// Retry behaviour for catalog queries.
    pub retry: RetryConfig,
    /// Databases never compared. Defaults to `local`, whose collections are
    /// not replicated.
    pub excluded_databases: Vec<String>,
}

impl CheckConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the diff options.
    #[must_use]
    pub fn with_diff(mut self, diff: DiffOptions) -> Self {
        self.diff = diff;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Adds a database to the exclusion list.
    #[must_use]
    pub fn exclude_database(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.excluded_databases.contains(&name) {
            self.excluded_databases.push(name);
        }
        self
    }

    /// Returns true if the database is excluded from checks.
    pub fn is_excluded(&self, database: &str) -> bool {
        self.excluded_databases.iter().any(|d| d == database)
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            diff: DiffOptions::default(),
            retry: RetryConfig::default(),
            excluded_databases: vec!["local".to_string()],
        }
    }
}

//! Retry configuration for provider create calls
//!
//! The poller never retries a state query. Some create calls, however, fail
//! with a known transient provider error (Databricks returns
//! `UnknownWorkerEnvironmentException` for a while after a workspace is
//! created) and are worth re-issuing after a delay.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whole-call retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay in seconds before each retry
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Provider error codes that are worth retrying
    #[serde(default = "default_retryable_codes")]
    pub retryable_codes: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_secs: default_delay_secs(),
            retryable_codes: default_retryable_codes(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// True if `code` is one of the retryable provider error codes
    pub fn is_retryable(&self, code: &str) -> bool {
        self.retryable_codes.iter().any(|c| c == code)
    }
}

// Default value functions for serde
fn default_max_retries() -> u32 {
    2
}

fn default_delay_secs() -> u64 {
    600
}

fn default_retryable_codes() -> Vec<String> {
    vec!["UnknownWorkerEnvironmentException".to_string()]
}

//! Unified error handling for cloudpoll-core
//!
//! Query failures, timeouts and workflow failures share one error type with
//! helper predicates so callers can decide what to do without matching on
//! every variant.
//!
//! # Example
//!
//! ```rust
//! use cloudpoll_core::CoreError;
//! use std::time::Duration;
//!
//! let err = CoreError::Timeout {
//!     operation_id: "vol-123".to_string(),
//!     last_state: Some("detaching".to_string()),
//!     elapsed: Duration::from_secs(3605),
//! };
//! assert!(err.is_timeout());
//! assert!(!err.is_query_failure());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by a caller-supplied state query or provider call
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for polling and provider workflows
#[derive(Error, Debug)]
pub enum CoreError {
    /// The state query itself failed; polling was aborted
    #[error("State query failed: {0}")]
    Query(#[source] BoxError),

    /// The operation never reached a terminal state in time
    #[error(
        "Operation {operation_id} timed out after {}s (last state: {})",
        elapsed.as_secs(),
        last_state.as_deref().unwrap_or("unknown")
    )]
    Timeout {
        operation_id: String,
        last_state: Option<String>,
        elapsed: Duration,
    },

    /// The operation reached a terminal state that means failure
    #[error("Operation {operation_id} failed in state '{state}': {message}")]
    OperationFailed {
        operation_id: String,
        state: String,
        message: String,
    },

    /// The resource is not in a state that allows the operation to start
    #[error("{0}")]
    Precondition(String),

    /// Request parameters rejected before any provider call
    #[error("Validation error: {0}")]
    Validation(String),

    /// A provider call failed with an identifiable error code
    #[error("Provider error {code}: {message}")]
    Provider { code: String, message: String },

    /// HTTP transport error while querying state
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Wrap an arbitrary error as a query failure
    pub fn query<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        CoreError::Query(err.into())
    }

    /// Returns true if polling gave up waiting for a terminal state
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::Timeout { .. } => true,
            CoreError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if the state query or its transport failed
    #[must_use]
    pub fn is_query_failure(&self) -> bool {
        matches!(self, CoreError::Query(_) | CoreError::Http(_))
    }

    /// Returns the provider error code, if this is a provider error
    #[must_use]
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            CoreError::Provider { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// Returns true if re-running the whole operation might succeed
    ///
    /// The poller itself never retries; this is for callers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Timeout { .. } => true,
            CoreError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigError> for CoreError {
    fn from(err: crate::config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_includes_last_state() {
        let err = CoreError::Timeout {
            operation_id: "vol-1".to_string(),
            last_state: Some("detaching".to_string()),
            elapsed: Duration::from_secs(3605),
        };
        let msg = err.to_string();
        assert!(msg.contains("vol-1"));
        assert!(msg.contains("3605s"));
        assert!(msg.contains("detaching"));
        assert!(err.is_timeout());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_timeout_without_state() {
        let err = CoreError::Timeout {
            operation_id: "snap-1".to_string(),
            last_state: None,
            elapsed: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("unknown"));
    }

    #[test]
    fn test_query_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = CoreError::query(io);
        assert!(err.is_query_failure());
        assert!(!err.is_timeout());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_query_from_string() {
        let err = CoreError::query("access denied");
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_provider_code() {
        let err = CoreError::Provider {
            code: "UnknownWorkerEnvironmentException".to_string(),
            message: "workspace not ready".to_string(),
        };
        assert_eq!(err.provider_code(), Some("UnknownWorkerEnvironmentException"));
        assert!(!err.is_query_failure());

        let other = CoreError::Precondition("nope".to_string());
        assert_eq!(other.provider_code(), None);
        assert_eq!(other.to_string(), "nope");
    }

    #[test]
    fn test_validation_is_not_retryable() {
        let err = CoreError::Validation("num_workers must be at least 2".to_string());
        assert!(err.to_string().starts_with("Validation error"));
        assert!(!err.is_retryable());
        assert!(!err.is_query_failure());
    }

    #[test]
    fn test_operation_failed_display() {
        let err = CoreError::OperationFailed {
            operation_id: "snap-9".to_string(),
            state: "error".to_string(),
            message: "snapshot creation failed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("snap-9"));
        assert!(msg.contains("'error'"));
        assert!(!err.is_retryable());
    }
}

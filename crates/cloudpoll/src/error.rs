//! Error types for cloudpoll
//!
//! Structured CLI errors with suggestions, printed as cargo-style diagnostics.

use colored::Colorize;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Timed out waiting for vol-0abc after 3605s (last state: detaching)
///
///   tip: increase the timeout: cloudpoll wait <url> --timeout <secs>
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<String>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    pub fn tip(mut self, description: &str) -> Self {
        self.tips.push(description.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for description in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
        }
    }
}

/// Main error type for the cloudpoll application
#[derive(Error, Debug)]
pub enum CloudPollError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Timed out waiting for {operation_id} after {elapsed_secs}s (last state: {last_state})")]
    Timeout {
        operation_id: String,
        elapsed_secs: u64,
        last_state: String,
    },

    #[error("State query failed: {message}")]
    QueryFailed { message: String },

    #[error("Provider returned {code}: {message}")]
    ProviderError { code: String, message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    #[error("File error for '{path}': {message}")]
    FileError { path: String, message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for cloudpoll operations
pub type Result<T> = std::result::Result<T, CloudPollError>;

impl CloudPollError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CloudPollError::Timeout { .. } => vec![
                "Increase the timeout: cloudpoll wait <url> --timeout <secs>".to_string(),
                "Set a per-kind default in the config file: cloudpoll config path".to_string(),
                "Check that the terminal states match what the endpoint reports".to_string(),
            ],
            CloudPollError::QueryFailed { message } if message.contains("No state found") => vec![
                "Point at the state field: cloudpoll wait <url> --state-pointer /path/to/state"
                    .to_string(),
                "Inspect the raw response with curl to find the field".to_string(),
            ],
            CloudPollError::QueryFailed { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the status endpoint URL is correct".to_string(),
            ],
            CloudPollError::ProviderError { code, .. } if code == "401" || code == "403" => vec![
                "Pass a token: cloudpoll wait <url> --token <token>".to_string(),
                "Or set CLOUDPOLL_TOKEN in the environment".to_string(),
            ],
            CloudPollError::ProviderError { code, .. } if code == "404" => vec![
                "Verify the operation id in the URL is correct".to_string(),
            ],
            CloudPollError::InvalidInput { .. } => vec![
                "Check the command syntax: cloudpoll wait --help".to_string(),
                "List known kinds: cloudpoll kinds".to_string(),
            ],
            CloudPollError::Configuration(_) => vec![
                "Find the config file: cloudpoll config path".to_string(),
                "interval_secs must be greater than zero".to_string(),
            ],
            CloudPollError::FileError { path, .. } => vec![
                format!("Check that the directory for {} exists", path),
                "Verify file permissions are correct".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }

        diag.print();
    }
}

impl From<serde_json::Error> for CloudPollError {
    fn from(err: serde_json::Error) -> Self {
        CloudPollError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<serde_yaml::Error> for CloudPollError {
    fn from(err: serde_yaml::Error) -> Self {
        CloudPollError::OutputError {
            message: format!("YAML error: {}", err),
        }
    }
}

impl From<cloudpoll_core::ConfigError> for CloudPollError {
    fn from(err: cloudpoll_core::ConfigError) -> Self {
        CloudPollError::Configuration(err.to_string())
    }
}

impl From<cloudpoll_core::CoreError> for CloudPollError {
    fn from(err: cloudpoll_core::CoreError) -> Self {
        use cloudpoll_core::CoreError;

        match err {
            CoreError::Timeout {
                operation_id,
                last_state,
                elapsed,
            } => CloudPollError::Timeout {
                operation_id,
                elapsed_secs: elapsed.as_secs(),
                last_state: last_state.unwrap_or_else(|| "unknown".to_string()),
            },
            CoreError::Provider { code, message } => {
                CloudPollError::ProviderError { code, message }
            }
            CoreError::Query(e) => CloudPollError::QueryFailed {
                message: e.to_string(),
            },
            CoreError::Http(e) => CloudPollError::QueryFailed {
                message: e.to_string(),
            },
            CoreError::Validation(message) | CoreError::Precondition(message) => {
                CloudPollError::InvalidInput { message }
            }
            CoreError::OperationFailed { .. } => CloudPollError::OperationFailed {
                message: err.to_string(),
            },
            CoreError::Config(msg) => CloudPollError::Configuration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpoll_core::CoreError;
    use std::time::Duration;

    #[test]
    fn test_timeout_maps_with_last_state() {
        let err = CloudPollError::from(CoreError::Timeout {
            operation_id: "vol-0abc".to_string(),
            last_state: Some("detaching".to_string()),
            elapsed: Duration::from_secs(3605),
        });
        let msg = err.to_string();
        assert!(msg.contains("vol-0abc"));
        assert!(msg.contains("3605s"));
        assert!(msg.contains("detaching"));
        assert!(err.suggestions()[0].contains("--timeout"));
    }

    #[test]
    fn test_missing_state_suggests_pointer() {
        let err = CloudPollError::from(CoreError::query("No state found at '/state' in response"));
        assert!(err.suggestions()[0].contains("--state-pointer"));
    }

    #[test]
    fn test_unauthorized_suggests_token() {
        let err = CloudPollError::from(CoreError::Provider {
            code: "401".to_string(),
            message: "unauthorized".to_string(),
        });
        assert!(err.suggestions().iter().any(|s| s.contains("--token")));
    }
}

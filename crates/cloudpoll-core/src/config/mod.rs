//! Configuration for polling and provider retries
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! Settings live in a single TOML file:
//!
//! - Per-operation poll timeout and interval overrides
//! - The retry policy for cluster creation
//! - Environment variable expansion in the file contents
//! - Platform-specific config file location

pub mod config;
pub mod error;
pub mod retry;

// Re-export main types for convenience
pub use config::Config;
pub use error::{ConfigError, Result};
pub use retry::RetryConfig;

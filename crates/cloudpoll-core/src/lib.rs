//! # cloudpoll-core
//!
//! Drive long-running cloud provider operations to completion.
//!
//! Provider APIs that attach a volume, snapshot it, stop a database or create
//! a cluster return immediately; the resource then settles in the background.
//! This crate provides one poller for all of them plus the "start and wait"
//! workflows built on it.
//!
//! ## Layers
//!
//! - **[`Poller`]** - check a state query until it is terminal or the
//!   timeout is exceeded, reporting progress between checks
//! - **[`operation`]** - the known operation kinds, their terminal states and
//!   default timeouts
//! - **Workflows** - [`ebs`], [`rds`] and [`databricks`] handlers that start
//!   an operation through a caller-implemented provider trait and wait for it
//! - **[`http`]** - a state query that reads a JSON status endpoint
//! - **[`config`]** - per-kind poll settings and the cluster retry policy
//!
//! ## Example
//!
//! ```rust,ignore
//! use cloudpoll_core::{Poller, ProgressEvent};
//! use std::time::Duration;
//!
//! let state = Poller::new("snap-0abc", ["completed", "error"])
//!     .timeout(Duration::from_secs(3600))
//!     .interval(Duration::from_secs(5))
//!     .on_progress(|event: &ProgressEvent| println!("{}", event.message()))
//!     .run(|| api.snapshot_state("snap-0abc"))
//!     .await?;
//! ```

pub mod config;
pub mod databricks;
pub mod ebs;
pub mod error;
pub mod http;
pub mod operation;
pub mod poller;
pub mod progress;
pub mod rds;

// Re-export config types
pub use config::{Config, ConfigError, RetryConfig};

// Re-export error types
pub use error::{BoxError, CoreError, Result};

// Re-export polling
pub use operation::{OperationKind, PollSettings, PollableOperation};
pub use poller::{Poller, poll_until};
pub use progress::{ProgressCallback, ProgressEvent, ProgressSink};

// Re-export the HTTP state query
pub use http::HttpStateQuery;

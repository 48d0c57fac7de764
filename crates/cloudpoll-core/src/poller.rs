//! Poll a long-running provider operation until it reaches a terminal state
//!
//! Provider APIs that attach volumes, take snapshots or stop instances return
//! immediately and leave the caller to watch the resource until it settles.
//! [`Poller`] does that watching: it runs a caller-supplied state query, stops
//! as soon as the state is terminal, and otherwise sleeps for the poll
//! interval and checks again until the timeout is exceeded.
//!
//! The elapsed time is a counter advanced by one interval per sleep, not a
//! wall clock, so a 3600s timeout with a 5s interval allows exactly 721
//! checks. The comparison is strict: the loop keeps going while
//! `elapsed == timeout`.
//!
//! Query errors are not retried. They abort polling and are returned as-is;
//! retrying the whole operation is the caller's decision.
//!
//! # Example
//!
//! ```rust,ignore
//! use cloudpoll_core::{OperationKind, Poller, ProgressEvent};
//!
//! let state = Poller::for_kind("vol-0abc", OperationKind::VolumeDetach)
//!     .on_progress(|event: &ProgressEvent| println!("{}", event.message()))
//!     .run(|| async { api.attachment_state("vol-0abc", "i-123").await })
//!     .await?;
//! assert_eq!(state, "detached");
//! ```

use crate::error::{CoreError, Result};
use crate::operation::{OperationKind, PollSettings, PollableOperation};
use crate::progress::{ProgressCallback, ProgressEvent, ProgressSink, emit};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives a state query to a terminal state or a timeout
pub struct Poller {
    operation_id: String,
    terminal: Vec<String>,
    settings: PollSettings,
    on_progress: Option<ProgressCallback>,
}

impl Poller {
    /// Create a poller with the default volume/snapshot settings (3600s / 5s)
    pub fn new<I, T>(operation_id: impl Into<String>, terminal: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            operation_id: operation_id.into(),
            terminal: terminal.into_iter().map(Into::into).collect(),
            settings: PollSettings::default(),
            on_progress: None,
        }
    }

    /// Create a poller with the terminal states and default settings of `kind`
    pub fn for_kind(operation_id: impl Into<String>, kind: OperationKind) -> Self {
        Self::new(operation_id, kind.terminal_states().iter().copied())
            .settings(kind.default_settings())
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.settings.interval = interval;
        self
    }

    pub fn settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Report progress to `sink`
    pub fn on_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.on_progress = Some(Box::new(sink));
        self
    }

    /// Report progress to an optional, already boxed sink
    pub fn with_progress(mut self, sink: Option<ProgressCallback>) -> Self {
        self.on_progress = sink;
        self
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Exact, case-sensitive membership in the terminal set
    pub fn is_terminal(&self, state: &str) -> bool {
        self.terminal.iter().any(|t| t == state)
    }

    /// Poll `fetch_state` until it returns a terminal state
    ///
    /// The first check always happens, even with a zero timeout. After each
    /// non-terminal check one [`ProgressEvent::Polling`] is emitted, the task
    /// sleeps for the interval, and the elapsed counter advances; once it is
    /// strictly greater than the timeout polling fails with
    /// [`CoreError::Timeout`] without another check.
    ///
    /// A zero interval is rejected with [`CoreError::Validation`] before
    /// the first check.
    pub async fn run<S, F, Fut, E>(&self, mut fetch_state: F) -> Result<S>
    where
        S: AsRef<str>,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<S, E>>,
        E: Into<CoreError>,
    {
        self.settings.validate()?;
        let mut operation = PollableOperation::new(self.operation_id.as_str(), self.settings);
        let sink = self.on_progress.as_deref();

        info!(
            operation_id = %self.operation_id,
            timeout_secs = self.settings.timeout.as_secs(),
            interval_secs = self.settings.interval.as_secs(),
            "Waiting for operation to reach one of {:?}",
            self.terminal
        );

        loop {
            let state = match fetch_state().await {
                Ok(state) => state,
                Err(e) => {
                    let err = e.into();
                    debug!(operation_id = %self.operation_id, "State query failed: {}", err);
                    return Err(err);
                }
            };

            debug!(
                operation_id = %self.operation_id,
                state = state.as_ref(),
                elapsed_secs = operation.elapsed().as_secs(),
                "Checked operation state"
            );

            if self.is_terminal(state.as_ref()) {
                info!(
                    operation_id = %self.operation_id,
                    state = state.as_ref(),
                    "Operation reached terminal state"
                );
                emit(
                    sink,
                    ProgressEvent::Completed {
                        operation_id: self.operation_id.clone(),
                        state: state.as_ref().to_string(),
                        elapsed: operation.elapsed(),
                    },
                );
                return Ok(state);
            }

            emit(
                sink,
                ProgressEvent::Polling {
                    operation_id: self.operation_id.clone(),
                    state: state.as_ref().to_string(),
                    elapsed: operation.elapsed(),
                },
            );
            operation.observe(state);

            tokio::time::sleep(self.settings.interval).await;
            operation.advance();

            if operation.is_timed_out() {
                let elapsed = operation.elapsed();
                let last_state = operation
                    .into_last_state()
                    .map(|s| s.as_ref().to_string());

                warn!(
                    operation_id = %self.operation_id,
                    elapsed_secs = elapsed.as_secs(),
                    "Operation timed out in state {:?}",
                    last_state
                );
                emit(
                    sink,
                    ProgressEvent::TimedOut {
                        operation_id: self.operation_id.clone(),
                        last_state: last_state.clone(),
                        elapsed,
                    },
                );
                return Err(CoreError::Timeout {
                    operation_id: self.operation_id.clone(),
                    last_state,
                    elapsed,
                });
            }
        }
    }
}

/// Poll `fetch_state` once per `settings.interval` until it reports one of `terminal`
///
/// Shorthand for building a [`Poller`] when the workflow already has its
/// settings and sink at hand.
pub async fn poll_until<S, F, Fut, E>(
    operation_id: &str,
    terminal: &[&str],
    settings: PollSettings,
    on_progress: Option<ProgressCallback>,
    fetch_state: F,
) -> Result<S>
where
    S: AsRef<str>,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<S, E>>,
    E: Into<CoreError>,
{
    Poller::new(operation_id, terminal.iter().copied())
        .settings(settings)
        .with_progress(on_progress)
        .run(fetch_state)
        .await
}

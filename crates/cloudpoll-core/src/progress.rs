//! Progress reporting for long-running provider operations
//!
//! The poller emits one [`ProgressEvent::Polling`] per non-terminal check,
//! followed by a single [`ProgressEvent::Completed`] or
//! [`ProgressEvent::TimedOut`]. Where the events go is up to the caller:
//! the CLI drives a spinner, a host job log might append lines to a file.
//!
//! A failing sink never aborts polling; the failure is logged and the
//! operation carries on.

use crate::error::BoxError;
use serde::Serialize;
use std::time::Duration;

/// Progress events emitted while polling an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A check returned a non-terminal state; the poller is about to sleep
    Polling {
        operation_id: String,
        state: String,
        #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
        elapsed: Duration,
    },
    /// A terminal state was observed
    Completed {
        operation_id: String,
        state: String,
        #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
        elapsed: Duration,
    },
    /// The timeout was exceeded before a terminal state was observed
    TimedOut {
        operation_id: String,
        last_state: Option<String>,
        #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
        elapsed: Duration,
    },
}

impl ProgressEvent {
    /// The operation this event belongs to
    pub fn operation_id(&self) -> &str {
        match self {
            ProgressEvent::Polling { operation_id, .. }
            | ProgressEvent::Completed { operation_id, .. }
            | ProgressEvent::TimedOut { operation_id, .. } => operation_id,
        }
    }

    /// Human-readable one-liner, the kind of message a job log shows
    pub fn message(&self) -> String {
        match self {
            ProgressEvent::Polling {
                operation_id,
                state,
                elapsed,
            } => format!("{}: {} ({}s)", operation_id, state, elapsed.as_secs()),
            ProgressEvent::Completed {
                operation_id,
                state,
                ..
            } => format!("{}: {}", operation_id, state),
            ProgressEvent::TimedOut {
                operation_id,
                elapsed,
                ..
            } => format!(
                "{}: still not finished after {}s",
                operation_id,
                elapsed.as_secs()
            ),
        }
    }
}

fn as_secs<S>(elapsed: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(elapsed.as_secs())
}

/// Destination for progress events
///
/// Implemented for any `Fn(&ProgressEvent)` closure, so most callers never
/// name this trait:
///
/// ```rust
/// use cloudpoll_core::{Poller, ProgressEvent};
///
/// let poller = Poller::new("vol-123", ["detached"])
///     .on_progress(|event: &ProgressEvent| println!("{}", event.message()));
/// ```
pub trait ProgressSink: Send + Sync {
    /// Deliver one event. Errors are logged by the caller and otherwise ignored.
    fn report(&self, event: &ProgressEvent) -> std::result::Result<(), BoxError>;
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) -> std::result::Result<(), BoxError> {
        self(event);
        Ok(())
    }
}

/// Boxed sink, as stored by the poller and accepted by the workflows
pub type ProgressCallback = Box<dyn ProgressSink>;

/// Deliver an event to an optional sink, logging sink failures
pub(crate) fn emit(sink: Option<&dyn ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = sink
        && let Err(e) = sink.report(&event)
    {
        tracing::warn!(
            operation_id = event.operation_id(),
            "Progress sink failed: {}",
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FailingSink;

    impl ProgressSink for FailingSink {
        fn report(&self, _event: &ProgressEvent) -> std::result::Result<(), BoxError> {
            Err("job log unavailable".into())
        }
    }

    fn polling(state: &str, secs: u64) -> ProgressEvent {
        ProgressEvent::Polling {
            operation_id: "vol-1".to_string(),
            state: state.to_string(),
            elapsed: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_closure_is_a_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: &ProgressEvent| seen.lock().unwrap().push(event.clone());
        emit(Some(&sink), polling("detaching", 5));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failing_sink_is_not_fatal() {
        emit(Some(&FailingSink), polling("detaching", 5));
    }

    #[test]
    fn test_no_sink() {
        emit(None, polling("detaching", 5));
    }

    #[test]
    fn test_message() {
        assert_eq!(polling("attaching", 10).message(), "vol-1: attaching (10s)");

        let timed_out = ProgressEvent::TimedOut {
            operation_id: "snap-1".to_string(),
            last_state: Some("pending".to_string()),
            elapsed: Duration::from_secs(3605),
        };
        assert_eq!(timed_out.operation_id(), "snap-1");
        assert!(timed_out.message().contains("3605s"));
    }

    #[test]
    fn test_event_serializes_with_tag_and_seconds() {
        let value = serde_json::to_value(polling("detaching", 15)).unwrap();
        assert_eq!(value["event"], "polling");
        assert_eq!(value["state"], "detaching");
        assert_eq!(value["elapsed_secs"], 15);
    }
}

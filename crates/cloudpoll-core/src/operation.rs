//! Pollable operations and the catalogue of known operation kinds

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default timeout for volume and snapshot operations (1 hour)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default polling interval for volume and snapshot operations (5 seconds)
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Timeout and interval for one kind of operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Give up once more than this much time has been counted
    #[serde(rename = "timeout_secs", with = "secs")]
    pub timeout: Duration,
    /// Wait between successive checks
    #[serde(rename = "interval_secs", with = "secs")]
    pub interval: Duration,
}

impl PollSettings {
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub const fn from_secs(timeout_secs: u64, interval_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(timeout_secs),
            Duration::from_secs(interval_secs),
        )
    }
}

impl PollSettings {
    /// A zero interval would never advance the elapsed counter
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(CoreError::Validation(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_INTERVAL)
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Known provider operations that are driven to completion by polling
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// EBS volume attach, waits for the attachment to report `attached`
    /// or fall back to `detached`
    VolumeAttach,
    /// EBS volume detach, waits until the instance is gone from the attachments
    VolumeDetach,
    /// EBS snapshot creation
    SnapshotCreate,
    /// RDS instance stop
    InstanceStop,
    /// RDS instance creation, settles on `available` or a failed status
    InstanceCreate,
    /// Databricks cluster creation
    ClusterCreate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::VolumeAttach,
        OperationKind::VolumeDetach,
        OperationKind::SnapshotCreate,
        OperationKind::InstanceStop,
        OperationKind::InstanceCreate,
        OperationKind::ClusterCreate,
    ];

    /// States after which polling stops, successful or not
    pub fn terminal_states(&self) -> &'static [&'static str] {
        match self {
            OperationKind::VolumeAttach => &["attached", "detached"],
            OperationKind::VolumeDetach => &["detached"],
            OperationKind::SnapshotCreate => &["completed", "error"],
            OperationKind::InstanceStop => &["stopped"],
            OperationKind::InstanceCreate => &[
                "available",
                "failed",
                "incompatible-parameters",
                "incompatible-restore",
                "deleting",
            ],
            OperationKind::ClusterCreate => &["RUNNING", "TERMINATED", "ERROR"],
        }
    }

    /// Settings used when the configuration has no override
    pub fn default_settings(&self) -> PollSettings {
        match self {
            OperationKind::VolumeAttach
            | OperationKind::VolumeDetach
            | OperationKind::SnapshotCreate => PollSettings::default(),
            OperationKind::InstanceStop => PollSettings::from_secs(3600, 60),
            OperationKind::InstanceCreate => PollSettings::from_secs(3000, 30),
            OperationKind::ClusterCreate => PollSettings::from_secs(3600, 30),
        }
    }

    /// Config-file key, e.g. `volume_detach`
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::VolumeAttach => "volume_attach",
            OperationKind::VolumeDetach => "volume_detach",
            OperationKind::SnapshotCreate => "snapshot_create",
            OperationKind::InstanceStop => "instance_stop",
            OperationKind::InstanceCreate => "instance_create",
            OperationKind::ClusterCreate => "cluster_create",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider-side state transition being watched by the poller
///
/// Created when polling starts and mutated by each check. Only the final
/// state matters to callers; the operation itself is never persisted.
#[derive(Debug, Clone)]
pub struct PollableOperation<S> {
    operation_id: String,
    current_state: Option<S>,
    elapsed: Duration,
    settings: PollSettings,
}

impl<S> PollableOperation<S> {
    pub fn new(operation_id: impl Into<String>, settings: PollSettings) -> Self {
        Self {
            operation_id: operation_id.into(),
            current_state: None,
            elapsed: Duration::ZERO,
            settings,
        }
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Last observed state, `None` before the first check
    pub fn current_state(&self) -> Option<&S> {
        self.current_state.as_ref()
    }

    /// Counted wait so far; advances only by whole poll intervals
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Record the result of one check
    pub fn observe(&mut self, state: S) {
        self.current_state = Some(state);
    }

    /// Count one poll interval
    pub fn advance(&mut self) {
        self.elapsed = self.elapsed.saturating_add(self.settings.interval);
    }

    /// Strictly past the timeout; equal is still in time
    pub fn is_timed_out(&self) -> bool {
        self.elapsed > self.settings.timeout
    }

    pub(crate) fn into_last_state(self) -> Option<S> {
        self.current_state
    }
}

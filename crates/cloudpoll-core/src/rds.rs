//! RDS database instance lifecycle: create until `available`, stop until `stopped`

use crate::error::{CoreError, Result};
use crate::operation::{OperationKind, PollSettings};
use crate::poller::poll_until;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Provider error code returned when the identifier is taken
pub const INSTANCE_ALREADY_EXISTS: &str = "DBInstanceAlreadyExists";

/// RDS operations needed by the create and stop workflows
#[async_trait]
pub trait DbInstanceApi: Send + Sync {
    /// Current `DBInstanceStatus`
    async fn instance_status(&self, instance_id: &str) -> Result<String>;

    /// Request a stop; returns the status from the response
    async fn stop_instance(&self, instance_id: &str) -> Result<String>;

    /// `CreateDBInstance`; returns the status from the response.
    ///
    /// Provider rejections should be reported as [`CoreError::Provider`]
    /// with the RDS error code.
    async fn create_instance(&self, spec: &DbInstanceSpec) -> Result<String>;
}

/// Parameters for a new PostgreSQL instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbInstanceSpec {
    pub instance_id: String,
    pub instance_class: String,
    pub engine_version: String,
    pub allocated_storage_gb: u32,
    pub storage_type: String,
    pub master_username: String,
    #[serde(default, skip_serializing)]
    pub master_password: String,
    pub backup_retention_days: u32,
    pub storage_encrypted: bool,
    /// Provisioned IOPS, only sent for `io1` storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<u32>,
}

impl DbInstanceSpec {
    pub fn new(
        instance_id: impl Into<String>,
        instance_class: impl Into<String>,
        engine_version: impl Into<String>,
        allocated_storage_gb: u32,
        storage_type: impl Into<String>,
    ) -> Self {
        let storage_type = storage_type.into();
        let iops = (storage_type == "io1").then_some(1000);
        Self {
            instance_id: instance_id.into(),
            instance_class: instance_class.into(),
            engine_version: engine_version.into(),
            allocated_storage_gb,
            storage_type,
            master_username: "postgres".to_string(),
            master_password: String::new(),
            backup_retention_days: 7,
            storage_encrypted: true,
            iops,
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.master_username = username.into();
        self.master_password = password.into();
        self
    }

    /// Reject parameters RDS would refuse before making the call
    pub fn validate(&self) -> Result<()> {
        if self.instance_id.is_empty() {
            return Err(CoreError::Validation("instance_id must not be empty".to_string()));
        }
        if self.allocated_storage_gb == 0 {
            return Err(CoreError::Validation(
                "allocated_storage_gb must be greater than zero".to_string(),
            ));
        }
        if self.master_password.is_empty() {
            return Err(CoreError::Validation(
                "master_password must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Create a database instance and wait until it is `available`
///
/// An identifier that already exists is a [`CoreError::Precondition`] and
/// nothing is polled. Any other terminal status is reported as
/// [`CoreError::OperationFailed`]. Returns the final status.
pub async fn create_instance_and_wait(
    api: &dyn DbInstanceApi,
    spec: &DbInstanceSpec,
    settings: PollSettings,
    on_progress: Option<ProgressCallback>,
) -> Result<String> {
    spec.validate()?;
    settings.validate()?;

    info!(
        instance_id = %spec.instance_id,
        instance_class = %spec.instance_class,
        "Creating database instance"
    );
    let status = match api.create_instance(spec).await {
        Ok(status) => status,
        Err(e) if e.provider_code() == Some(INSTANCE_ALREADY_EXISTS) => {
            return Err(CoreError::Precondition(format!(
                "Database instance {} exists already",
                spec.instance_id
            )));
        }
        Err(e) => return Err(e),
    };

    let status = if status == "available" {
        status
    } else {
        poll_until(
            &spec.instance_id,
            OperationKind::InstanceCreate.terminal_states(),
            settings,
            on_progress,
            || api.instance_status(&spec.instance_id),
        )
        .await?
    };

    if status != "available" {
        return Err(CoreError::OperationFailed {
            operation_id: spec.instance_id.clone(),
            state: status,
            message: "database instance did not become available".to_string(),
        });
    }

    info!(instance_id = %spec.instance_id, "Database instance available");
    Ok(status)
}

/// Stop a database instance and wait for it to be `stopped`
///
/// Only an `available` instance can be stopped. If the stop response already
/// says `stopped` no polling happens. Returns the final status.
pub async fn stop_instance_and_wait(
    api: &dyn DbInstanceApi,
    instance_id: &str,
    settings: PollSettings,
    on_progress: Option<ProgressCallback>,
) -> Result<String> {
    settings.validate()?;
    let status = api.instance_status(instance_id).await?;
    if status != "available" {
        return Err(CoreError::Precondition(format!(
            "Database instance {} is '{}', not available; it may already be stopped or busy",
            instance_id, status
        )));
    }

    info!(instance_id, "Stopping database instance");
    let status = api.stop_instance(instance_id).await?;
    if status == "stopped" {
        return Ok(status);
    }

    poll_until(
        instance_id,
        OperationKind::InstanceStop.terminal_states(),
        settings,
        on_progress,
        || api.instance_status(instance_id),
    )
    .await
}

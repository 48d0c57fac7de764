//! EBS volume workflows: attach, detach and snapshot, each waiting for completion
//!
//! The EC2 calls themselves are behind [`VolumeApi`], implemented by the
//! embedding application with whatever SDK it uses. These workflows add the
//! precondition checks and the wait.

use crate::error::{CoreError, Result};
use crate::operation::{OperationKind, PollSettings};
use crate::poller::poll_until;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Device name reserved for the instance's root volume
pub const ROOT_DEVICE: &str = "/dev/sda1";

/// EC2 volume operations needed by the workflows
#[async_trait]
pub trait VolumeApi: Send + Sync {
    /// Current volume state (`available`, `in-use`, ...)
    async fn volume_state(&self, volume_id: &str) -> Result<String>;

    /// Start attaching; returns the attachment state from the response
    async fn attach_volume(&self, volume_id: &str, instance_id: &str, device: &str)
    -> Result<String>;

    /// Start detaching; returns the attachment state from the response
    async fn detach_volume(&self, volume_id: &str, instance_id: &str, device: &str)
    -> Result<String>;

    /// State of the volume's attachment to `instance_id`, `None` if the
    /// instance is not among the volume's attachments
    async fn attachment_state(&self, volume_id: &str, instance_id: &str)
    -> Result<Option<String>>;

    /// Start a snapshot of the volume
    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<Snapshot>;

    /// Current snapshot state (`pending`, `completed`, `error`)
    async fn snapshot_state(&self, snapshot_id: &str) -> Result<String>;
}

/// Which volume to attach where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachRequest {
    pub volume_id: String,
    pub instance_id: String,
    pub device: String,
}

/// Attachment details for the caller to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeAttachment {
    pub volume_id: String,
    /// `None` after a detach
    pub instance_id: Option<String>,
    /// `None` after a detach
    pub device: Option<String>,
    /// Volume state once the attachment settled
    pub volume_state: String,
}

/// An EBS snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub volume_id: String,
    pub description: String,
    pub state: String,
}

/// Attach a volume to an instance and wait for the attachment
///
/// The volume must be `available` and the device must not be the root
/// device. The first check uses the state returned by the attach call.
/// An attachment that falls back to `detached` is reported as
/// [`CoreError::OperationFailed`].
pub async fn attach_volume_and_wait(
    api: &dyn VolumeApi,
    request: &AttachRequest,
    settings: PollSettings,
    on_progress: Option<ProgressCallback>,
) -> Result<VolumeAttachment> {
    settings.validate()?;
    if request.device == ROOT_DEVICE {
        return Err(CoreError::Precondition(format!(
            "{} is reserved for the root device; choose another device name",
            ROOT_DEVICE
        )));
    }

    let state = api.volume_state(&request.volume_id).await?;
    if state != "available" {
        return Err(CoreError::Precondition(format!(
            "Cannot attach volume {} while it is '{}'",
            request.volume_id,
            state.to_uppercase()
        )));
    }

    info!(
        volume_id = %request.volume_id,
        instance_id = %request.instance_id,
        device = %request.device,
        "Attaching volume"
    );
    let initial = api
        .attach_volume(&request.volume_id, &request.instance_id, &request.device)
        .await?;

    let mut seeded = Some(initial);
    let attachment_state = poll_until(
        &request.volume_id,
        OperationKind::VolumeAttach.terminal_states(),
        settings,
        on_progress,
        || {
            let seeded = seeded.take();
            async move {
                match seeded {
                    Some(state) => Ok::<_, CoreError>(state),
                    None => Ok(api
                        .attachment_state(&request.volume_id, &request.instance_id)
                        .await?
                        .unwrap_or_else(|| "attaching".to_string())),
                }
            }
        },
    )
    .await?;

    if attachment_state != "attached" {
        return Err(CoreError::OperationFailed {
            operation_id: request.volume_id.clone(),
            state: attachment_state,
            message: format!("volume was not attached to {}", request.instance_id),
        });
    }

    let volume_state = api.volume_state(&request.volume_id).await?;
    Ok(VolumeAttachment {
        volume_id: request.volume_id.clone(),
        instance_id: Some(request.instance_id.clone()),
        device: Some(request.device.clone()),
        volume_state,
    })
}

/// Detach a volume from an instance and wait until it is gone from the attachments
///
/// The volume must be `in-use`.
pub async fn detach_volume_and_wait(
    api: &dyn VolumeApi,
    request: &AttachRequest,
    settings: PollSettings,
    on_progress: Option<ProgressCallback>,
) -> Result<VolumeAttachment> {
    settings.validate()?;
    let state = api.volume_state(&request.volume_id).await?;
    if !state.eq_ignore_ascii_case("in-use") {
        return Err(CoreError::Precondition(format!(
            "Cannot detach volume {} while it is '{}'",
            request.volume_id,
            state.to_uppercase()
        )));
    }

    info!(
        volume_id = %request.volume_id,
        instance_id = %request.instance_id,
        "Detaching volume"
    );
    let initial = api
        .detach_volume(&request.volume_id, &request.instance_id, &request.device)
        .await?;

    let mut seeded = Some(initial);
    poll_until(
        &request.volume_id,
        OperationKind::VolumeDetach.terminal_states(),
        settings,
        on_progress,
        || {
            let seeded = seeded.take();
            async move {
                match seeded {
                    Some(state) => Ok::<_, CoreError>(state),
                    None => Ok(api
                        .attachment_state(&request.volume_id, &request.instance_id)
                        .await?
                        .unwrap_or_else(|| "detached".to_string())),
                }
            }
        },
    )
    .await?;

    let volume_state = api.volume_state(&request.volume_id).await?;
    Ok(VolumeAttachment {
        volume_id: request.volume_id.clone(),
        instance_id: None,
        device: None,
        volume_state,
    })
}

/// Snapshot a volume and wait for the snapshot to complete
///
/// A snapshot ending in `error` is returned as [`CoreError::OperationFailed`].
pub async fn create_snapshot_and_wait(
    api: &dyn VolumeApi,
    volume_id: &str,
    settings: PollSettings,
    on_progress: Option<ProgressCallback>,
) -> Result<Snapshot> {
    settings.validate()?;
    let description = format!("Volume Snapshot for {}", volume_id);
    let mut snapshot = api.create_snapshot(volume_id, &description).await?;
    info!(
        volume_id,
        snapshot_id = %snapshot.snapshot_id,
        "Snapshot started"
    );

    let mut seeded = Some(snapshot.state.clone());
    let snapshot_id = snapshot.snapshot_id.clone();
    let state = poll_until(
        &snapshot_id,
        OperationKind::SnapshotCreate.terminal_states(),
        settings,
        on_progress,
        || {
            let seeded = seeded.take();
            let snapshot_id = snapshot_id.as_str();
            async move {
                match seeded {
                    Some(state) => Ok(state),
                    None => api.snapshot_state(snapshot_id).await,
                }
            }
        },
    )
    .await?;

    if state == "error" {
        return Err(CoreError::OperationFailed {
            operation_id: snapshot.snapshot_id,
            state,
            message: format!("Snapshot of volume {} failed", volume_id),
        });
    }

    snapshot.state = state;
    Ok(snapshot)
}

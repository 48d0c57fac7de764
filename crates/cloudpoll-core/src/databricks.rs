//! Databricks cluster creation with retry on transient workspace errors
//!
//! A freshly created workspace rejects cluster creation with
//! `UnknownWorkerEnvironmentException` for several minutes. The create call
//! is therefore retried as a whole, after a delay, when it fails with one of
//! the configured retryable codes. Once a cluster id is known the cluster is
//! polled until it settles.

use crate::config::RetryConfig;
use crate::error::{CoreError, Result};
use crate::operation::{OperationKind, PollSettings};
use crate::poller::poll_until;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Smallest worker count accepted for a cluster
pub const MIN_WORKERS: u32 = 2;

/// Bounds for `autotermination_minutes`
pub const AUTOTERMINATION_RANGE: std::ops::RangeInclusive<u32> = 10..=10000;

/// Workspace cluster endpoints needed by the workflow
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// `POST /api/2.0/clusters/create`; returns the new cluster id.
    ///
    /// Provider rejections should be reported as [`CoreError::Provider`]
    /// with the Databricks `error_code` so retries can match on it.
    async fn create_cluster(&self, spec: &ClusterSpec) -> Result<String>;

    /// `GET /api/2.0/clusters/get`
    async fn get_cluster(&self, cluster_id: &str) -> Result<ClusterInfo>;
}

/// Parameters for a new cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub cluster_name: String,
    pub spark_version: String,
    pub node_type_id: String,
    pub num_workers: u32,
    pub autotermination_minutes: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spark_conf: BTreeMap<String, serde_json::Value>,
}

impl ClusterSpec {
    pub fn new(
        cluster_name: impl Into<String>,
        spark_version: impl Into<String>,
        node_type_id: impl Into<String>,
    ) -> Self {
        let mut spark_conf = BTreeMap::new();
        spark_conf.insert("spark.speculation".to_string(), serde_json::Value::Bool(true));
        Self {
            cluster_name: cluster_name.into(),
            spark_version: spark_version.into(),
            node_type_id: node_type_id.into(),
            num_workers: MIN_WORKERS,
            autotermination_minutes: 120,
            spark_conf,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "cluster_name must not be empty".to_string(),
            ));
        }
        if self.num_workers < MIN_WORKERS {
            return Err(CoreError::Validation(format!(
                "num_workers must be at least {}, got {}",
                MIN_WORKERS, self.num_workers
            )));
        }
        if !AUTOTERMINATION_RANGE.contains(&self.autotermination_minutes) {
            return Err(CoreError::Validation(format!(
                "autotermination_minutes must be between {} and {}, got {}",
                AUTOTERMINATION_RANGE.start(),
                AUTOTERMINATION_RANGE.end(),
                self.autotermination_minutes
            )));
        }
        Ok(())
    }
}

/// Cluster as reported by `clusters/get`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: String,
    pub state: String,
    #[serde(default)]
    pub state_message: Option<String>,
    #[serde(default)]
    pub spark_version: String,
    #[serde(default)]
    pub node_type_id: String,
    #[serde(default)]
    pub num_workers: u32,
    #[serde(default)]
    pub autotermination_minutes: u32,
}

impl AsRef<str> for ClusterInfo {
    fn as_ref(&self) -> &str {
        &self.state
    }
}

/// Create a cluster, retrying the whole call on retryable provider errors
///
/// Non-retryable errors are returned at once. After `retry.max_retries`
/// retries the last error is returned.
pub async fn create_cluster_with_retry(
    api: &dyn ClusterApi,
    spec: &ClusterSpec,
    retry: &RetryConfig,
) -> Result<String> {
    let mut retries = 0;
    loop {
        match api.create_cluster(spec).await {
            Ok(cluster_id) => {
                info!(
                    cluster_id = %cluster_id,
                    cluster_name = %spec.cluster_name,
                    retries,
                    "Cluster created"
                );
                return Ok(cluster_id);
            }
            Err(err) => {
                let retryable = err
                    .provider_code()
                    .is_some_and(|code| retry.is_retryable(code));
                if !retryable || retries >= retry.max_retries {
                    return Err(err);
                }
                retries += 1;
                warn!(
                    cluster_name = %spec.cluster_name,
                    "Cluster creation failed ({}), retry {}/{} in {}s",
                    err,
                    retries,
                    retry.max_retries,
                    retry.delay_secs
                );
                tokio::time::sleep(retry.delay()).await;
            }
        }
    }
}

/// Create a cluster and wait for it to start
///
/// `RUNNING` returns the cluster; `TERMINATED` or `ERROR` is returned as
/// [`CoreError::OperationFailed`] with the provider's state message.
pub async fn create_cluster_and_wait(
    api: &dyn ClusterApi,
    spec: &ClusterSpec,
    retry: &RetryConfig,
    settings: PollSettings,
    on_progress: Option<ProgressCallback>,
) -> Result<ClusterInfo> {
    spec.validate()?;
    settings.validate()?;
    let cluster_id = create_cluster_with_retry(api, spec, retry).await?;

    let cluster = poll_until(
        &cluster_id,
        OperationKind::ClusterCreate.terminal_states(),
        settings,
        on_progress,
        || api.get_cluster(&cluster_id),
    )
    .await?;

    if cluster.state != "RUNNING" {
        return Err(CoreError::OperationFailed {
            operation_id: cluster.cluster_id,
            state: cluster.state,
            message: cluster
                .state_message
                .unwrap_or_else(|| "cluster did not start".to_string()),
        });
    }

    Ok(cluster)
}

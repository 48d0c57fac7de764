//! State query backed by an HTTP status endpoint
//!
//! Many provider APIs expose the progress of an operation as a JSON document
//! (`GET /api/2.0/clusters/get?cluster_id=...` returns `{"state": "PENDING", ...}`).
//! [`HttpStateQuery`] fetches such a document and extracts the state with a
//! JSON pointer, ready to hand to [`Poller::run`](crate::Poller::run).

use crate::error::{CoreError, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// Default JSON pointer to the state field
pub const DEFAULT_STATE_POINTER: &str = "/state";

/// Per-request timeout for the default client
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GET a URL and read the operation state out of the JSON body
#[derive(Debug, Clone)]
pub struct HttpStateQuery {
    client: reqwest::Client,
    url: Url,
    state_pointer: String,
    bearer_token: Option<String>,
}

impl HttpStateQuery {
    /// Query `url` with a default client and the `/state` pointer
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| CoreError::Validation(format!("Invalid URL '{}': {}", url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url,
            state_pointer: DEFAULT_STATE_POINTER.to_string(),
            bearer_token: None,
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// JSON pointer (RFC 6901) to the state, e.g. `/DBInstances/0/DBInstanceStatus`
    pub fn state_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.state_pointer = pointer.into();
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Perform one check
    ///
    /// Non-2xx responses become [`CoreError::Provider`] with the body's
    /// `error_code` when present, else the HTTP status code.
    pub async fn fetch_state(&self) -> Result<String> {
        let mut request = self.client.get(self.url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        trace!(url = %self.url, status = status.as_u16(), "State endpoint responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &body));
        }

        let body: Value = response.json().await?;
        extract_state(&body, &self.state_pointer)
    }
}

fn provider_error(status: reqwest::StatusCode, body: &str) -> CoreError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("error_code"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string());
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());
    CoreError::Provider { code, message }
}

/// Read the state at `pointer`; strings are taken as-is, other scalars are stringified
pub fn extract_state(body: &Value, pointer: &str) -> Result<String> {
    match body.pointer(pointer) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
        Some(other) => Err(CoreError::query(format!(
            "State at '{}' is not a scalar: {}",
            pointer, other
        ))),
        None => Err(CoreError::query(format!(
            "No state found at '{}' in response",
            pointer
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_state_string() {
        let body = json!({"state": "PENDING"});
        assert_eq!(extract_state(&body, "/state").unwrap(), "PENDING");
    }

    #[test]
    fn test_extract_state_nested() {
        let body = json!({"DBInstances": [{"DBInstanceStatus": "stopping"}]});
        assert_eq!(
            extract_state(&body, "/DBInstances/0/DBInstanceStatus").unwrap(),
            "stopping"
        );
    }

    #[test]
    fn test_extract_state_scalar() {
        let body = json!({"progress": 100, "done": true});
        assert_eq!(extract_state(&body, "/progress").unwrap(), "100");
        assert_eq!(extract_state(&body, "/done").unwrap(), "true");
    }

    #[test]
    fn test_extract_state_missing_is_query_failure() {
        let err = extract_state(&json!({}), "/state").unwrap_err();
        assert!(err.is_query_failure());
        assert!(err.to_string().contains("/state"));
    }

    #[test]
    fn test_extract_state_object_rejected() {
        let err = extract_state(&json!({"state": {"a": 1}}), "/state").unwrap_err();
        assert!(err.to_string().contains("not a scalar"));
    }

    #[test]
    fn test_provider_error_prefers_error_code() {
        let err = provider_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error_code": "UnknownWorkerEnvironmentException", "message": "not ready"}"#,
        );
        assert_eq!(err.provider_code(), Some("UnknownWorkerEnvironmentException"));
        assert!(err.to_string().contains("not ready"));
    }

    #[test]
    fn test_provider_error_falls_back_to_status() {
        let err = provider_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "upstream down");
        assert_eq!(err.provider_code(), Some("503"));
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_invalid_url() {
        let err = HttpStateQuery::new("not a url").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}

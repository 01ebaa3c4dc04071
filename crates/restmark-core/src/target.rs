use std::time::Duration;

use crate::error::RestmarkError;
use crate::http::client::HttpClient;

/// Pre-flight health probes use a short timeout so a dead target does not
/// stall startup for the full request timeout.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// One backend under test: a display name, a base URL, and a dedicated HTTP
/// client. The client (and its connection pool) is never shared with other
/// targets, so cross-target load cannot bias the latency comparison.
#[derive(Debug)]
pub struct Target {
    name: String,
    base_url: String,
    client: HttpClient,
}

impl Target {
    /// Parse a `NAME=URL` CLI spec into a target with its own client.
    pub fn from_spec(spec: &str, timeout: Duration) -> Result<Self, RestmarkError> {
        let (name, url) = spec
            .split_once('=')
            .ok_or_else(|| RestmarkError::Config(format!("target spec '{spec}' must look like NAME=URL")))?;

        let name = name.trim();
        let url = url.trim();
        if name.is_empty() {
            return Err(RestmarkError::Config(format!("target spec '{spec}' has an empty name")));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(RestmarkError::Config(format!(
                "target '{name}' URL '{url}' must start with http:// or https://"
            )));
        }

        Self::new(name, url, timeout)
    }

    pub fn new(name: &str, base_url: &str, timeout: Duration) -> Result<Self, RestmarkError> {
        let client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pre-flight liveness probe against `/health`. Any 2xx means reachable;
    /// everything else (including connection errors) marks the target as
    /// unreachable for the whole run.
    pub async fn check_health(&self) -> bool {
        let result = self
            .client
            .inner()
            .get(self.url("/health"))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::warn!(target_name = %self.name, error = %err, "health check failed");
                false
            }
        }
    }

    /// Current number of records in the target's item table, from the listing
    /// endpoint. Used for the cleanup baseline and its post-run verification.
    pub async fn record_count(&self) -> Option<usize> {
        let response = self
            .client
            .inner()
            .get(self.url("/db/items"))
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let items: serde_json::Value = response.json().await.ok()?;
        items.as_array().map(|a| a.len())
    }
}

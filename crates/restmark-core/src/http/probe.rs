use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::http::client::HttpClient;
use crate::workload::HttpMethod;

/// Maximum length of response body retained per sample. Bodies are only
/// inspected for created-record ids; anything longer is truncated.
pub const MAX_SAMPLE_BODY_LEN: usize = 4096;

/// A fully resolved HTTP call: absolute URL, no remaining placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProbeCall {
    pub method: HttpMethod,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl ProbeCall {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
        }
    }

    pub fn with_body(method: HttpMethod, url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Measured outcome of one executed request.
///
/// Samples are ephemeral: the runner produces them, the statistics engine
/// consumes them, and they are never persisted individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Sample {
    /// Wall-clock time from dispatch to the full response body (or failure).
    pub elapsed: Duration,
    /// HTTP status code; 0 when no response was received at all.
    pub status: u16,
    /// True for any 2xx status.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Response body, truncated to [`MAX_SAMPLE_BODY_LEN`]. Only consulted
    /// by the CREATE-phase ledger; statistics ignore it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Sample {
    /// A sample for a request that was never dispatched because the run was
    /// cancelled. Counts as a failure, keeps the batch cardinality intact.
    pub fn cancelled() -> Self {
        Self {
            elapsed: Duration::ZERO,
            status: 0,
            success: false,
            error: Some("cancelled before dispatch".to_string()),
            body: None,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Issue a single timed HTTP request and classify the outcome.
///
/// The timer starts immediately before dispatch and stops after the full
/// response body has been received. Network errors, timeouts, and body read
/// failures all yield a failed [`Sample`] — the probe never aborts its
/// caller.
pub async fn execute(client: &HttpClient, call: &ProbeCall) -> Sample {
    let start = Instant::now();
    let result = send(client, call).await;
    let elapsed = start.elapsed();

    match result {
        Ok((status, body)) => Sample {
            elapsed,
            status,
            success: (200..300).contains(&status),
            error: None,
            body,
        },
        Err(err_msg) => Sample {
            elapsed,
            status: 0,
            success: false,
            error: Some(err_msg),
            body: None,
        },
    }
}

/// Build the reqwest request, send it, and read the full body.
/// Errors are surfaced as strings; the caller folds them into the sample.
async fn send(client: &HttpClient, call: &ProbeCall) -> Result<(u16, Option<String>), String> {
    let method = match call.method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    };

    let mut builder = client.inner().request(method, &call.url);
    if let Some(body) = &call.body {
        builder = builder.json(body);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    let status = response.status().as_u16();

    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| format!("Error reading response body: {e}"))?;

    let body = if body_bytes.is_empty() {
        None
    } else {
        let text = String::from_utf8_lossy(&body_bytes);
        let truncated: String = text.chars().take(MAX_SAMPLE_BODY_LEN).collect();
        Some(truncated)
    };

    Ok((status, body))
}

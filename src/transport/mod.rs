//! Transport layer: one logical request, one-or-more physical attempts.
//!
//! [`HttpSend`] abstracts the actual sender so the retry engine, the
//! polling loop, and the workflow orchestrator can all be exercised
//! against canned responses. [`execute`] is the single place retries
//! happen: no other component re-implements retry.
//!
//! ```text
//! client ──► RequestDescriptor ──► execute() ──► RawResponse
//!                                     │
//!                          ┌──────────┴──────────┐
//!                    ReqwestTransport       MockTransport
//! ```

pub(crate) mod guard;
pub mod http;
pub mod mock;

pub use http::ReqwestTransport;
pub use mock::{MockReply, MockTransport};

use crate::error::{DiffioError, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One fully-built request. Immutable once built; the retry engine
/// replays it for every physical attempt, which is always valid because
/// the body is a byte buffer rather than a stream.
#[derive(Clone)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: reqwest::Method,
    /// Absolute target address.
    pub url: String,
    /// Already-resolved wire headers.
    pub headers: BTreeMap<String, String>,
    /// Request body bytes, if any.
    pub body: Option<Vec<u8>>,
    /// Per-attempt deadline. `None` leaves the attempt unbounded.
    pub timeout: Option<Duration>,
    /// External cancellation signal, composed with the deadline.
    pub cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("timeout", &self.timeout)
            .field("has_cancel", &self.cancel.is_some())
            .finish()
    }
}

/// A response stripped to what the client needs: status, content type,
/// body bytes.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Build a JSON response. Mostly useful with [`MockTransport`].
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }

    /// Build a binary response. Mostly useful with [`MockTransport`].
    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: Some("application/octet-stream".to_string()),
            body,
        }
    }
}

/// Abstraction over the physical sender.
///
/// Implementors perform exactly one attempt per call; retry, timeout,
/// and cancellation are layered on by [`execute`].
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn HttpSend>`.
#[async_trait]
pub trait HttpSend: Send + Sync {
    /// Perform one physical attempt.
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Whether a failed attempt may be retried. Connection-level failures
/// and attempt timeouts are; everything else surfaces immediately.
pub fn is_retryable_error(error: &DiffioError) -> bool {
    matches!(error, DiffioError::Request(_) | DiffioError::Timeout(_))
}

/// Execute one logical request with retries and exponential backoff.
///
/// At most `policy.max_attempts + 1` physical attempts are made. A
/// response whose status is in the policy's retryable set is dropped and
/// retried while attempts remain; once they run out, the final response
/// is returned unmodified and the caller classifies it. Transport
/// failures (connection errors, attempt timeouts) are retried under the
/// same budget and the last one is re-raised when it is exhausted.
/// Cancellation is never retried. Backoff waits are real wall-clock
/// delays: `backoff_base * 2^attempt` after the attempt numbered
/// `attempt` (0-indexed).
pub async fn execute(
    sender: &dyn HttpSend,
    request: &RequestDescriptor,
    policy: &RetryPolicy,
) -> Result<RawResponse> {
    let mut last_error: Option<DiffioError> = None;

    for attempt in 0..=policy.max_attempts {
        if let Some(token) = &request.cancel {
            if token.is_cancelled() {
                return Err(DiffioError::Cancelled);
            }
        }

        if attempt > 0 {
            let delay = policy.delay_for_attempt(attempt - 1);
            tracing::debug!(
                url = %request.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %last_error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
                "retrying request"
            );
            tokio::time::sleep(delay).await;

            if let Some(token) = &request.cancel {
                if token.is_cancelled() {
                    return Err(DiffioError::Cancelled);
                }
            }
        }

        match guard::bounded(request.timeout, request.cancel.as_ref(), sender.send(request)).await
        {
            Ok(response) => {
                if policy.is_retryable_status(response.status) && attempt < policy.max_attempts {
                    tracing::debug!(
                        url = %request.url,
                        status = response.status,
                        attempt,
                        "retryable status"
                    );
                    last_error = None;
                    continue;
                }
                return Ok(response);
            }
            Err(DiffioError::Cancelled) => return Err(DiffioError::Cancelled),
            Err(error) if attempt < policy.max_attempts && is_retryable_error(&error) => {
                last_error = Some(error);
                continue;
            }
            Err(error) => return Err(error),
        }
    }

    Err(last_error
        .unwrap_or_else(|| DiffioError::Other("retry loop exited unexpectedly".to_string())))
}

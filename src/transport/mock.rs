//! Mock sender for testing without a live service.
//!
//! [`MockTransport`] returns pre-configured replies in order, allowing
//! downstream consumers to write deterministic tests against this crate.
//!
//! # Example
//!
//! ```
//! use diffio::transport::{MockReply, MockTransport, RawResponse};
//! use serde_json::json;
//!
//! let mock = MockTransport::new(vec![
//!     MockReply::Response(RawResponse::json(200, &json!({"ok": true}))),
//! ]);
//! ```

use super::{HttpSend, RawResponse, RequestDescriptor};
use crate::error::{DiffioError, Result};
use crate::transport::guard::ATTEMPT_TIMEOUT_MSG;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One canned reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this response.
    Response(RawResponse),
    /// Fail the attempt with a timeout, the retryable transport failure.
    Timeout,
}

/// A test sender that returns canned replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
/// Every descriptor it receives is recorded for assertions.
#[derive(Debug)]
pub struct MockTransport {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    /// Create a mock with the given canned replies.
    ///
    /// Replies are returned in order. When exhausted, cycles from the
    /// beginning.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockTransport requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn fixed(reply: MockReply) -> Self {
        Self::new(vec![reply])
    }

    /// Number of attempts received so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    /// Snapshot of every descriptor received, in order.
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSend for MockTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        match &self.replies[idx] {
            MockReply::Response(response) => Ok(response.clone()),
            MockReply::Timeout => Err(DiffioError::Timeout(ATTEMPT_TIMEOUT_MSG.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn descriptor(url: &str) -> RequestDescriptor {
        RequestDescriptor {
            method: reqwest::Method::GET,
            url: url.to_string(),
            headers: BTreeMap::new(),
            body: None,
            timeout: None,
            cancel: None,
        }
    }

    #[tokio::test]
    async fn test_mock_cycles_replies() {
        let mock = MockTransport::new(vec![
            MockReply::Response(RawResponse::json(200, &json!({"n": 1}))),
            MockReply::Response(RawResponse::json(200, &json!({"n": 2}))),
        ]);

        let first = mock.send(&descriptor("http://x/1")).await.unwrap();
        let second = mock.send(&descriptor("http://x/2")).await.unwrap();
        let third = mock.send(&descriptor("http://x/3")).await.unwrap();

        assert_eq!(first.text(), r#"{"n":1}"#);
        assert_eq!(second.text(), r#"{"n":2}"#);
        assert_eq!(third.text(), r#"{"n":1}"#); // cycles
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockTransport::fixed(MockReply::Response(RawResponse::json(200, &json!({}))));
        mock.send(&descriptor("http://x/a")).await.unwrap();
        mock.send(&descriptor("http://x/b")).await.unwrap();

        let seen: Vec<String> = mock.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(seen, vec!["http://x/a", "http://x/b"]);
    }

    #[tokio::test]
    async fn test_mock_timeout_reply() {
        let mock = MockTransport::fixed(MockReply::Timeout);
        let result = mock.send(&descriptor("http://x")).await;
        assert!(matches!(result, Err(DiffioError::Timeout(_))));
    }
}

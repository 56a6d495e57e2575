//! Completion polling: turn a generation's remote state machine into a
//! single awaited snapshot.
//!
//! [`DiffioClient::wait_for_generation`] polls `get_generation_progress`
//! until the generation reaches a terminal state or a wall-clock deadline
//! passes. Each snapshot can be observed through a fallible callback, and
//! the same sequence is available as a finite [`Stream`] via
//! [`DiffioClient::progress_updates`] for consumers who prefer pull over
//! push.

use crate::api::{GenerationProgress, GenerationStatus};
use crate::client::{DiffioClient, RequestOptions, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{DiffioError, Result};
use futures::Stream;
use std::time::Duration;
use tokio::time::Instant;

/// Default wait between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Options for [`DiffioClient::wait_for_generation`].
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Generation to watch. Required.
    pub generation_id: String,
    /// Owning project, forwarded to the status endpoint when known.
    pub api_project_id: Option<String>,
    /// Wait between polls. Default: 2 seconds. The loop never polls
    /// faster than this.
    pub poll_interval: Duration,
    /// Overall deadline, measured from entry. Default: 60 seconds.
    pub timeout: Duration,
    /// Emit a human-readable progress line per snapshot (through
    /// `tracing` at info level).
    pub show_progress: bool,
    /// Per-call request overrides applied to every poll.
    pub request: Option<RequestOptions>,
}

impl WaitOptions {
    pub fn new(generation_id: impl Into<String>) -> Self {
        Self {
            generation_id: generation_id.into(),
            api_project_id: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            show_progress: false,
            request: None,
        }
    }

    pub fn with_api_project_id(mut self, api_project_id: impl Into<String>) -> Self {
        self.api_project_id = Some(api_project_id.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = Some(request);
        self
    }
}

/// One-line human-readable rendering of a snapshot, e.g.
/// `processing (pre=complete:100%, inf=running:40%)`.
pub fn format_progress(progress: &GenerationProgress) -> String {
    let mut parts = vec![
        format!(
            "pre={}:{}%",
            progress.pre_processing.status, progress.pre_processing.progress
        ),
        format!(
            "inf={}:{}%",
            progress.inference.status, progress.inference.progress
        ),
    ];
    if let Some(video) = &progress.restored_video {
        parts.push(format!("vid={}:{}%", video.status, video.progress));
    }
    format!("{} ({})", progress.status, parts.join(", "))
}

fn job_failed_error(progress: &GenerationProgress) -> DiffioError {
    DiffioError::JobFailed(format!(
        "generation failed (preProcessing={}, inference={}, error={}, details={})",
        progress.pre_processing.status,
        progress.inference.status,
        progress.error.as_deref().unwrap_or("none"),
        progress.error_details.as_deref().unwrap_or("none"),
    ))
}

fn poll_timeout_error(last_status: Option<GenerationStatus>) -> DiffioError {
    DiffioError::Timeout(format!(
        "timed out waiting for generation completion (last status: {})",
        last_status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    ))
}

impl DiffioClient {
    /// Poll until the generation completes, fails, or the deadline passes.
    pub async fn wait_for_generation(&self, options: &WaitOptions) -> Result<GenerationProgress> {
        self.wait_for_generation_with_progress(options, |_| Ok(()))
            .await
    }

    /// Poll until terminal, invoking `on_progress` with every snapshot.
    ///
    /// The deadline is absolute, computed at entry; the loop never polls
    /// after it has passed and never faster than `poll_interval`. A
    /// `Complete` snapshot is returned immediately. A `Failed` snapshot
    /// fails immediately with [`DiffioError::JobFailed`] embedding the
    /// per-stage statuses. Callback errors are not swallowed: they
    /// propagate and end the wait.
    pub async fn wait_for_generation_with_progress<F>(
        &self,
        options: &WaitOptions,
        mut on_progress: F,
    ) -> Result<GenerationProgress>
    where
        F: FnMut(&GenerationProgress) -> Result<()>,
    {
        let deadline = Instant::now() + options.timeout;
        let mut last_status: Option<GenerationStatus> = None;

        while Instant::now() < deadline {
            let progress = self
                .get_generation_progress(
                    &options.generation_id,
                    options.api_project_id.as_deref(),
                    options.request.as_ref(),
                )
                .await?;
            last_status = Some(progress.status);

            on_progress(&progress)?;
            if options.show_progress {
                tracing::info!(generation_id = %options.generation_id, "{}", format_progress(&progress));
            } else {
                tracing::debug!(generation_id = %options.generation_id, status = %progress.status, "polled generation");
            }

            match progress.status {
                GenerationStatus::Complete => return Ok(progress),
                GenerationStatus::Failed => return Err(job_failed_error(&progress)),
                _ => tokio::time::sleep(options.poll_interval).await,
            }
        }

        Err(poll_timeout_error(last_status))
    }

    /// The polling sequence as a finite stream of snapshots.
    ///
    /// Yields every observed snapshot up to and including the terminal
    /// one, then ends. If the deadline passes first, the final item is
    /// the timeout error. The stream is not restartable; it holds no
    /// state beyond its own position.
    pub fn progress_updates<'a>(
        &'a self,
        options: &'a WaitOptions,
    ) -> impl Stream<Item = Result<GenerationProgress>> + 'a {
        let deadline = Instant::now() + options.timeout;
        futures::stream::try_unfold(
            (false, true, None::<GenerationStatus>),
            move |(done, first, last_status)| async move {
                if done {
                    return Ok(None);
                }
                if !first {
                    tokio::time::sleep(options.poll_interval).await;
                }
                if Instant::now() >= deadline {
                    return Err(poll_timeout_error(last_status));
                }
                let progress = self
                    .get_generation_progress(
                        &options.generation_id,
                        options.api_project_id.as_deref(),
                        options.request.as_ref(),
                    )
                    .await?;
                let status = progress.status;
                Ok(Some((progress, (status.is_terminal(), false, Some(status)))))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_client;
    use crate::transport::{MockReply, MockTransport, RawResponse};
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Arc;

    fn progress_json(status: &str) -> serde_json::Value {
        json!({
            "generationId": "g1",
            "apiProjectId": "p1",
            "status": status,
            "preProcessing": {"status": "complete", "progress": 100},
            "inference": {"status": "running", "progress": 50}
        })
    }

    fn reply(status: &str) -> MockReply {
        MockReply::Response(RawResponse::json(200, &progress_json(status)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_complete_snapshot() {
        let mock = Arc::new(MockTransport::new(vec![
            reply("queued"),
            reply("processing"),
            reply("complete"),
            reply("complete"),
        ]));
        let client = test_client(mock.clone());

        let progress = client
            .wait_for_generation(&WaitOptions::new("g1").with_timeout(Duration::from_secs(600)))
            .await
            .unwrap();

        assert_eq!(progress.status, GenerationStatus::Complete);
        // No polls after the terminal snapshot.
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_status_fails_immediately() {
        let mock = Arc::new(MockTransport::fixed(MockReply::Response(
            RawResponse::json(
                200,
                &json!({
                    "generationId": "g1",
                    "status": "failed",
                    "preProcessing": {"status": "complete", "progress": 100},
                    "inference": {"status": "error", "progress": 10},
                    "error": "decode error",
                    "errorDetails": "bad header"
                }),
            ),
        )));
        let client = test_client(mock.clone());

        let result = client
            .wait_for_generation(&WaitOptions::new("g1").with_timeout(Duration::from_secs(600)))
            .await;

        match result {
            Err(DiffioError::JobFailed(message)) => {
                assert!(message.contains("decode error"), "got: {}", message);
                assert!(message.contains("inference=error"), "got: {}", message);
            }
            other => panic!("expected JobFailed, got {:?}", other),
        }
        // Failure is immediate; the deadline is not waited out.
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reports_last_observed_status() {
        let mock = Arc::new(MockTransport::fixed(reply("processing")));
        let client = test_client(mock);

        let options = WaitOptions::new("g1")
            .with_poll_interval(Duration::from_secs(2))
            .with_timeout(Duration::from_secs(5));
        let result = client.wait_for_generation(&options).await;

        match result {
            Err(DiffioError::Timeout(message)) => {
                assert!(message.contains("processing"), "got: {}", message);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deadline_with_no_snapshot_reports_unknown() {
        // A deadline that has already passed at entry: the loop never
        // observes a snapshot, so the message falls back to "unknown".
        let mock = Arc::new(MockTransport::fixed(reply("queued")));
        let client = test_client(mock.clone());

        let options = WaitOptions::new("g1").with_timeout(Duration::ZERO);
        let result = client.wait_for_generation(&options).await;

        match result {
            Err(DiffioError::Timeout(message)) => {
                assert!(message.contains("unknown"), "got: {}", message);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_callback_error_propagates() {
        let mock = Arc::new(MockTransport::fixed(reply("queued")));
        let client = test_client(mock.clone());

        let result = client
            .wait_for_generation_with_progress(
                &WaitOptions::new("g1").with_timeout(Duration::from_secs(600)),
                |_| Err(DiffioError::Other("observer gave up".to_string())),
            )
            .await;

        match result {
            Err(DiffioError::Other(message)) => assert_eq!(message, "observer gave up"),
            other => panic!("expected callback error, got {:?}", other),
        }
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_at_terminal_snapshot() {
        let mock = Arc::new(MockTransport::new(vec![
            reply("queued"),
            reply("processing"),
            reply("complete"),
        ]));
        let client = test_client(mock.clone());

        let options = WaitOptions::new("g1").with_timeout(Duration::from_secs(600));
        let snapshots: Vec<_> = client.progress_updates(&options).collect().await;

        assert_eq!(snapshots.len(), 3);
        let statuses: Vec<GenerationStatus> = snapshots
            .into_iter()
            .map(|item| item.unwrap().status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                GenerationStatus::Queued,
                GenerationStatus::Processing,
                GenerationStatus::Complete
            ]
        );
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_yields_timeout_when_never_terminal() {
        let mock = Arc::new(MockTransport::fixed(reply("queued")));
        let client = test_client(mock);

        let options = WaitOptions::new("g1")
            .with_poll_interval(Duration::from_secs(2))
            .with_timeout(Duration::from_secs(5));
        let items: Vec<_> = client.progress_updates(&options).collect().await;

        assert!(items.len() >= 2);
        let last = items.last().unwrap();
        assert!(matches!(last, Err(DiffioError::Timeout(_))));
    }

    #[test]
    fn test_format_progress_line() {
        let progress: GenerationProgress =
            serde_json::from_value(progress_json("processing")).unwrap();
        assert_eq!(
            format_progress(&progress),
            "processing (pre=complete:100%, inf=running:50%)"
        );
    }
}

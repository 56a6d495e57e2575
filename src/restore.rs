//! The restore workflow: upload, generate, poll, download, in one call.
//!
//! [`DiffioClient::restore`] chains the full pipeline and accumulates a
//! [`RestoreMetadata`] recording how far it got, so a failure at any
//! stage can be diagnosed after the fact. [`DiffioClient::isolate`] is
//! the separable first half: upload and queue the generation, return a
//! handle, never poll.
//!
//! There is no compensating rollback: a failure after the isolate stage
//! leaves the project and generation existing remotely, and the metadata
//! carries their identifiers.

use crate::api::{
    DownloadType, GenerationProgress, IsolationResult, RestoreMetadata, RestoreStage,
};
use crate::client::{
    CreateGenerationOptions, CreateProjectOptions, DiffioClient, GenerationDownloadOptions,
    RequestOptions, DEFAULT_REQUEST_TIMEOUT,
};
use crate::error::{DiffioError, Result};
use crate::poll::{WaitOptions, DEFAULT_POLL_INTERVAL};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Per-snapshot observer for [`DiffioClient::restore`]. Errors propagate
/// and end the wait.
pub type ProgressCallback = Box<dyn FnMut(&GenerationProgress) -> Result<()> + Send>;

/// Options for [`DiffioClient::isolate`]: everything needed to upload a
/// file and queue a generation against it.
#[derive(Debug, Clone, Default)]
pub struct IsolateOptions {
    /// File to upload. Required.
    pub file_path: PathBuf,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub file_format: Option<String>,
    /// Model key; the client default applies when `None`.
    pub model: Option<String>,
    pub sampling: Option<Value>,
    pub project_params: Option<Value>,
    pub generation_params: Option<Value>,
    /// Request overrides for both creation calls.
    pub request: Option<RequestOptions>,
}

impl IsolateOptions {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_sampling(mut self, sampling: Value) -> Self {
        self.sampling = Some(sampling);
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = Some(request);
        self
    }
}

/// Options for [`DiffioClient::restore`].
pub struct RestoreOptions {
    /// Upload and generation-creation options (stages 1–2).
    pub isolate: IsolateOptions,
    /// Artifact kind to download. Default: audio.
    pub download_type: DownloadType,
    /// Wait between polls. Default: 2 seconds.
    pub poll_interval: Duration,
    /// Polling deadline. Default: 60 seconds.
    pub timeout: Duration,
    /// Emit a progress line per snapshot.
    pub show_progress: bool,
    /// Per-snapshot observer; failures propagate.
    pub on_progress: Option<ProgressCallback>,
    /// Overrides for the polling calls; falls back to the isolate
    /// overrides.
    pub progress_request: Option<RequestOptions>,
    /// Overrides for the download calls; falls back likewise.
    pub download_request: Option<RequestOptions>,
    /// When true, a stage failure is re-raised as
    /// [`DiffioError::Restore`] with the metadata attached; when false
    /// (the default) the call returns `(None, metadata)` instead.
    pub raise_on_error: bool,
}

impl RestoreOptions {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            isolate: IsolateOptions::new(file_path),
            download_type: DownloadType::Audio,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            show_progress: false,
            on_progress: None,
            progress_request: None,
            download_request: None,
            raise_on_error: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.isolate.model = Some(model.into());
        self
    }

    pub fn with_download_type(mut self, download_type: DownloadType) -> Self {
        self.download_type = download_type;
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

    pub fn with_on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.isolate.request = Some(request);
        self
    }

    pub fn with_progress_request(mut self, request: RequestOptions) -> Self {
        self.progress_request = Some(request);
        self
    }

    pub fn with_download_request(mut self, request: RequestOptions) -> Self {
        self.download_request = Some(request);
        self
    }

    pub fn with_raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = raise;
        self
    }
}

impl std::fmt::Debug for RestoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreOptions")
            .field("isolate", &self.isolate)
            .field("download_type", &self.download_type)
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .field("show_progress", &self.show_progress)
            .field("has_on_progress", &self.on_progress.is_some())
            .field("raise_on_error", &self.raise_on_error)
            .finish()
    }
}

fn finish_failed(
    metadata: RestoreMetadata,
    error: DiffioError,
    raise_on_error: bool,
) -> Result<(Option<Vec<u8>>, RestoreMetadata)> {
    if raise_on_error {
        Err(DiffioError::Restore {
            source: Box::new(error),
            metadata: Box::new(metadata),
        })
    } else {
        Ok((None, metadata))
    }
}

impl DiffioClient {
    /// Upload a file and queue a generation against it, without polling.
    ///
    /// Two dependent remote calls: project creation yields the signed
    /// upload target that the generation's payload depends on. The
    /// returned handle carries both identifiers for later polling or
    /// download.
    pub async fn isolate(&self, options: &IsolateOptions) -> Result<IsolationResult> {
        let project = self
            .create_project(CreateProjectOptions {
                file_path: options.file_path.clone(),
                content_type: options.content_type.clone(),
                content_length: options.content_length,
                params: options.project_params.clone(),
                file_format: options.file_format.clone(),
                request: options.request.clone(),
            })
            .await?;

        let generation = self
            .create_generation(CreateGenerationOptions {
                api_project_id: project.api_project_id.clone(),
                model: options.model.clone(),
                sampling: options.sampling.clone(),
                params: options.generation_params.clone(),
                request: options.request.clone(),
            })
            .await?;

        Ok(IsolationResult {
            project,
            generation,
        })
    }

    /// Run the full restore pipeline: isolate, poll to completion,
    /// resolve the download, fetch the artifact.
    ///
    /// Every stage writes to the returned [`RestoreMetadata`] before
    /// advancing, so the furthest stage reached and the last observed
    /// generation state survive any failure. With `raise_on_error`
    /// unset the call never fails: a stage failure yields
    /// `(None, metadata)` with `metadata.ok == false` and
    /// `metadata.stage` naming the stage that stopped the pipeline.
    pub async fn restore(
        &self,
        options: RestoreOptions,
    ) -> Result<(Option<Vec<u8>>, RestoreMetadata)> {
        let RestoreOptions {
            isolate,
            download_type,
            poll_interval,
            timeout,
            show_progress,
            on_progress,
            progress_request,
            download_request,
            raise_on_error,
        } = options;

        let mut metadata = RestoreMetadata {
            download_type: Some(download_type.as_str().to_string()),
            ..Default::default()
        };

        let progress_request = progress_request.or_else(|| isolate.request.clone());
        let download_request = download_request.or_else(|| isolate.request.clone());

        let isolation = match self.isolate(&isolate).await {
            Ok(result) => result,
            Err(error) => {
                metadata.advance(RestoreStage::Isolate);
                metadata.record_error(&error);
                return finish_failed(metadata, error, raise_on_error);
            }
        };

        let api_project_id = isolation.project.api_project_id.clone();
        let generation_id = isolation.generation.generation_id.clone();
        metadata.api_project_id = Some(api_project_id.clone());
        metadata.generation_id = Some(generation_id.clone());
        metadata.project = Some(isolation.project);
        metadata.generation = Some(isolation.generation);
        metadata.advance(RestoreStage::Generation);

        let mut wait = WaitOptions::new(generation_id.clone())
            .with_api_project_id(api_project_id.clone())
            .with_poll_interval(poll_interval)
            .with_timeout(timeout)
            .with_show_progress(show_progress);
        if let Some(request) = progress_request.clone() {
            wait = wait.with_request(request);
        }

        let wait_result = match on_progress {
            Some(mut callback) => {
                self.wait_for_generation_with_progress(&wait, move |progress| callback(progress))
                    .await
            }
            None => self.wait_for_generation(&wait).await,
        };

        let progress = match wait_result {
            Ok(progress) => progress,
            Err(error) => {
                metadata.advance(RestoreStage::Progress);
                // One best-effort extra fetch to enrich the metadata; its
                // own failure leaves the snapshot unset rather than
                // compounding the error.
                let snapshot = self
                    .get_generation_progress(
                        &generation_id,
                        Some(&api_project_id),
                        progress_request.as_ref(),
                    )
                    .await
                    .ok();
                metadata.status = snapshot.as_ref().map(|p| p.status);
                metadata.record_error(&error);
                if let Some(snapshot) = snapshot {
                    metadata.error = snapshot
                        .error
                        .clone()
                        .or_else(|| Some(error.to_string()));
                    metadata.error_details = snapshot.error_details.clone();
                    metadata.progress = Some(snapshot);
                }
                return finish_failed(metadata, error, raise_on_error);
            }
        };

        metadata.status = Some(progress.status);
        metadata.error = progress.error.clone();
        metadata.error_details = progress.error_details.clone();
        metadata.progress = Some(progress);
        metadata.advance(RestoreStage::DownloadInfo);

        let download = match self
            .get_generation_download(GenerationDownloadOptions {
                generation_id: generation_id.clone(),
                api_project_id: api_project_id.clone(),
                download_type: Some(download_type),
                request: download_request.clone(),
            })
            .await
        {
            Ok(download) => download,
            Err(error) => {
                metadata.record_error(&error);
                return finish_failed(metadata, error, raise_on_error);
            }
        };

        if !download.download_type.is_empty() {
            metadata.download_type = Some(download.download_type.clone());
        }
        metadata.download_url = Some(download.download_url.clone());
        metadata.file_name = Some(download.file_name.clone());
        metadata.mime_type = Some(download.mime_type.clone());
        metadata.download = Some(download.clone());
        metadata.advance(RestoreStage::Download);

        let content = match self
            .download_binary(&download.download_url, download_request.as_ref())
            .await
        {
            Ok(bytes) => bytes,
            Err(error) => {
                metadata.record_error(&error);
                return finish_failed(metadata, error, raise_on_error);
            }
        };

        metadata.advance(RestoreStage::Complete);
        metadata.ok = true;
        Ok((Some(content), metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GenerationStatus;
    use crate::testutil::{test_client, write_temp_file};
    use crate::transport::{MockReply, MockTransport, RawResponse};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn project_reply() -> MockReply {
        MockReply::Response(RawResponse::json(
            200,
            &json!({
                "apiProjectId": "proj_1",
                "uploadUrl": "http://upload.local/file",
                "uploadMethod": "PUT"
            }),
        ))
    }

    fn upload_reply() -> MockReply {
        MockReply::Response(RawResponse::json(200, &json!({})))
    }

    fn generation_reply() -> MockReply {
        MockReply::Response(RawResponse::json(
            200,
            &json!({
                "generationId": "g1",
                "apiProjectId": "proj_1",
                "modelKey": "diffio-2",
                "status": "queued"
            }),
        ))
    }

    fn progress_reply(status: &str) -> MockReply {
        MockReply::Response(RawResponse::json(
            200,
            &json!({
                "generationId": "g1",
                "apiProjectId": "proj_1",
                "status": status,
                "preProcessing": {"status": "complete", "progress": 100},
                "inference": {"status": status, "progress": 50}
            }),
        ))
    }

    fn failed_progress_reply() -> MockReply {
        MockReply::Response(RawResponse::json(
            200,
            &json!({
                "generationId": "g1",
                "apiProjectId": "proj_1",
                "status": "failed",
                "preProcessing": {"status": "complete", "progress": 100},
                "inference": {"status": "error", "progress": 10},
                "error": "decode error",
                "errorDetails": "unreadable input"
            }),
        ))
    }

    fn download_info_reply() -> MockReply {
        MockReply::Response(RawResponse::json(
            200,
            &json!({
                "generationId": "g1",
                "apiProjectId": "proj_1",
                "downloadType": "audio",
                "downloadUrl": "http://dl.local/out.wav",
                "fileName": "out.wav",
                "storagePath": "artifacts/out.wav",
                "bucket": "diffio",
                "mimeType": "audio/wav"
            }),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_end_to_end() {
        let path = write_temp_file("ok.wav", b"RIFFdata");
        let mock = Arc::new(MockTransport::new(vec![
            project_reply(),
            upload_reply(),
            generation_reply(),
            progress_reply("queued"),
            progress_reply("complete"),
            download_info_reply(),
            MockReply::Response(RawResponse::bytes(200, b"WAVDATA".to_vec())),
        ]));
        let client = test_client(mock.clone());

        let observed = Arc::new(AtomicUsize::new(0));
        let counter = observed.clone();
        let options = RestoreOptions::new(&path)
            .with_timeout(Duration::from_secs(600))
            .with_on_progress(Box::new(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }));

        let (content, metadata) = client.restore(options).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(content.as_deref(), Some(b"WAVDATA".as_slice()));
        assert!(metadata.ok);
        assert_eq!(metadata.stage, RestoreStage::Complete);
        assert_eq!(metadata.api_project_id.as_deref(), Some("proj_1"));
        assert_eq!(metadata.generation_id.as_deref(), Some("g1"));
        assert_eq!(metadata.status, Some(GenerationStatus::Complete));
        assert_eq!(metadata.download_url.as_deref(), Some("http://dl.local/out.wav"));
        assert_eq!(metadata.mime_type.as_deref(), Some("audio/wav"));
        assert_eq!(observed.load(Ordering::Relaxed), 2);
        assert_eq!(mock.calls(), 7);

        // The artifact fetch goes straight to the signed address.
        let last = mock.requests().last().unwrap().clone();
        assert_eq!(last.url, "http://dl.local/out.wav");
        assert!(last.headers.get("Authorization").is_none());
    }

    #[tokio::test]
    async fn test_restore_failed_generation_fills_metadata() {
        let path = write_temp_file("failed.wav", b"RIFFdata");
        let mock = Arc::new(MockTransport::new(vec![
            project_reply(),
            upload_reply(),
            generation_reply(),
            failed_progress_reply(), // observed by the polling loop
            failed_progress_reply(), // best-effort enrichment fetch
        ]));
        let client = test_client(mock.clone());

        let (content, metadata) = client
            .restore(RestoreOptions::new(&path).with_timeout(Duration::from_secs(600)))
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert!(content.is_none());
        assert!(!metadata.ok);
        assert_eq!(metadata.stage, RestoreStage::Progress);
        assert_eq!(metadata.status, Some(GenerationStatus::Failed));
        assert_eq!(metadata.error.as_deref(), Some("decode error"));
        assert_eq!(metadata.error_details.as_deref(), Some("unreadable input"));
        assert_eq!(metadata.error_kind, Some("job_failed"));
        assert!(metadata.progress.is_some());
        assert_eq!(mock.calls(), 5);
    }

    #[tokio::test]
    async fn test_restore_raises_with_metadata_attached() {
        let path = write_temp_file("raise.wav", b"RIFFdata");
        let mock = Arc::new(MockTransport::fixed(MockReply::Response(
            RawResponse::json(500, &json!({"error": "storage unavailable"})),
        )));
        let client = test_client(mock);

        let result = client
            .restore(RestoreOptions::new(&path).with_raise_on_error(true))
            .await;
        std::fs::remove_file(&path).ok();

        match result {
            Err(DiffioError::Restore { source, metadata }) => {
                assert_eq!(metadata.stage, RestoreStage::Isolate);
                assert!(!metadata.ok);
                assert!(matches!(*source, DiffioError::Api { status: 500, .. }));
            }
            other => panic!("expected Restore error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_restore_swallows_enrichment_failure() {
        let path = write_temp_file("enrich.wav", b"RIFFdata");
        let mock = Arc::new(MockTransport::new(vec![
            project_reply(),
            upload_reply(),
            generation_reply(),
            MockReply::Response(RawResponse::json(500, &json!({"error": "boom"}))),
            MockReply::Response(RawResponse::json(500, &json!({"error": "boom"}))),
        ]));
        let client = test_client(mock);

        let (content, metadata) = client
            .restore(RestoreOptions::new(&path).with_timeout(Duration::from_secs(600)))
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert!(content.is_none());
        assert_eq!(metadata.stage, RestoreStage::Progress);
        // Enrichment failed too: the snapshot stays unset and the
        // original error is what the metadata reports.
        assert!(metadata.progress.is_none());
        assert_eq!(metadata.error_kind, Some("api"));
        assert!(metadata.error.as_deref().unwrap_or_default().contains("boom"));
    }

    #[tokio::test]
    async fn test_isolate_does_not_poll() {
        let path = write_temp_file("isolate.wav", b"RIFFdata");
        let mock = Arc::new(MockTransport::new(vec![
            project_reply(),
            upload_reply(),
            generation_reply(),
        ]));
        let client = test_client(mock.clone());

        let result = client.isolate(&IsolateOptions::new(&path)).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(result.project.api_project_id, "proj_1");
        assert_eq!(result.generation.generation_id, "g1");
        // Upload and the two creation calls only; no status polls.
        assert_eq!(mock.calls(), 3);
    }
}

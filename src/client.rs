//! The Diffio client: configuration, request plumbing, resource operations.
//!
//! [`DiffioClient`] owns the transport, the credential, the default
//! headers, and the default retry/timeout policy. Every per-call knob can
//! be overridden through [`RequestOptions`]; resolution is always
//! call-level value, then client-level default, then the hardcoded
//! default.

use crate::api::{
    CreateGenerationResponse, CreateProjectResponse, DownloadType, GenerationDownload,
    GenerationProgress, ListProjectGenerationsResponse, ListProjectsResponse,
};
use crate::error::{DiffioError, Result};
use crate::headers::{header_set, merge_headers, resolve_headers, HeaderSet, HeaderValue};
use crate::retry::RetryPolicy;
use crate::transport::{self, HttpSend, RawResponse, RequestDescriptor, ReqwestTransport};
use crate::url::{is_storage_emulator_url, join, resolve_base_url};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "DIFFIO_API_KEY";

/// Model key used when none is given.
pub const DEFAULT_MODEL: &str = "diffio-2";

pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model keys and the generation endpoint each routes to.
const MODEL_ENDPOINTS: &[(&str, &str)] = &[
    ("diffio-2", "diffio-2.0-generation"),
    ("diffio-2-flash", "diffio-2.0-flash-generation"),
    ("diffio-3", "diffio-3.0-generation"),
];

fn model_endpoint(model: &str) -> Option<&'static str> {
    MODEL_ENDPOINTS
        .iter()
        .find(|(key, _)| *key == model)
        .map(|(_, endpoint)| *endpoint)
}

/// Per-call overrides. Any field left `None` falls back to the
/// client-level default.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Per-attempt deadline override.
    pub timeout: Option<Duration>,
    /// Retry count override.
    pub max_attempts: Option<u32>,
    /// Backoff base override.
    pub backoff_base: Option<Duration>,
    /// Retryable status code set override.
    pub retry_status_codes: Option<Vec<u16>>,
    /// Credential override for this call only.
    pub api_key: Option<String>,
    /// Extra headers layered over the client's (later wins).
    pub headers: HeaderSet,
    /// Cancellation signal, propagated into every physical attempt.
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = Some(base);
        self
    }

    pub fn with_retry_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.retry_status_codes = Some(codes);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), Some(value.into()));
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Options for [`DiffioClient::create_project`].
#[derive(Debug, Clone, Default)]
pub struct CreateProjectOptions {
    /// File to upload. Required.
    pub file_path: PathBuf,
    /// Override the content type guessed from the file extension.
    pub content_type: Option<String>,
    /// Override the content length taken from file metadata.
    pub content_length: Option<u64>,
    /// Free-form project parameters forwarded to the service.
    pub params: Option<Value>,
    pub file_format: Option<String>,
    pub request: Option<RequestOptions>,
}

impl CreateProjectOptions {
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

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_file_format(mut self, file_format: impl Into<String>) -> Self {
        self.file_format = Some(file_format.into());
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = Some(request);
        self
    }
}

/// Options for [`DiffioClient::create_generation`].
#[derive(Debug, Clone, Default)]
pub struct CreateGenerationOptions {
    /// Project the generation runs against. Required.
    pub api_project_id: String,
    /// Model key; [`DEFAULT_MODEL`] when `None`.
    pub model: Option<String>,
    /// Sampling controls forwarded to the service.
    pub sampling: Option<Value>,
    /// Free-form generation parameters forwarded to the service.
    pub params: Option<Value>,
    pub request: Option<RequestOptions>,
}

impl CreateGenerationOptions {
    pub fn new(api_project_id: impl Into<String>) -> Self {
        Self {
            api_project_id: api_project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_sampling(mut self, sampling: Value) -> Self {
        self.sampling = Some(sampling);
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = Some(request);
        self
    }
}

/// Options for [`DiffioClient::get_generation_download`].
#[derive(Debug, Clone, Default)]
pub struct GenerationDownloadOptions {
    pub generation_id: String,
    pub api_project_id: String,
    /// Artifact kind to fetch; the service default applies when `None`.
    pub download_type: Option<DownloadType>,
    pub request: Option<RequestOptions>,
}

impl GenerationDownloadOptions {
    pub fn new(generation_id: impl Into<String>, api_project_id: impl Into<String>) -> Self {
        Self {
            generation_id: generation_id.into(),
            api_project_id: api_project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_download_type(mut self, download_type: DownloadType) -> Self {
        self.download_type = Some(download_type);
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = Some(request);
        self
    }
}

/// Client for the Diffio API.
///
/// # Example
///
/// ```no_run
/// use diffio::DiffioClient;
///
/// # async fn run() -> diffio::Result<()> {
/// let client = DiffioClient::builder().api_key("sk-...").build()?;
/// let projects = client.list_projects(None).await?;
/// println!("{} projects", projects.projects.len());
/// # Ok(())
/// # }
/// ```
pub struct DiffioClient {
    transport: Arc<dyn HttpSend>,
    base_url: String,
    api_prefix: &'static str,
    api_key: HeaderValue,
    headers: HeaderSet,
    timeout: Option<Duration>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for DiffioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffioClient")
            .field("base_url", &self.base_url)
            .field("api_prefix", &self.api_prefix)
            .field("transport", &self.transport.name())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl DiffioClient {
    /// Create a new builder.
    pub fn builder() -> DiffioClientBuilder {
        DiffioClientBuilder {
            api_key: None,
            base_url: None,
            headers: HeaderSet::new(),
            timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            retry: None,
            transport: None,
        }
    }

    /// Shorthand for a client with just an API key.
    pub fn new(api_key: impl Into<HeaderValue>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// Build a client from `DIFFIO_API_KEY` (and `DIFFIO_API_BASE_URL`).
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a project and upload its source file.
    ///
    /// Two dependent remote calls: `create_project` returns a signed
    /// upload target, then the file bytes are sent to that target with
    /// the method it specifies.
    pub async fn create_project(
        &self,
        options: CreateProjectOptions,
    ) -> Result<CreateProjectResponse> {
        if options.file_path.as_os_str().is_empty() {
            return Err(DiffioError::Validation("file_path is required".to_string()));
        }
        let file_name = options
            .file_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| DiffioError::Validation("file_path has no file name".to_string()))?;
        let content_type = options
            .content_type
            .clone()
            .or_else(|| guess_content_type(&options.file_path).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let content_length = match options.content_length {
            Some(length) => length,
            None => tokio::fs::metadata(&options.file_path).await?.len(),
        };

        let mut payload = json!({
            "fileName": file_name,
            "contentType": content_type,
            "contentLength": content_length,
        });
        if let Some(params) = &options.params {
            payload["params"] = params.clone();
        }
        if let Some(file_format) = &options.file_format {
            payload["fileFormat"] = json!(file_format);
        }

        let response = self
            .request_json("create_project", payload, options.request.as_ref())
            .await?;
        let project: CreateProjectResponse = serde_json::from_value(response)?;

        let data = tokio::fs::read(&options.file_path).await?;
        self.upload_file(
            &project.upload_url,
            &project.upload_method,
            data,
            &content_type,
            options.request.as_ref(),
        )
        .await?;

        Ok(project)
    }

    /// Queue a generation against an uploaded project.
    ///
    /// The model key selects the endpoint; an unknown key fails before
    /// any network call. Note that the API offers no idempotency key, so
    /// enabling retries on this call can create duplicate generations if
    /// a transient 5xx hides a creation that actually went through.
    pub async fn create_generation(
        &self,
        options: CreateGenerationOptions,
    ) -> Result<CreateGenerationResponse> {
        if options.api_project_id.is_empty() {
            return Err(DiffioError::Validation(
                "api_project_id is required".to_string(),
            ));
        }
        let model = options.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let endpoint = model_endpoint(model)
            .ok_or_else(|| DiffioError::Validation(format!("unsupported model: {}", model)))?;

        let mut payload = json!({ "apiProjectId": options.api_project_id });
        if let Some(sampling) = &options.sampling {
            payload["sampling"] = sampling.clone();
        }
        if let Some(params) = &options.params {
            payload["params"] = params.clone();
        }

        let response = self
            .request_json(endpoint, payload, options.request.as_ref())
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// List the caller's projects.
    pub async fn list_projects(
        &self,
        options: Option<&RequestOptions>,
    ) -> Result<ListProjectsResponse> {
        let response = self
            .request_json("list_projects", json!({}), options)
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// List the generations queued against a project.
    pub async fn list_project_generations(
        &self,
        api_project_id: &str,
        options: Option<&RequestOptions>,
    ) -> Result<ListProjectGenerationsResponse> {
        if api_project_id.is_empty() {
            return Err(DiffioError::Validation(
                "api_project_id is required".to_string(),
            ));
        }
        let response = self
            .request_json(
                "list_project_generations",
                json!({ "apiProjectId": api_project_id }),
                options,
            )
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Fetch one point-in-time snapshot of a generation.
    pub async fn get_generation_progress(
        &self,
        generation_id: &str,
        api_project_id: Option<&str>,
        options: Option<&RequestOptions>,
    ) -> Result<GenerationProgress> {
        if generation_id.is_empty() {
            return Err(DiffioError::Validation(
                "generation_id is required".to_string(),
            ));
        }
        let mut payload = json!({ "generationId": generation_id });
        if let Some(project) = api_project_id {
            payload["apiProjectId"] = json!(project);
        }
        let response = self
            .request_json("get_generation_progress", payload, options)
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Resolve where a completed generation's artifact can be fetched.
    pub async fn get_generation_download(
        &self,
        options: GenerationDownloadOptions,
    ) -> Result<GenerationDownload> {
        if options.generation_id.is_empty() || options.api_project_id.is_empty() {
            return Err(DiffioError::Validation(
                "generation_id and api_project_id are required".to_string(),
            ));
        }
        let mut payload = json!({
            "generationId": options.generation_id,
            "apiProjectId": options.api_project_id,
        });
        if let Some(download_type) = options.download_type {
            payload["downloadType"] = json!(download_type.as_str());
        }
        let response = self
            .request_json("get_generation_download", payload, options.request.as_ref())
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// POST a JSON payload to an API path and return the parsed body.
    pub(crate) async fn request_json(
        &self,
        path: &str,
        payload: Value,
        options: Option<&RequestOptions>,
    ) -> Result<Value> {
        let extra = header_set([("Content-Type", "application/json")]);
        let body = serde_json::to_vec(&payload)?;
        let (descriptor, policy) = self
            .build_request(Method::POST, path, options, &extra, Some(body), false)
            .await?;
        let response = transport::execute(self.transport.as_ref(), &descriptor, &policy).await?;
        parse_json_body(&response)
    }

    /// Send file bytes to a signed upload address.
    pub(crate) async fn upload_file(
        &self,
        upload_url: &str,
        upload_method: &str,
        data: Vec<u8>,
        content_type: &str,
        options: Option<&RequestOptions>,
    ) -> Result<()> {
        let method = Method::from_bytes(upload_method.to_uppercase().as_bytes())
            .map_err(|_| {
                DiffioError::Validation(format!("unsupported upload method: {}", upload_method))
            })?;
        let mut extra = header_set([("Content-Type", content_type)]);
        if is_storage_emulator_url(upload_url) {
            extra.insert(
                "Authorization".to_string(),
                Some(HeaderValue::from("Bearer owner")),
            );
        }
        let (descriptor, policy) = self
            .build_request(method, upload_url, options, &extra, Some(data), true)
            .await?;
        let response = transport::execute(self.transport.as_ref(), &descriptor, &policy).await?;
        parse_json_body(&response).map(|_| ())
    }

    /// Fetch artifact bytes from a signed download address.
    pub(crate) async fn download_binary(
        &self,
        download_url: &str,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<u8>> {
        let mut extra = HeaderSet::new();
        if is_storage_emulator_url(download_url) {
            extra.insert(
                "Authorization".to_string(),
                Some(HeaderValue::from("Bearer owner")),
            );
        }
        let (descriptor, policy) = self
            .build_request(Method::GET, download_url, options, &extra, None, true)
            .await?;
        let response = transport::execute(self.transport.as_ref(), &descriptor, &policy).await?;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(api_error(&response))
        }
    }

    /// Build a [`RequestDescriptor`] and the retry policy that governs it.
    ///
    /// Signed-address calls (`absolute`) skip the client's default headers
    /// and the bearer credential: the address carries its own
    /// authorization.
    async fn build_request(
        &self,
        method: Method,
        target: &str,
        options: Option<&RequestOptions>,
        extra_headers: &HeaderSet,
        body: Option<Vec<u8>>,
        absolute: bool,
    ) -> Result<(RequestDescriptor, RetryPolicy)> {
        let api_key = match options.and_then(|o| o.api_key.clone()) {
            Some(key) => Some(key),
            None => self.api_key.resolve().await,
        };
        if api_key.is_none() && !absolute {
            return Err(DiffioError::Validation("api key is required".to_string()));
        }

        let mut merged = if absolute {
            HeaderSet::new()
        } else {
            let mut headers = self.headers.clone();
            if let Some(key) = &api_key {
                headers.insert(
                    "Authorization".to_string(),
                    Some(HeaderValue::from(format!("Bearer {}", key))),
                );
            }
            headers
        };
        if let Some(options) = options {
            merged = merge_headers(&[&merged, &options.headers]);
        }
        merged = merge_headers(&[&merged, extra_headers]);
        let headers = resolve_headers(&merged).await;

        let timeout = options.and_then(|o| o.timeout).or(self.timeout);
        let policy = RetryPolicy {
            max_attempts: options
                .and_then(|o| o.max_attempts)
                .unwrap_or(self.retry.max_attempts),
            backoff_base: options
                .and_then(|o| o.backoff_base)
                .unwrap_or(self.retry.backoff_base),
            retryable_status_codes: options
                .and_then(|o| o.retry_status_codes.clone())
                .unwrap_or_else(|| self.retry.retryable_status_codes.clone()),
        };

        let url = if absolute {
            target.to_string()
        } else {
            join(
                &self.base_url,
                &[self.api_prefix, target.trim_start_matches('/')],
            )
        };

        Ok((
            RequestDescriptor {
                method,
                url,
                headers,
                body,
                timeout,
                cancel: options.and_then(|o| o.cancel.clone()),
            },
            policy,
        ))
    }
}

/// Builder for [`DiffioClient`].
pub struct DiffioClientBuilder {
    api_key: Option<HeaderValue>,
    base_url: Option<String>,
    headers: HeaderSet,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    transport: Option<Arc<dyn HttpSend>>,
}

impl DiffioClientBuilder {
    /// Set the API key: a literal, or a producer resolved per request.
    pub fn api_key(mut self, api_key: impl Into<HeaderValue>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base address. Default: `DIFFIO_API_BASE_URL`, then the
    /// production address.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a default header sent with every API request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), Some(value.into()));
        self
    }

    /// Set the per-attempt deadline. Default: 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Remove the per-attempt deadline entirely.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the default retry policy. Default: [`RetryPolicy::none`].
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Replace the sender. Default: [`ReqwestTransport`].
    pub fn transport(mut self, transport: Arc<dyn HttpSend>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client, resolving the credential and base address.
    pub fn build(self) -> Result<DiffioClient> {
        let api_key = match self.api_key {
            Some(key) => key,
            None => HeaderValue::Literal(std::env::var(API_KEY_ENV).map_err(|_| {
                DiffioError::Validation("api key is required".to_string())
            })?),
        };
        let (base_url, api_prefix) = resolve_base_url(self.base_url.as_deref());

        let mut headers = header_set([
            ("X-Diffio-SDK-Language", "Rust"),
            ("X-Diffio-SDK-Name", "diffio"),
            ("X-Diffio-SDK-Version", SDK_VERSION),
        ]);
        headers.insert(
            "User-Agent".to_string(),
            Some(HeaderValue::from(format!("diffio/{}", SDK_VERSION))),
        );
        let headers = merge_headers(&[&headers, &self.headers]);

        Ok(DiffioClient {
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::default())),
            base_url,
            api_prefix,
            api_key,
            headers,
            timeout: self.timeout,
            retry: self.retry.unwrap_or_default(),
        })
    }
}

/// Classify a response the way the API speaks: 2xx with a JSON body is
/// the value; 2xx without one is tolerated as an empty object; anything
/// else maps to [`DiffioError::Api`].
pub(crate) fn parse_json_body(response: &RawResponse) -> Result<Value> {
    if !response.is_success() {
        return Err(api_error(response));
    }
    if response
        .content_type
        .as_deref()
        .is_some_and(|c| c.contains("application/json"))
    {
        return Ok(serde_json::from_slice(&response.body)?);
    }
    if response.status == 204 || response.body.is_empty() {
        return Ok(json!({}));
    }
    Ok(serde_json::from_slice(&response.body).unwrap_or_else(|_| json!({})))
}

/// Map a failure response to [`DiffioError::Api`], preferring the
/// server's `{"error": ...}` message when one is present.
pub(crate) fn api_error(response: &RawResponse) -> DiffioError {
    let is_json = response
        .content_type
        .as_deref()
        .is_some_and(|c| c.contains("application/json"));
    let body = if is_json {
        serde_json::from_slice::<Value>(&response.body).ok()
    } else {
        let text = response.text();
        (!text.is_empty()).then_some(Value::String(text))
    };
    let message = body
        .as_ref()
        .and_then(|b| b.get("error"))
        .and_then(|e| match e {
            Value::String(s) => (!s.is_empty()).then(|| s.clone()),
            Value::Null | Value::Bool(false) => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| format!("request failed with status {}", response.status));
    DiffioError::Api {
        status: response.status,
        message,
        body,
    }
}

/// Guess a content type from the file extension. Falls back to
/// `application/octet-stream` at the call site.
fn guess_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    let mime = match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "m4a" => "audio/x-m4a",
        "aac" => "audio/aac",
        "aif" | "aiff" => "audio/x-aiff",
        "wma" => "audio/x-ms-wma",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_client, write_temp_file};
    use crate::transport::{MockReply, MockTransport};

    #[test]
    fn test_builder_requires_api_key() {
        std::env::remove_var(API_KEY_ENV);
        let result = DiffioClient::builder().build();
        assert!(matches!(result, Err(DiffioError::Validation(_))));
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(
            guess_content_type(Path::new("song.WAV")),
            Some("audio/wav")
        );
        assert_eq!(
            guess_content_type(Path::new("clip.mov")),
            Some("video/quicktime")
        );
        assert_eq!(guess_content_type(Path::new("data.bin")), None);
        assert_eq!(guess_content_type(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_unsupported_model_fails_before_network() {
        let mock = Arc::new(MockTransport::fixed(MockReply::Response(
            RawResponse::json(200, &json!({})),
        )));
        let client = test_client(mock.clone());

        let result = client
            .create_generation(CreateGenerationOptions::new("proj_1").with_model("diffio-99"))
            .await;

        assert!(matches!(result, Err(DiffioError::Validation(_))));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_generation_routes_to_model_endpoint() {
        let mock = Arc::new(MockTransport::fixed(MockReply::Response(
            RawResponse::json(
                200,
                &json!({
                    "generationId": "gen_1",
                    "apiProjectId": "proj_1",
                    "modelKey": "diffio-2",
                    "status": "queued"
                }),
            ),
        )));
        let client = test_client(mock.clone());

        let generation = client
            .create_generation(CreateGenerationOptions::new("proj_1"))
            .await
            .unwrap();

        assert_eq!(generation.generation_id, "gen_1");
        let request = &mock.requests()[0];
        assert_eq!(request.url, "http://api.local/v1/diffio-2.0-generation");
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer test-key")
        );
        assert_eq!(
            request.headers.get("X-Diffio-SDK-Language").map(String::as_str),
            Some("Rust")
        );
        let payload: Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(payload, json!({"apiProjectId": "proj_1"}));
    }

    #[tokio::test]
    async fn test_create_project_uploads_after_create() {
        let path = write_temp_file("upload.wav", b"RIFFdata");
        let mock = Arc::new(MockTransport::new(vec![
            MockReply::Response(RawResponse::json(
                200,
                &json!({
                    "apiProjectId": "proj_1",
                    "uploadUrl": "http://upload.local/file",
                    "uploadMethod": "PUT"
                }),
            )),
            MockReply::Response(RawResponse::json(200, &json!({}))),
        ]));
        let client = test_client(mock.clone());

        let project = client
            .create_project(CreateProjectOptions::new(&path))
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(project.api_project_id, "proj_1");
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);

        let create = &requests[0];
        assert_eq!(create.url, "http://api.local/v1/create_project");
        let payload: Value = serde_json::from_slice(create.body.as_ref().unwrap()).unwrap();
        assert_eq!(payload["contentType"], "audio/wav");
        assert_eq!(payload["contentLength"], 8);
        assert!(payload["fileName"].as_str().unwrap().ends_with(".wav"));

        // The signed-address upload bypasses the bearer credential.
        let upload = &requests[1];
        assert_eq!(upload.method, Method::PUT);
        assert_eq!(upload.url, "http://upload.local/file");
        assert!(upload.headers.get("Authorization").is_none());
        assert_eq!(
            upload.headers.get("Content-Type").map(String::as_str),
            Some("audio/wav")
        );
        assert_eq!(upload.body.as_deref(), Some(b"RIFFdata".as_slice()));
    }

    #[tokio::test]
    async fn test_api_error_prefers_server_message() {
        let mock = Arc::new(MockTransport::fixed(MockReply::Response(
            RawResponse::json(403, &json!({"error": "invalid api key"})),
        )));
        let client = test_client(mock);

        let result = client.list_projects(None).await;
        match result {
            Err(DiffioError::Api { status, message, .. }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "invalid api key");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_generic_message_for_opaque_body() {
        let response = RawResponse {
            status: 502,
            content_type: Some("text/html".to_string()),
            body: b"<html>bad gateway</html>".to_vec(),
        };
        match api_error(&response) {
            DiffioError::Api { status, message, body } => {
                assert_eq!(status, 502);
                assert_eq!(message, "request failed with status 502");
                assert_eq!(body, Some(Value::String("<html>bad gateway</html>".into())));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_json_body_tolerates_empty_success() {
        let response = RawResponse {
            status: 204,
            content_type: None,
            body: Vec::new(),
        };
        assert_eq!(parse_json_body(&response).unwrap(), json!({}));

        let response = RawResponse {
            status: 200,
            content_type: Some("text/plain".to_string()),
            body: b"not json".to_vec(),
        };
        assert_eq!(parse_json_body(&response).unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_per_call_api_key_overrides_client() {
        let mock = Arc::new(MockTransport::fixed(MockReply::Response(
            RawResponse::json(200, &json!({"projects": []})),
        )));
        let client = test_client(mock.clone());

        let options = RequestOptions::new().with_api_key("other-key");
        client.list_projects(Some(&options)).await.unwrap();

        let request = &mock.requests()[0];
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer other-key")
        );
    }
}

//! Wire types for the Diffio API.
//!
//! Field names map 1:1 to the JSON the service speaks (camelCase on the
//! wire). Optional wire fields default the way the service treats them:
//! a missing `uploadMethod` means `PUT`, a missing stage status means
//! `pending`, a missing progress means 0.

use serde::{Deserialize, Serialize};

/// Artifact kind produced by a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadType {
    Audio,
    Video,
}

impl DownloadType {
    /// The wire string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadType::Audio => "audio",
            DownloadType::Video => "video",
        }
    }
}

impl std::fmt::Display for DownloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status of a generation. `Complete` and `Failed` are terminal:
/// no further polling follows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Queued,
    Processing,
    Complete,
    Failed,
    /// Any status string this client version does not know.
    #[serde(other)]
    Unknown,
}

impl GenerationStatus {
    /// Whether this status ends the generation's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Complete | GenerationStatus::Failed)
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            GenerationStatus::Queued => "queued",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Complete => "complete",
            GenerationStatus::Failed => "failed",
            GenerationStatus::Unknown => "unknown",
        };
        f.write_str(tag)
    }
}

fn default_upload_method() -> String {
    "PUT".to_string()
}

/// Response from `create_project`: the new project plus the signed
/// address the source file must be uploaded to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectResponse {
    pub api_project_id: String,
    /// Time-bounded signed address for the source upload.
    pub upload_url: String,
    /// HTTP method the signed address expects. Defaults to `PUT`.
    #[serde(default = "default_upload_method")]
    pub upload_method: String,
    #[serde(default)]
    pub object_path: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub expires_at: String,
}

/// One project in a `list_projects` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub api_project_id: String,
    #[serde(default = "default_project_status")]
    pub status: String,
    #[serde(default)]
    pub original_file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub has_video: bool,
    #[serde(default)]
    pub generation_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_project_status() -> String {
    "uploading".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListProjectsResponse {
    #[serde(default)]
    pub projects: Vec<ProjectSummary>,
}

/// Response from a generation-creation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenerationResponse {
    pub generation_id: String,
    pub api_project_id: String,
    #[serde(default)]
    pub model_key: String,
    #[serde(default)]
    pub status: String,
}

/// One generation in a `list_project_generations` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGenerationSummary {
    pub generation_id: String,
    #[serde(default = "default_generation_status")]
    pub status: String,
    #[serde(default)]
    pub model_key: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_generation_status() -> String {
    "queued".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectGenerationsResponse {
    #[serde(default)]
    pub api_project_id: String,
    #[serde(default)]
    pub generations: Vec<ProjectGenerationSummary>,
}

/// Progress of one named processing stage inside a generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageProgress {
    pub job_id: Option<String>,
    pub job_state: Option<String>,
    pub status: String,
    /// Percentage, 0 to 100.
    pub progress: f64,
    pub status_message: Option<String>,
    pub error: Option<String>,
    pub error_details: Option<String>,
}

impl Default for StageProgress {
    fn default() -> Self {
        Self {
            job_id: None,
            job_state: None,
            status: "pending".to_string(),
            progress: 0.0,
            status_message: None,
            error: None,
            error_details: None,
        }
    }
}

/// A point-in-time snapshot of a generation's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationProgress {
    pub generation_id: String,
    #[serde(default)]
    pub api_project_id: String,
    pub status: GenerationStatus,
    #[serde(default)]
    pub has_video: bool,
    #[serde(default)]
    pub pre_processing: StageProgress,
    #[serde(default)]
    pub inference: StageProgress,
    #[serde(default)]
    pub restored_video: Option<StageProgress>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_details: Option<String>,
}

/// Response from `get_generation_download`: where the finished artifact
/// can be fetched from. The address is time-bounded and carries its own
/// authorization; no bearer header is sent to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationDownload {
    pub generation_id: String,
    #[serde(default)]
    pub api_project_id: String,
    #[serde(default)]
    pub download_type: String,
    pub download_url: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub mime_type: String,
}

/// Result of the isolate entry point: the created project and the
/// generation queued against it. Polling has not started yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationResult {
    pub project: CreateProjectResponse,
    pub generation: CreateGenerationResponse,
}

/// The stages a restore workflow moves through, in order. The workflow
/// only ever moves forward along this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestoreStage {
    #[default]
    Start,
    Isolate,
    Generation,
    Progress,
    DownloadInfo,
    Download,
    Complete,
}

impl std::fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            RestoreStage::Start => "start",
            RestoreStage::Isolate => "isolate",
            RestoreStage::Generation => "generation",
            RestoreStage::Progress => "progress",
            RestoreStage::DownloadInfo => "download_info",
            RestoreStage::Download => "download",
            RestoreStage::Complete => "complete",
        };
        f.write_str(tag)
    }
}

/// Mutable record of one restore workflow invocation: how far it got,
/// the last observed state of the generation, and failure details.
///
/// Created at the start of a [`restore`](crate::DiffioClient::restore)
/// call, mutated in place as stages complete or fail, and returned (or
/// embedded in [`DiffioError::Restore`](crate::DiffioError::Restore))
/// at the end. Never shared across invocations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreMetadata {
    /// True only when every stage completed and artifact bytes exist.
    pub ok: bool,
    /// Furthest stage reached.
    pub stage: RestoreStage,
    pub api_project_id: Option<String>,
    pub generation_id: Option<String>,
    pub project: Option<CreateProjectResponse>,
    pub generation: Option<CreateGenerationResponse>,
    /// Last generation snapshot observed, if any.
    pub progress: Option<GenerationProgress>,
    pub download: Option<GenerationDownload>,
    pub download_type: Option<String>,
    pub download_url: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    /// Last observed overall status.
    pub status: Option<GenerationStatus>,
    pub error: Option<String>,
    pub error_details: Option<String>,
    /// Variant tag of the error that stopped the workflow.
    pub error_kind: Option<&'static str>,
}

impl RestoreMetadata {
    /// Move to a later stage. Writes that would move backwards are
    /// ignored, so the furthest stage reached is never lost.
    pub(crate) fn advance(&mut self, next: RestoreStage) {
        if next > self.stage {
            self.stage = next;
        }
    }

    /// Record the error that stopped the workflow.
    pub(crate) fn record_error(&mut self, error: &crate::DiffioError) {
        self.error = Some(error.to_string());
        self.error_kind = Some(error.kind());
    }
}

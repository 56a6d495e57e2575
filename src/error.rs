use crate::api::RestoreMetadata;
use thiserror::Error;

/// Errors produced by the client and its components.
#[derive(Error, Debug)]
pub enum DiffioError {
    /// A caller-supplied argument was invalid (missing required field,
    /// unsupported model, unsupported enum value). Raised before any
    /// network call and never retried.
    #[error("{0}")]
    Validation(String),

    /// The API returned a non-2xx status after retries were exhausted.
    ///
    /// `message` is the server's `{"error": "..."}` field when present,
    /// otherwise a generic description. `body` holds the raw response
    /// body (parsed JSON, or the text wrapped in a JSON string).
    #[error("HTTP {status}: {message}")]
    Api {
        /// HTTP status code (e.g. 400, 429, 500).
        status: u16,
        /// Human-readable error message.
        message: String,
        /// Raw response body, if any.
        body: Option<serde_json::Value>,
    },

    /// A deadline elapsed: either a single request attempt ran past its
    /// timeout, or the polling loop ran past its overall deadline.
    /// Distinct from [`DiffioError::Request`] so callers can react
    /// differently (the transport retries attempt timeouts).
    #[error("{0}")]
    Timeout(String),

    /// The remote generation itself reported failure. Not a transport
    /// problem: the message embeds the per-stage statuses and the
    /// generation's own error fields.
    #[error("{0}")]
    JobFailed(String),

    /// The operation was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Low-level HTTP transport failure (connection refused, DNS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the local file to upload failed.
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A `restore` pipeline failed partway through. Carries the causing
    /// error together with the metadata accumulated up to the failure,
    /// so callers can inspect both.
    #[error("restore failed at stage {}: {source}", .metadata.stage)]
    Restore {
        /// The error that stopped the pipeline.
        #[source]
        source: Box<DiffioError>,
        /// Workflow state at the moment of failure.
        metadata: Box<RestoreMetadata>,
    },

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl DiffioError {
    /// Stable tag naming the variant, used in [`RestoreMetadata`] to
    /// record which kind of failure stopped a workflow.
    pub fn kind(&self) -> &'static str {
        match self {
            DiffioError::Validation(_) => "validation",
            DiffioError::Api { .. } => "api",
            DiffioError::Timeout(_) => "timeout",
            DiffioError::JobFailed(_) => "job_failed",
            DiffioError::Cancelled => "cancelled",
            DiffioError::Request(_) => "request",
            DiffioError::Json(_) => "json",
            DiffioError::Io(_) => "io",
            DiffioError::Restore { .. } => "restore",
            DiffioError::Other(_) => "other",
        }
    }
}

impl From<anyhow::Error> for DiffioError {
    fn from(err: anyhow::Error) -> Self {
        DiffioError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiffioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = DiffioError::Api {
            status: 429,
            message: "rate limited".into(),
            body: None,
        };
        assert_eq!(err.to_string(), "HTTP 429: rate limited");
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(DiffioError::Cancelled.kind(), "cancelled");
        assert_eq!(DiffioError::Timeout("t".into()).kind(), "timeout");
        assert_eq!(DiffioError::JobFailed("f".into()).kind(), "job_failed");
    }

    #[test]
    fn test_restore_error_display_names_stage() {
        let mut metadata = RestoreMetadata::default();
        metadata.advance(crate::api::RestoreStage::Progress);
        let err = DiffioError::Restore {
            source: Box::new(DiffioError::Timeout("timed out".into())),
            metadata: Box::new(metadata),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("progress"), "got: {}", rendered);
        assert!(rendered.contains("timed out"), "got: {}", rendered);
    }
}

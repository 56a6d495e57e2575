//! # Diffio
//!
//! Rust client for the Diffio audio restoration API.
//!
//! The API is a multi-step remote workflow: upload a file, queue a
//! processing generation, poll it to completion, download the produced
//! artifact. This crate provides the pieces individually — resilient
//! transport, completion polling, per-resource operations — and
//! [`DiffioClient::restore`], which chains the whole pipeline into one
//! call while accumulating enough state to diagnose a failure at any
//! stage.
//!
//! ## Core Concepts
//!
//! - **[`DiffioClient`]** — holds the credential, base address, default
//!   headers, timeout, and retry policy. Built once, shared freely.
//! - **[`transport`]** — every request goes through one retry engine with
//!   exponential backoff; [`transport::HttpSend`] is the seam that lets
//!   tests substitute [`transport::MockTransport`] for the network.
//! - **[`WaitOptions`]** / [`DiffioClient::wait_for_generation`] — turn
//!   the generation's remote state machine into a single awaited
//!   snapshot, with a fallible per-snapshot callback or a finite
//!   [`DiffioClient::progress_updates`] stream.
//! - **[`RestoreOptions`]** / [`DiffioClient::restore`] — the full
//!   pipeline. Returns `(Option<Vec<u8>>, RestoreMetadata)`; with
//!   `raise_on_error` unset it never fails, it reports.
//! - **[`RestoreMetadata`]** — one record per restore call: furthest
//!   stage reached, last generation snapshot, failure details.
//!
//! ## Quick Start
//!
//! ```no_run
//! use diffio::{DiffioClient, RestoreOptions};
//!
//! #[tokio::main]
//! async fn main() -> diffio::Result<()> {
//!     let client = DiffioClient::from_env()?;
//!
//!     let options = RestoreOptions::new("recording.wav")
//!         .with_model("diffio-2")
//!         .with_show_progress(true);
//!     let (content, metadata) = client.restore(options).await?;
//!
//!     match content {
//!         Some(bytes) => std::fs::write("restored.wav", bytes)?,
//!         None => eprintln!("failed at {}: {:?}", metadata.stage, metadata.error),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Retry, timeout, cancellation
//!
//! Retries happen in exactly one place, the transport engine, governed
//! by [`RetryPolicy`]: retryable statuses and transport failures are
//! retried with `backoff_base * 2^k` waits, everything else surfaces
//! immediately. Each physical attempt is bounded by the configured
//! timeout and by an optional [`tokio_util::sync::CancellationToken`],
//! and the two bounds are distinguishable after the fact
//! ([`DiffioError::Timeout`] vs [`DiffioError::Cancelled`]).

pub mod api;
pub mod client;
pub mod error;
pub mod headers;
pub mod poll;
pub mod resources;
pub mod restore;
pub mod retry;
pub mod transport;
pub mod url;
pub mod webhook;

#[cfg(test)]
mod testutil;

// --- Primary exports ---
pub use api::{
    CreateGenerationResponse, CreateProjectResponse, DownloadType, GenerationDownload,
    GenerationProgress, GenerationStatus, IsolationResult, ListProjectGenerationsResponse,
    ListProjectsResponse, ProjectGenerationSummary, ProjectSummary, RestoreMetadata, RestoreStage,
    StageProgress,
};
pub use client::{
    CreateGenerationOptions, CreateProjectOptions, DiffioClient, DiffioClientBuilder,
    GenerationDownloadOptions, RequestOptions, DEFAULT_MODEL,
};
pub use error::{DiffioError, Result};
pub use headers::{HeaderProducer, HeaderValue};
pub use poll::{format_progress, WaitOptions};
pub use resources::{AudioIsolation, Generations, Projects, Webhooks};
pub use restore::{IsolateOptions, ProgressCallback, RestoreOptions};
pub use retry::RetryPolicy;
pub use transport::{
    HttpSend, MockReply, MockTransport, RawResponse, RequestDescriptor, ReqwestTransport,
};
pub use webhook::GenerationWebhookEvent;

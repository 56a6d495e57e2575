//! Resource accessors: borrowed handles grouping operations by API
//! surface. Each method forwards to the client; nothing here talks to
//! the network itself.

use crate::api::{
    GenerationDownload, GenerationProgress, IsolationResult, ListProjectGenerationsResponse,
    ListProjectsResponse, RestoreMetadata,
};
use crate::client::{
    CreateGenerationOptions, CreateProjectOptions, DiffioClient, GenerationDownloadOptions,
    RequestOptions,
};
use crate::error::Result;
use crate::poll::WaitOptions;
use crate::restore::{IsolateOptions, RestoreOptions};
use crate::webhook::{WebhookPortalResponse, WebhookTestEventOptions, WebhookTestEventResponse};

/// Operations on the audio-isolation surface.
#[derive(Debug, Clone, Copy)]
pub struct AudioIsolation<'a> {
    client: &'a DiffioClient,
}

impl AudioIsolation<'_> {
    /// Upload and queue a generation; do not wait for it.
    pub async fn isolate(&self, options: &IsolateOptions) -> Result<IsolationResult> {
        self.client.isolate(options).await
    }

    /// Alias kept for callers used to the conversion-style name.
    pub async fn convert(&self, options: &IsolateOptions) -> Result<IsolationResult> {
        self.client.isolate(options).await
    }

    /// Run the full restore pipeline.
    pub async fn restore(
        &self,
        options: RestoreOptions,
    ) -> Result<(Option<Vec<u8>>, RestoreMetadata)> {
        self.client.restore(options).await
    }
}

/// Operations on generations.
#[derive(Debug, Clone, Copy)]
pub struct Generations<'a> {
    client: &'a DiffioClient,
}

impl Generations<'_> {
    pub async fn create(
        &self,
        options: CreateGenerationOptions,
    ) -> Result<crate::api::CreateGenerationResponse> {
        self.client.create_generation(options).await
    }

    pub async fn progress(
        &self,
        generation_id: &str,
        api_project_id: Option<&str>,
        options: Option<&RequestOptions>,
    ) -> Result<GenerationProgress> {
        self.client
            .get_generation_progress(generation_id, api_project_id, options)
            .await
    }

    pub async fn wait(&self, options: &WaitOptions) -> Result<GenerationProgress> {
        self.client.wait_for_generation(options).await
    }

    pub async fn download(
        &self,
        options: GenerationDownloadOptions,
    ) -> Result<GenerationDownload> {
        self.client.get_generation_download(options).await
    }
}

/// Operations on projects.
#[derive(Debug, Clone, Copy)]
pub struct Projects<'a> {
    client: &'a DiffioClient,
}

impl Projects<'_> {
    pub async fn create(
        &self,
        options: CreateProjectOptions,
    ) -> Result<crate::api::CreateProjectResponse> {
        self.client.create_project(options).await
    }

    pub async fn list(&self, options: Option<&RequestOptions>) -> Result<ListProjectsResponse> {
        self.client.list_projects(options).await
    }

    pub async fn list_generations(
        &self,
        api_project_id: &str,
        options: Option<&RequestOptions>,
    ) -> Result<ListProjectGenerationsResponse> {
        self.client
            .list_project_generations(api_project_id, options)
            .await
    }
}

/// Operations on webhook configuration.
#[derive(Debug, Clone, Copy)]
pub struct Webhooks<'a> {
    client: &'a DiffioClient,
}

impl Webhooks<'_> {
    pub async fn send_test_event(
        &self,
        options: WebhookTestEventOptions,
    ) -> Result<WebhookTestEventResponse> {
        self.client.send_webhook_test_event(options).await
    }

    pub async fn portal_access(
        &self,
        mode: &str,
        api_key_id: Option<&str>,
        options: Option<&RequestOptions>,
    ) -> Result<WebhookPortalResponse> {
        self.client
            .get_webhook_portal_access(mode, api_key_id, options)
            .await
    }
}

impl DiffioClient {
    /// Accessor for the audio-isolation surface.
    pub fn audio_isolation(&self) -> AudioIsolation<'_> {
        AudioIsolation { client: self }
    }

    /// Accessor for generation operations.
    pub fn generations(&self) -> Generations<'_> {
        Generations { client: self }
    }

    /// Accessor for project operations.
    pub fn projects(&self) -> Projects<'_> {
        Projects { client: self }
    }

    /// Accessor for webhook operations.
    pub fn webhooks(&self) -> Webhooks<'_> {
        Webhooks { client: self }
    }
}

//! The real sender, backed by [`reqwest`].

use super::{HttpSend, RawResponse, RequestDescriptor};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

/// [`HttpSend`] implementation over a shared [`reqwest::Client`].
///
/// The client is built without a request timeout of its own: attempt
/// deadlines are enforced by the transport layer so that they surface as
/// [`DiffioError::Timeout`](crate::DiffioError::Timeout) rather than a
/// generic connection error.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wrap an existing client (connection pools are shared through it).
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

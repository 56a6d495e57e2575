//! Webhooks: test events, portal access, and verification of inbound
//! generation notifications.
//!
//! The service signs every delivery with HMAC-SHA256 over
//! `{id}.{timestamp}.{payload}` and sends the result in three headers
//! ([`SIGNATURE_ID_HEADER`], [`SIGNATURE_TIMESTAMP_HEADER`],
//! [`SIGNATURE_HEADER`]). [`verify_signature`] rejects a delivery when
//! any header is absent or no signature candidate matches;
//! [`parse_event`] verifies and then decodes the payload.

use crate::client::{DiffioClient, RequestOptions};
use crate::error::{DiffioError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery identifier.
pub const SIGNATURE_ID_HEADER: &str = "svix-id";
/// Header carrying the delivery timestamp (unix seconds).
pub const SIGNATURE_TIMESTAMP_HEADER: &str = "svix-timestamp";
/// Header carrying the space-separated signature candidates.
pub const SIGNATURE_HEADER: &str = "svix-signature";

/// Event types the service emits.
pub const WEBHOOK_EVENT_TYPES: &[&str] = &[
    "generation.queued",
    "generation.processing",
    "generation.failed",
    "generation.completed",
];

/// Webhook delivery modes.
pub const WEBHOOK_MODES: &[&str] = &["test", "live"];

/// An inbound generation notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationWebhookEvent {
    pub event_type: String,
    pub event_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub api_key_id: String,
    #[serde(default)]
    pub api_project_id: Option<String>,
    pub generation_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub has_video: Option<bool>,
    #[serde(default)]
    pub model_key: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_details: Option<String>,
}

/// Response from `webhooks/send_test_event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookTestEventResponse {
    #[serde(default)]
    pub svix_message_id: String,
    pub event_id: String,
    pub event_type: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub api_key_id: Option<String>,
}

/// Response from `webhooks/portal_access`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPortalResponse {
    pub portal_url: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub api_key_id: Option<String>,
}

/// Options for [`DiffioClient::send_webhook_test_event`].
#[derive(Debug, Clone, Default)]
pub struct WebhookTestEventOptions {
    /// One of [`WEBHOOK_EVENT_TYPES`]. Required.
    pub event_type: String,
    /// One of [`WEBHOOK_MODES`]. Required.
    pub mode: String,
    pub api_key_id: Option<String>,
    /// Replaces the generated sample payload; must be a JSON object.
    pub sample_payload: Option<Value>,
    pub request: Option<RequestOptions>,
}

impl WebhookTestEventOptions {
    pub fn new(event_type: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            mode: mode.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key_id(mut self, api_key_id: impl Into<String>) -> Self {
        self.api_key_id = Some(api_key_id.into());
        self
    }

    pub fn with_sample_payload(mut self, payload: Value) -> Self {
        self.sample_payload = Some(payload);
        self
    }
}

impl DiffioClient {
    /// Ask the service to deliver a synthetic event to the configured
    /// webhook endpoints.
    pub async fn send_webhook_test_event(
        &self,
        options: WebhookTestEventOptions,
    ) -> Result<WebhookTestEventResponse> {
        if !WEBHOOK_EVENT_TYPES.contains(&options.event_type.as_str()) {
            return Err(DiffioError::Validation(format!(
                "unsupported event type: {}",
                options.event_type
            )));
        }
        if !WEBHOOK_MODES.contains(&options.mode.as_str()) {
            return Err(DiffioError::Validation(
                "mode must be test or live".to_string(),
            ));
        }
        if let Some(sample) = &options.sample_payload {
            if !sample.is_object() {
                return Err(DiffioError::Validation(
                    "sample_payload must be an object".to_string(),
                ));
            }
        }

        let mut payload = json!({
            "eventType": options.event_type,
            "mode": options.mode,
        });
        if let Some(api_key_id) = &options.api_key_id {
            payload["apiKeyId"] = json!(api_key_id);
        }
        if let Some(sample) = &options.sample_payload {
            payload["samplePayload"] = sample.clone();
        }

        let response = self
            .request_json("webhooks/send_test_event", payload, options.request.as_ref())
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Resolve a management-portal address for the webhook configuration.
    pub async fn get_webhook_portal_access(
        &self,
        mode: &str,
        api_key_id: Option<&str>,
        options: Option<&RequestOptions>,
    ) -> Result<WebhookPortalResponse> {
        if !WEBHOOK_MODES.contains(&mode) {
            return Err(DiffioError::Validation(
                "mode must be test or live".to_string(),
            ));
        }
        let mut payload = json!({ "mode": mode });
        if let Some(api_key_id) = api_key_id {
            payload["apiKeyId"] = json!(api_key_id);
        }
        let response = self
            .request_json("webhooks/portal_access", payload, options)
            .await?;
        Ok(serde_json::from_value(response)?)
    }
}

fn decode_secret(secret: &str) -> Vec<u8> {
    let trimmed = secret.strip_prefix("whsec_").unwrap_or(secret);
    BASE64
        .decode(trimmed)
        .unwrap_or_else(|_| trimmed.as_bytes().to_vec())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Compute the `v1,<base64>` signature for a payload, as the service
/// would. Useful for building test deliveries.
pub fn sign(secret: &str, id: &str, timestamp: &str, payload: &[u8]) -> Result<String> {
    let key = decode_secret(secret);
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|_| DiffioError::Validation("invalid webhook secret".to_string()))?;
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!("v1,{}", BASE64.encode(mac.finalize().into_bytes())))
}

/// Verify an inbound delivery against the shared secret.
///
/// Rejects when any of the three headers is absent or when none of the
/// space-separated `v1,<sig>` candidates matches the recomputed
/// signature. Comparison is constant-time.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    id: Option<&str>,
    timestamp: Option<&str>,
    signature: Option<&str>,
) -> Result<()> {
    let id = id.ok_or_else(|| missing_header(SIGNATURE_ID_HEADER))?;
    let timestamp = timestamp.ok_or_else(|| missing_header(SIGNATURE_TIMESTAMP_HEADER))?;
    let signature = signature.ok_or_else(|| missing_header(SIGNATURE_HEADER))?;

    let expected = sign(secret, id, timestamp, payload)?;
    let expected_sig = expected.split_once(',').map(|(_, sig)| sig).unwrap_or("");

    for candidate in signature.split_whitespace() {
        let Some((version, candidate_sig)) = candidate.split_once(',') else {
            continue;
        };
        if version == "v1" && constant_time_eq(candidate_sig.as_bytes(), expected_sig.as_bytes())
        {
            return Ok(());
        }
    }
    Err(DiffioError::Validation(
        "webhook signature mismatch".to_string(),
    ))
}

fn missing_header(name: &str) -> DiffioError {
    DiffioError::Validation(format!("missing webhook header: {}", name))
}

/// Verify a delivery and decode its payload.
pub fn parse_event(
    secret: &str,
    payload: &[u8],
    id: Option<&str>,
    timestamp: Option<&str>,
    signature: Option<&str>,
) -> Result<GenerationWebhookEvent> {
    verify_signature(secret, payload, id, timestamp, signature)?;
    Ok(serde_json::from_slice(payload)?)
}

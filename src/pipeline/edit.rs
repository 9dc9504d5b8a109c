//! Image-edit call: the hard dependency of the pipeline.
//!
//! One POST to the edit endpoint with the fixed redecoration instruction.
//! There are no retries; a failed attempt terminates the request. Failures
//! are classified so the server can answer with the right status:
//!
//! | Upstream outcome | Error |
//! |---|---|
//! | non-2xx, status < 500 | [`RestyleError::UpstreamClient`] |
//! | non-2xx, status ≥ 500 | [`RestyleError::UpstreamServer`] |
//! | 2xx without `data[0].b64_json` | [`RestyleError::Protocol`] |
//! | timeout | [`RestyleError::EditTimeout`] |
//! | other transport failure | [`RestyleError::EditRequestFailed`] |

use crate::config::RestyleConfig;
use crate::error::RestyleError;
use crate::pipeline::normalize::{strip_data_uri, NormalizedImage};
use crate::prompts::EDIT_INSTRUCTION;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Message used when the edit service answers 2xx without an image.
pub const MISSING_IMAGE_MESSAGE: &str = "Edit service response contained no image";

/// The redecorated image, as bare base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedImage {
    pub image_base64: String,
}

/// Success or classified failure of one edit call.
pub type EditOutcome = Result<EditedImage, RestyleError>;

/// Something that can redecorate a room photo.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn edit(&self, image: &NormalizedImage) -> EditOutcome;
}

#[derive(Debug, Serialize)]
struct EditRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<ImageRef<'a>>,
    n: u32,
    size: &'a str,
    quality: &'a str,
}

#[derive(Debug, Serialize)]
struct ImageRef<'a> {
    image_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    #[serde(default)]
    data: Vec<EditDatum>,
}

#[derive(Debug, Deserialize)]
struct EditDatum {
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// [`ImageEditor`] backed by an OpenAI-compatible `images/edits` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiImageEditor {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    size: String,
    quality: String,
    timeout_secs: u64,
}

impl OpenAiImageEditor {
    pub fn new(client: reqwest::Client, config: &RestyleConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: config.edit_url.clone(),
            api_key: api_key.into(),
            model: config.edit_model.clone(),
            size: config.image_size.clone(),
            quality: config.image_quality.clone(),
            timeout_secs: config.edit_timeout_secs,
        }
    }
}

#[async_trait]
impl ImageEditor for OpenAiImageEditor {
    async fn edit(&self, image: &NormalizedImage) -> EditOutcome {
        let start = Instant::now();
        let request = EditRequest {
            model: &self.model,
            prompt: EDIT_INSTRUCTION,
            images: vec![ImageRef {
                image_url: image.as_str(),
            }],
            n: 1,
            size: &self.size,
            quality: &self.quality,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!(
            "Edit service answered {} ({} bytes) in {:?}",
            status,
            body.len(),
            start.elapsed()
        );

        if !status.is_success() {
            let err = classify_failure(status, &body);
            warn!("Edit service rejected request: {}", err);
            return Err(err);
        }

        parse_edit_response(&body)
    }
}

impl OpenAiImageEditor {
    fn transport_error(&self, e: reqwest::Error) -> RestyleError {
        if e.is_timeout() {
            RestyleError::EditTimeout {
                secs: self.timeout_secs,
            }
        } else {
            RestyleError::EditRequestFailed(e.to_string())
        }
    }
}

/// Map a non-2xx edit response to an upstream error.
///
/// The message comes from `error.message` in a JSON envelope when present,
/// otherwise the status reason phrase, otherwise the raw body.
pub fn classify_failure(status: StatusCode, body: &str) -> RestyleError {
    let from_json = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty());

    let message = from_json
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    if status.is_server_error() {
        RestyleError::UpstreamServer {
            status: status.as_u16(),
            message,
        }
    } else {
        RestyleError::UpstreamClient {
            status: status.as_u16(),
            message,
        }
    }
}

/// Pull the image payload out of a 2xx edit response.
pub fn parse_edit_response(body: &str) -> EditOutcome {
    let parsed: EditResponse = serde_json::from_str(body).map_err(|e| {
        warn!("Edit service returned undecodable body: {}", e);
        RestyleError::Protocol(MISSING_IMAGE_MESSAGE.to_string())
    })?;

    parsed
        .data
        .into_iter()
        .next()
        .and_then(|d| d.b64_json)
        .map(|b64| strip_data_uri(&b64).to_string())
        .filter(|b64| !b64.is_empty())
        .map(|image_base64| EditedImage { image_base64 })
        .ok_or_else(|| RestyleError::Protocol(MISSING_IMAGE_MESSAGE.to_string()))
}

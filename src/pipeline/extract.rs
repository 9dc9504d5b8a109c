//! Item listing: ask a vision chat model what furniture is in the edited room.
//!
//! This is the soft dependency of the pipeline. The extractor returns
//! `Result<ParsedItems, ExtractionError>` and the orchestrator turns every
//! error into an empty list, so nothing here can fail a request.
//!
//! ## Reply parsing
//!
//! Models are asked for `{"itens": [...]}` but do not always comply, so
//! [`parse_items`] has two explicit branches:
//!
//! 1. **Structured** — the reply is a JSON object whose `itens` field is an
//!    array of strings; returned verbatim.
//! 2. **Unstructured** — anything else is scanned line by line, list markers
//!    and wrapping quotes are stripped, and lines under 3 characters dropped.
//!
//! When neither yields anything the result is [`ParsedItems::Empty`].

use crate::config::RestyleConfig;
use crate::error::ExtractionError;
use crate::pipeline::normalize::normalize;
use crate::prompts::{ITEMS_FIELD, LIST_ITEMS_PROMPT};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Lines shorter than this (in characters) are dropped by the fallback scan.
const MIN_LINE_CHARS: usize = 3;

/// Outcome of parsing one listing reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedItems {
    /// The reply was the requested JSON object.
    Structured(Vec<String>),
    /// The reply was free text; items recovered line by line.
    Unstructured(Vec<String>),
    /// Nothing usable.
    Empty,
}

impl ParsedItems {
    /// Collapse into a plain item list; `Empty` becomes `[]`.
    pub fn into_items(self) -> Vec<String> {
        match self {
            ParsedItems::Structured(items) | ParsedItems::Unstructured(items) => items,
            ParsedItems::Empty => Vec::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParsedItems::Structured(_) => "structured",
            ParsedItems::Unstructured(_) => "unstructured",
            ParsedItems::Empty => "empty",
        }
    }
}

/// Something that can list the items visible in a room photo.
#[async_trait]
pub trait ItemExtractor: Send + Sync {
    /// `edited_base64` is the edit service's output, bare or as a data URI.
    async fn extract_items(&self, edited_base64: &str) -> Result<ParsedItems, ExtractionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// [`ItemExtractor`] backed by an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiItemExtractor {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    default_mime: String,
    timeout_secs: u64,
}

impl OpenAiItemExtractor {
    pub fn new(client: reqwest::Client, config: &RestyleConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: config.chat_url.clone(),
            api_key: api_key.into(),
            model: config.chat_model.clone(),
            max_tokens: config.chat_max_tokens,
            default_mime: config.default_mime.clone(),
            timeout_secs: config.extract_timeout_secs,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ExtractionError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl ItemExtractor for OpenAiItemExtractor {
    async fn extract_items(&self, edited_base64: &str) -> Result<ParsedItems, ExtractionError> {
        let start = Instant::now();
        let image = normalize(edited_base64, &self.default_mime);
        let request = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: LIST_ITEMS_PROMPT,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.as_str(),
                        },
                    },
                ],
            }],
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

        if !status.is_success() {
            return Err(ExtractionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let text = reply_text(&body)?;
        let parsed = parse_items(&text);
        debug!(
            "Listing reply parsed as {} in {:?}",
            parsed.kind(),
            start.elapsed()
        );
        Ok(parsed)
    }
}

/// `choices[0].message.content`, trimmed; missing content is an empty reply.
fn reply_text(body: &str) -> Result<String, ExtractionError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

/// Parse a listing reply, strict JSON first, line scan second.
pub fn parse_items(reply: &str) -> ParsedItems {
    let reply = reply.trim();
    if let Some(items) = parse_structured(reply) {
        return ParsedItems::Structured(items);
    }
    let lines = parse_lines(reply);
    if lines.is_empty() {
        ParsedItems::Empty
    } else {
        ParsedItems::Unstructured(lines)
    }
}

fn parse_structured(reply: &str) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(reply).ok()?;
    value
        .as_object()?
        .get(ITEMS_FIELD)?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

static RE_LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\-•*.]+\s*").unwrap());
static RE_WRAPPING_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^["']|["']$"#).unwrap());

fn parse_lines(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| {
            let line = RE_LIST_MARKER.replace(line.trim(), "");
            RE_WRAPPING_QUOTES.replace_all(&line, "").trim().to_string()
        })
        .filter(|line| line.chars().count() >= MIN_LINE_CHARS)
        .collect()
}

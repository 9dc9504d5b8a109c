//! The orchestrator: one request in, one image plus item list out.
//!
//! [`Restyler::run`] sequences the pipeline stages strictly one after the
//! other, because the listing step reads the edit step's output:
//!
//! 1. check the credential and validate the request
//! 2. normalise the image ([`crate::pipeline::normalize`])
//! 3. redecorate it ([`crate::pipeline::edit`]); any failure aborts
//! 4. list the furniture in the *edited* image ([`crate::pipeline::extract`]);
//!    any failure becomes an empty list
//! 5. assemble a [`TransformResult`]
//!
//! The `Restyler` holds no per-request state and is shared behind an `Arc`.

use crate::config::{RestyleConfig, API_KEY_ENV};
use crate::error::RestyleError;
use crate::output::{ItemList, TransformResult};
use crate::pipeline::edit::{ImageEditor, OpenAiImageEditor};
use crate::pipeline::extract::{ItemExtractor, OpenAiItemExtractor, ParsedItems};
use crate::pipeline::normalize::normalize;
use crate::progress::{NoopObserver, SharedObserver, Stage};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// JSON field carrying the image in inbound requests.
pub const IMAGE_FIELD: &str = "imageBase64";

/// Message returned when the image field is missing or unusable.
pub const MISSING_IMAGE_FIELD: &str = "Send the image as base64 in the imageBase64 field.";

/// One inbound transformation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Bare base64 or a data URI.
    pub image: String,
}

impl TransformRequest {
    /// Pull the request out of a decoded JSON body.
    ///
    /// `imageBase64` must be present and a non-empty string.
    pub fn from_json(body: &Value) -> Result<Self, RestyleError> {
        match body.get(IMAGE_FIELD).and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => Ok(Self {
                image: s.to_string(),
            }),
            _ => Err(RestyleError::Validation(MISSING_IMAGE_FIELD.to_string())),
        }
    }

    fn validate(&self) -> Result<(), RestyleError> {
        if self.image.trim().is_empty() {
            return Err(RestyleError::Validation(MISSING_IMAGE_FIELD.to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
struct Services {
    editor: Arc<dyn ImageEditor>,
    extractor: Arc<dyn ItemExtractor>,
}

/// The transformation entry point.
#[derive(Clone)]
pub struct Restyler {
    config: RestyleConfig,
    services: Option<Services>,
    observer: SharedObserver,
}

impl std::fmt::Debug for Restyler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Restyler")
            .field("config", &self.config)
            .field("configured", &self.services.is_some())
            .finish()
    }
}

impl Restyler {
    /// Build a restyler talking to the configured OpenAI-compatible endpoints.
    ///
    /// A missing credential is not an error here; every [`run`](Self::run)
    /// then fails with [`RestyleError::MissingCredential`].
    pub fn new(config: RestyleConfig) -> Result<Self, RestyleError> {
        let services = match config.api_key.clone() {
            Some(key) => {
                let client = reqwest::Client::builder()
                    .build()
                    .map_err(|e| RestyleError::Internal(format!("HTTP client: {e}")))?;
                Some(Services {
                    editor: Arc::new(OpenAiImageEditor::new(client.clone(), &config, key.clone())),
                    extractor: Arc::new(OpenAiItemExtractor::new(client, &config, key)),
                })
            }
            None => {
                warn!("{} is not set; transform requests will fail", API_KEY_ENV);
                None
            }
        };
        Ok(Self {
            config,
            services,
            observer: Arc::new(NoopObserver),
        })
    }

    /// Build a restyler around caller-supplied services.
    pub fn with_services(
        config: RestyleConfig,
        editor: Arc<dyn ImageEditor>,
        extractor: Arc<dyn ItemExtractor>,
    ) -> Self {
        Self {
            config,
            services: Some(Services { editor, extractor }),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach a stage observer.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &RestyleConfig {
        &self.config
    }

    /// Whether a credential is configured.
    pub fn is_configured(&self) -> bool {
        self.services.is_some()
    }

    /// Validate a decoded JSON body and run it.
    pub async fn run_json(&self, body: &Value) -> Result<TransformResult, RestyleError> {
        let mut stage = Stage::Start;
        self.advance(&mut stage, Stage::Validating);
        let checked = self
            .services()
            .and_then(|services| Ok((services, TransformRequest::from_json(body)?)));
        match checked {
            Ok((services, request)) => self.run_validated(stage, services, request).await,
            Err(e) => {
                self.advance(&mut stage, Stage::Aborted);
                Err(e)
            }
        }
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, request: TransformRequest) -> Result<TransformResult, RestyleError> {
        let mut stage = Stage::Start;
        self.advance(&mut stage, Stage::Validating);
        let checked = self
            .services()
            .and_then(|services| request.validate().map(|()| services));
        match checked {
            Ok(services) => self.run_validated(stage, services, request).await,
            Err(e) => {
                self.advance(&mut stage, Stage::Aborted);
                Err(e)
            }
        }
    }

    fn services(&self) -> Result<&Services, RestyleError> {
        self.services
            .as_ref()
            .ok_or_else(|| RestyleError::MissingCredential {
                variable: API_KEY_ENV.to_string(),
            })
    }

    async fn run_validated(
        &self,
        mut stage: Stage,
        services: &Services,
        request: TransformRequest,
    ) -> Result<TransformResult, RestyleError> {
        let start = Instant::now();
        let image = normalize(&request.image, &self.config.default_mime);
        info!(
            "Restyle started ({} chars of {} data)",
            image.payload().len(),
            image.mime_type().unwrap_or("untyped")
        );

        self.advance(&mut stage, Stage::EditingInFlight);
        let edited = match services.editor.edit(&image).await {
            Ok(edited) => edited,
            Err(e) => {
                self.advance(&mut stage, Stage::Aborted);
                warn!("Restyle aborted after {:?}: {}", start.elapsed(), e);
                return Err(e);
            }
        };

        self.advance(&mut stage, Stage::ExtractingInFlight);
        let items = self.list_items(services, &edited.image_base64).await;

        self.advance(&mut stage, Stage::Done);
        info!(
            "Restyle finished in {:?} with {} items",
            start.elapsed(),
            items.len()
        );

        Ok(TransformResult {
            image_base64: edited.image_base64,
            items,
        })
    }

    /// Best-effort listing; every failure is logged and becomes `[]`.
    async fn list_items(&self, services: &Services, edited_base64: &str) -> ItemList {
        match services.extractor.extract_items(edited_base64).await {
            Ok(ParsedItems::Empty) => {
                warn!("Item listing produced no usable lines; continuing without items");
                Vec::new()
            }
            Ok(parsed) => parsed.into_items(),
            Err(e) => {
                warn!("Item listing failed; continuing without items: {}", e);
                Vec::new()
            }
        }
    }

    fn advance(&self, stage: &mut Stage, next: Stage) {
        debug_assert!(
            stage.can_advance_to(next),
            "illegal stage transition {stage:?} → {next:?}"
        );
        debug!("stage: {} → {}", stage, next);
        *stage = next;
        self.observer.on_stage(next);
    }
}

//! Configuration types for the restyle pipeline.
//!
//! All behaviour is controlled through [`RestyleConfig`], built via its
//! [`RestyleConfigBuilder`] or read from the environment with
//! [`RestyleConfig::from_env`]. The config is constructed once at process
//! start and shared read-only by every request.

use crate::error::RestyleError;
use std::fmt;

/// Environment variable holding the service credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default image-edit endpoint.
pub const DEFAULT_EDIT_URL: &str = "https://api.openai.com/v1/images/edits";

/// Default chat-completions endpoint.
pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// MIME type assumed for bare base64 input.
pub const DEFAULT_MIME: &str = "image/png";

/// Configuration for a restyle run.
///
/// # Example
/// ```rust
/// use edgequake_restyle::RestyleConfig;
///
/// let config = RestyleConfig::builder()
///     .api_key("sk-test")
///     .edit_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.edit_timeout_secs, 90);
/// ```
#[derive(Clone)]
pub struct RestyleConfig {
    /// Bearer credential for both services. `None` makes every request fail
    /// with [`RestyleError::MissingCredential`].
    pub api_key: Option<String>,

    /// Image-edit endpoint URL.
    pub edit_url: String,

    /// Chat-completions endpoint URL used for the item listing.
    pub chat_url: String,

    /// Image-edit model. Default: `gpt-image-1.5`.
    pub edit_model: String,

    /// Vision chat model. Default: `gpt-4o`.
    pub chat_model: String,

    /// Output resolution requested from the edit service. Default: `1024x1024`.
    pub image_size: String,

    /// Quality tier requested from the edit service. Default: `high`.
    pub image_quality: String,

    /// Token budget for the listing reply. Default: 1024.
    pub chat_max_tokens: u32,

    /// MIME type used when the input carries no data-URI prefix.
    pub default_mime: String,

    /// Timeout for the edit call in seconds. Default: 120.
    pub edit_timeout_secs: u64,

    /// Timeout for the listing call in seconds. Default: 60.
    pub extract_timeout_secs: u64,
}

impl Default for RestyleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            edit_url: DEFAULT_EDIT_URL.to_string(),
            chat_url: DEFAULT_CHAT_URL.to_string(),
            edit_model: "gpt-image-1.5".to_string(),
            chat_model: "gpt-4o".to_string(),
            image_size: "1024x1024".to_string(),
            image_quality: "high".to_string(),
            chat_max_tokens: 1024,
            default_mime: DEFAULT_MIME.to_string(),
            edit_timeout_secs: 120,
            extract_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for RestyleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestyleConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("edit_url", &self.edit_url)
            .field("chat_url", &self.chat_url)
            .field("edit_model", &self.edit_model)
            .field("chat_model", &self.chat_model)
            .field("image_size", &self.image_size)
            .field("image_quality", &self.image_quality)
            .field("chat_max_tokens", &self.chat_max_tokens)
            .field("default_mime", &self.default_mime)
            .field("edit_timeout_secs", &self.edit_timeout_secs)
            .field("extract_timeout_secs", &self.extract_timeout_secs)
            .finish()
    }
}

impl RestyleConfig {
    /// Create a new builder for `RestyleConfig`.
    pub fn builder() -> RestyleConfigBuilder {
        RestyleConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from `OPENAI_API_KEY` and the `RESTYLE_*` variables.
    ///
    /// Unset variables keep their defaults. An empty credential counts as
    /// missing.
    pub fn from_env() -> Result<Self, RestyleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RestyleError> {
        let mut b = Self::builder();
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            b = b.api_key(key);
        }
        if let Some(v) = lookup("RESTYLE_EDIT_URL") {
            b = b.edit_url(v);
        }
        if let Some(v) = lookup("RESTYLE_CHAT_URL") {
            b = b.chat_url(v);
        }
        if let Some(v) = lookup("RESTYLE_EDIT_MODEL") {
            b = b.edit_model(v);
        }
        if let Some(v) = lookup("RESTYLE_CHAT_MODEL") {
            b = b.chat_model(v);
        }
        if let Some(v) = lookup("RESTYLE_DEFAULT_MIME") {
            b = b.default_mime(v);
        }
        if let Some(v) = lookup("RESTYLE_EDIT_TIMEOUT") {
            b = b.edit_timeout_secs(parse_secs("RESTYLE_EDIT_TIMEOUT", &v)?);
        }
        if let Some(v) = lookup("RESTYLE_EXTRACT_TIMEOUT") {
            b = b.extract_timeout_secs(parse_secs("RESTYLE_EXTRACT_TIMEOUT", &v)?);
        }
        b.build()
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64, RestyleError> {
    value.trim().parse().map_err(|_| {
        RestyleError::InvalidConfig(format!("{name} must be a number of seconds, got {value:?}"))
    })
}

/// Builder for [`RestyleConfig`].
#[derive(Debug)]
pub struct RestyleConfigBuilder {
    config: RestyleConfig,
}

impl RestyleConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn edit_url(mut self, url: impl Into<String>) -> Self {
        self.config.edit_url = url.into();
        self
    }

    pub fn chat_url(mut self, url: impl Into<String>) -> Self {
        self.config.chat_url = url.into();
        self
    }

    pub fn edit_model(mut self, model: impl Into<String>) -> Self {
        self.config.edit_model = model.into();
        self
    }

    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    pub fn image_size(mut self, size: impl Into<String>) -> Self {
        self.config.image_size = size.into();
        self
    }

    pub fn image_quality(mut self, quality: impl Into<String>) -> Self {
        self.config.image_quality = quality.into();
        self
    }

    pub fn chat_max_tokens(mut self, n: u32) -> Self {
        self.config.chat_max_tokens = n;
        self
    }

    pub fn default_mime(mut self, mime: impl Into<String>) -> Self {
        self.config.default_mime = mime.into();
        self
    }

    pub fn edit_timeout_secs(mut self, secs: u64) -> Self {
        self.config.edit_timeout_secs = secs;
        self
    }

    pub fn extract_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extract_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RestyleConfig, RestyleError> {
        let c = &self.config;
        for (name, url) in [("edit_url", &c.edit_url), ("chat_url", &c.chat_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RestyleError::InvalidConfig(format!(
                    "{name} must be an http(s) URL, got {url:?}"
                )));
            }
        }
        if c.edit_timeout_secs == 0 || c.extract_timeout_secs == 0 {
            return Err(RestyleError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if !c.default_mime.contains('/') {
            return Err(RestyleError::InvalidConfig(format!(
                "default_mime must look like type/subtype, got {:?}",
                c.default_mime
            )));
        }
        if c.chat_max_tokens == 0 {
            return Err(RestyleError::InvalidConfig(
                "chat_max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

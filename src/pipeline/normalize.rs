//! Image normalisation: arbitrary base64 / data-URI input → data URI.
//!
//! Both services accept images as data URIs embedded in the JSON body. The
//! caller may send either form; a declared `data:` prefix is trusted as-is
//! and bare base64 gets the configured default MIME type. The bytes are never
//! inspected, so malformed base64 only surfaces as an upstream error.

use std::fmt;

const DATA_SCHEME: &str = "data:";

/// A data URI ready to embed in a service request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage(String);

impl NormalizedImage {
    /// The full data URI.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base64 payload after the first comma.
    pub fn payload(&self) -> &str {
        self.0.split_once(',').map(|(_, p)| p).unwrap_or("")
    }

    /// The declared MIME type, if the URI carries one.
    pub fn mime_type(&self) -> Option<&str> {
        let header = self.0.strip_prefix(DATA_SCHEME)?.split(',').next()?;
        let mime = header.split(';').next()?;
        (!mime.is_empty()).then_some(mime)
    }
}

impl fmt::Display for NormalizedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalise `raw` into a data URI.
///
/// Never fails.
pub fn normalize(raw: &str, default_mime: &str) -> NormalizedImage {
    let s = raw.trim();
    if s.starts_with(DATA_SCHEME) {
        NormalizedImage(s.to_string())
    } else {
        NormalizedImage(format!("data:{default_mime};base64,{s}"))
    }
}

/// Strip a data-URI header, leaving bare base64.
pub fn strip_data_uri(raw: &str) -> &str {
    let s = raw.trim();
    if s.starts_with(DATA_SCHEME) {
        s.split_once(',').map(|(_, p)| p).unwrap_or("")
    } else {
        s
    }
}

//! Error types for the edgequake-restyle library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RestyleError`] — **Fatal**: the transformation cannot produce an
//!   image at all (no credential, malformed request, edit service refused or
//!   broke its contract). Returned as `Err(RestyleError)` from
//!   [`crate::transform::Restyler::run`] and rendered as an HTTP error.
//!
//! * [`ExtractionError`] — **Non-fatal**: the furniture listing failed but the
//!   edited image is fine. The orchestrator logs it and substitutes an empty
//!   item list; it never reaches the caller.

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-restyle library.
#[derive(Debug, Error)]
pub enum RestyleError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The service credential is not configured.
    #[error("{variable} is not configured. Set the {variable} environment variable.")]
    MissingCredential { variable: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Request errors ────────────────────────────────────────────────────
    /// The inbound request is malformed (missing or non-string image).
    #[error("{0}")]
    Validation(String),

    /// The HTTP body could not be read (over the size limit, aborted upload).
    #[error("{message}")]
    BodyRejected { status: u16, message: String },

    // ── Edit service errors ───────────────────────────────────────────────
    /// The edit service rejected the input (non-2xx below 500).
    #[error("OpenAI: {message}")]
    UpstreamClient { status: u16, message: String },

    /// The edit service failed internally (status ≥ 500).
    #[error("OpenAI: {message}")]
    UpstreamServer { status: u16, message: String },

    /// The edit service answered 2xx but without an image payload.
    #[error("{0}")]
    Protocol(String),

    /// The edit call did not complete within the configured timeout.
    #[error("Image edit timed out after {secs}s")]
    EditTimeout { secs: u64 },

    /// The edit call failed at the transport level.
    #[error("Image edit request failed: {0}")]
    EditRequestFailed(String),

    // ── Local file errors (CLI) ───────────────────────────────────────────
    /// Input image was not found at the given path.
    #[error("Image file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Could not read the input image.
    #[error("Failed to read image '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The edited image could not be decoded from base64.
    #[error("Edited image is not valid base64: {0}")]
    InvalidImagePayload(String),

    /// Could not create or write the output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("{0}")]
    Internal(String),
}

impl RestyleError {
    /// HTTP status used when this error is returned from the server.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestyleError::Validation(_) => StatusCode::BAD_REQUEST,
            RestyleError::UpstreamClient { .. } => StatusCode::BAD_REQUEST,
            RestyleError::UpstreamServer { .. } | RestyleError::Protocol(_) => {
                StatusCode::BAD_GATEWAY
            }
            RestyleError::EditTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RestyleError::BodyRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures caused by the edit service rather than by us or the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RestyleError::UpstreamClient { .. }
                | RestyleError::UpstreamServer { .. }
                | RestyleError::Protocol(_)
                | RestyleError::EditTimeout { .. }
                | RestyleError::EditRequestFailed(_)
        )
    }
}

/// A non-fatal error from the furniture-listing call.
///
/// Never returned to callers of [`crate::transform::Restyler::run`]; the
/// orchestrator replaces it with an empty item list.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// Transport-level failure (DNS, connection reset, TLS…).
    #[error("listing request failed: {0}")]
    RequestFailed(String),

    /// The call did not complete within the configured timeout.
    #[error("listing request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The chat service answered with a non-2xx status.
    #[error("listing service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The chat envelope itself could not be decoded.
    #[error("malformed listing response: {0}")]
    MalformedResponse(String),
}

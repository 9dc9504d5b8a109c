//! Result types returned by a successful restyle.

use crate::error::RestyleError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered furniture/decor descriptions. May be empty; never deduplicated.
pub type ItemList = Vec<String>;

/// The assembled response: edited image plus the (possibly empty) item list.
///
/// `image_base64` is always populated; an empty `items` is a normal outcome
/// when the listing step failed or found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    /// Bare base64, no data-URI prefix.
    pub image_base64: String,
    pub items: ItemList,
}

impl TransformResult {
    /// Decode the edited image.
    pub fn image_bytes(&self) -> Result<Vec<u8>, RestyleError> {
        STANDARD
            .decode(self.image_base64.as_bytes())
            .map_err(|e| RestyleError::InvalidImagePayload(e.to_string()))
    }

    /// Decode the edited image and write it to `path`.
    pub async fn write_image(&self, path: &Path) -> Result<usize, RestyleError> {
        let bytes = self.image_bytes()?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| RestyleError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(bytes.len())
    }
}

/// Error envelope sent to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

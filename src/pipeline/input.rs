//! Input resolution for the CLI: a local image file → [`TransformRequest`].
//!
//! The HTTP server receives base64 directly; the `transform` subcommand reads
//! a file instead. The MIME type is taken from the extension so the data URI
//! declares the right format, falling back to the configured default.

use crate::error::RestyleError;
use crate::transform::TransformRequest;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Guess an image MIME type from a file extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read `path` and wrap its bytes in a data-URI request.
pub async fn load_image(path: &Path, default_mime: &str) -> Result<TransformRequest, RestyleError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RestyleError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            RestyleError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let mime = mime_from_extension(path).unwrap_or(default_mime);
    debug!("Loaded {} ({} bytes, {})", path.display(), bytes.len(), mime);

    Ok(TransformRequest {
        image: format!("data:{mime};base64,{}", STANDARD.encode(&bytes)),
    })
}

/// Default output path: `<stem>.restyled.png` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{stem}.restyled.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_is_guessed_from_extension() {
        assert_eq!(mime_from_extension(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_from_extension(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("a.jpg")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(mime_from_extension(Path::new("a.heic")), None);
        assert_eq!(mime_from_extension(Path::new("noext")), None);
    }

    #[test]
    fn output_path_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("/tmp/sala.jpg")),
            PathBuf::from("/tmp/sala.restyled.png")
        );
    }

    #[tokio::test]
    async fn load_image_builds_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.jpg");
        std::fs::write(&path, b"ABC").unwrap();

        let req = load_image(&path, "image/png").await.unwrap();
        assert_eq!(req.image, "data:image/jpeg;base64,QUJD");
    }

    #[tokio::test]
    async fn unknown_extension_uses_default_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.bin");
        std::fs::write(&path, b"ABC").unwrap();

        let req = load_image(&path, "image/png").await.unwrap();
        assert!(req.image.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_image(Path::new("/definitely/not/here.png"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, RestyleError::FileNotFound { .. }));
    }
}

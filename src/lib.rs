//! # edgequake-restyle
//!
//! Redecorate a room photograph with an image-edit model, then list the
//! furniture and decor visible in the result with a vision chat model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! imageBase64
//!  │
//!  ├─ 1. Validate   credential present, imageBase64 is a non-empty string
//!  ├─ 2. Normalize  bare base64 / data URI → data URI
//!  ├─ 3. Edit       images/edits with a fixed "keep the room, swap the furniture" prompt
//!  ├─ 4. Extract    chat/completions on the EDITED image → {"itens": [...]}
//!  └─ 5. Assemble   { imageBase64, items }   (items = [] if step 4 failed)
//! ```
//!
//! Step 3 is a hard dependency: its failure aborts with a classified
//! [`RestyleError`]. Step 4 is best effort: its failure is logged and the
//! response carries an empty item list.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_restyle::{Restyler, RestyleConfig, TransformRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENAI_API_KEY and RESTYLE_* overrides
//!     let restyler = Restyler::new(RestyleConfig::from_env()?)?;
//!     let result = restyler
//!         .run(TransformRequest { image: std::fs::read_to_string("room.b64")? })
//!         .await?;
//!     for item in &result.items {
//!         println!("- {item}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `restyle` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;
pub mod transform;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{RestyleConfig, RestyleConfigBuilder};
pub use error::{ExtractionError, RestyleError};
pub use output::{ErrorResponse, ItemList, TransformResult};
pub use pipeline::edit::{EditOutcome, EditedImage, ImageEditor, OpenAiImageEditor};
pub use pipeline::extract::{parse_items, ItemExtractor, OpenAiItemExtractor, ParsedItems};
pub use pipeline::normalize::{normalize, NormalizedImage};
pub use progress::{NoopObserver, SharedObserver, Stage, StageObserver};
pub use transform::{Restyler, TransformRequest};

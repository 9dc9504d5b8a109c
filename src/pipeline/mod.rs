//! Pipeline stages for a room restyle.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! the others and the two network clients can be swapped for fakes.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ edit ──▶ extract
//! (data URI)   (image)   (items, best effort)
//! ```
//!
//! 1. [`normalize`] — turn bare base64 or a data URI into a data URI
//! 2. [`edit`]      — redecorate via the image-edit service; failures abort
//! 3. [`extract`]   — list furniture in the *edited* image; failures degrade
//!    to an empty list
//!
//! [`input`] is used by the CLI only, to turn a local file into a request.

pub mod edit;
pub mod extract;
pub mod input;
pub mod normalize;

//! Stage-observer trait for pipeline progress events.
//!
//! Inject an [`Arc<dyn StageObserver>`] via
//! [`crate::transform::Restyler::with_observer`] to be told when the pipeline
//! moves between stages. The CLI uses it to drive a spinner; the server
//! leaves the default no-op in place.
//!
//! # Example
//!
//! ```rust
//! use edgequake_restyle::{Stage, StageObserver};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder(Mutex<Vec<Stage>>);
//!
//! impl StageObserver for Recorder {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let observer: Arc<dyn StageObserver> = Arc::new(Recorder::default());
//! observer.on_stage(Stage::Validating);
//! ```

use std::fmt;
use std::sync::Arc;

/// Where a single run currently is.
///
/// ```text
/// Start → Validating → EditingInFlight → ExtractingInFlight → Done
///              │              │
///              └──────────────┴──▶ Aborted
/// ```
///
/// Only `Validating` and `EditingInFlight` can lead to `Aborted`;
/// `ExtractingInFlight` always reaches `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Validating,
    EditingInFlight,
    ExtractingInFlight,
    Done,
    Aborted,
}

impl Stage {
    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Start, Validating)
                | (Validating, EditingInFlight)
                | (Validating, Aborted)
                | (EditingInFlight, ExtractingInFlight)
                | (EditingInFlight, Aborted)
                | (ExtractingInFlight, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Aborted)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Start => "starting",
            Stage::Validating => "validating request",
            Stage::EditingInFlight => "redecorating room",
            Stage::ExtractingInFlight => "listing furniture",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Notified on every stage transition of a run.
///
/// Must be `Send + Sync`: one observer may be shared by concurrent requests.
pub trait StageObserver: Send + Sync {
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }
}

/// The default observer; ignores everything.
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Convenience alias for the type stored in [`crate::transform::Restyler`].
pub type SharedObserver = Arc<dyn StageObserver>;

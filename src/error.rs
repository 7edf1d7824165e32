//! Error taxonomy for the overlay pipeline.
//!
//! Only `ModelUnavailable` is allowed to end the process. Every other variant is
//! recovered per frame: the resolver falls back to a random palette color, the
//! pipeline falls back to the unannotated frame (video) or drops it (still).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// The inference engine was never initialized.
    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// One frame's inference call failed.
    #[error("inference failed: {0:#}")]
    InferenceFailure(#[source] anyhow::Error),

    /// A detection label has no entry in the known-label set.
    #[error("label '{label}' is not a known class label")]
    LabelNotFound { label: String },

    /// The drawing surface could not be created or finalized.
    #[error("render surface failure: {reason}")]
    RenderSurfaceFailure { reason: String },
}

impl OverlayError {
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
        }
    }

    /// True for the one condition that cannot be recovered per frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. })
    }
}

pub type OverlayResult<T> = std::result::Result<T, OverlayError>;

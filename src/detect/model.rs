use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::anyhow;
use image::RgbaImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::error::{OverlayError, OverlayResult};

/// Backend shared between the caller and the pipeline worker.
///
/// Wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
pub type SharedBackend = Arc<Mutex<dyn DetectorBackend>>;

/// Outcome of model initialization.
///
/// Pipelines hold this instead of a bare backend and check it on every call,
/// so a missing model surfaces as `ModelUnavailable` rather than a crash.
#[derive(Clone)]
pub enum ModelInit {
    Ready(SharedBackend),
    Unavailable { reason: String },
}

impl ModelInit {
    pub fn ready<B: DetectorBackend + 'static>(backend: B) -> Self {
        Self::Ready(Arc::new(Mutex::new(backend)))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn backend(&self) -> OverlayResult<SharedBackend> {
        match self {
            Self::Ready(backend) => Ok(backend.clone()),
            Self::Unavailable { reason } => Err(OverlayError::model_unavailable(reason.clone())),
        }
    }
}

impl std::fmt::Debug for ModelInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("ModelInit::Ready"),
            Self::Unavailable { reason } => write!(f, "ModelInit::Unavailable({reason})"),
        }
    }
}

/// Run one inference call, mapping every failure to `InferenceFailure`.
pub(crate) fn run_inference(
    backend: &SharedBackend,
    image: &RgbaImage,
) -> OverlayResult<Vec<RawDetection>> {
    let start = Instant::now();
    let mut guard = backend
        .lock()
        .map_err(|_| OverlayError::InferenceFailure(anyhow!("backend lock poisoned")))?;
    let detections = guard
        .detect(image)
        .map_err(OverlayError::InferenceFailure)?;
    log::debug!(
        "{}: {} detections in {:?}",
        guard.name(),
        detections.len(),
        start.elapsed()
    );
    Ok(detections)
}

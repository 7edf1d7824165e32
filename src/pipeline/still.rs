use image::RgbaImage;

use super::annotate_once;
use crate::detect::ModelInit;
use crate::error::{OverlayError, OverlayResult};
use crate::render::OverlayRenderer;
use crate::resolve::DetectionResolver;

/// Single-image pipeline.
pub struct StillPipeline {
    model: ModelInit,
    resolver: DetectionResolver,
    renderer: OverlayRenderer,
}

impl StillPipeline {
    pub fn new(model: ModelInit, resolver: DetectionResolver, renderer: OverlayRenderer) -> Self {
        Self {
            model,
            resolver,
            renderer,
        }
    }

    /// Annotate one image.
    ///
    /// `Ok(None)` means the frame was dropped: inference or the render surface
    /// failed and the failure was logged. `Err` is only `ModelUnavailable`.
    pub fn annotate(&mut self, image: &RgbaImage) -> OverlayResult<Option<RgbaImage>> {
        let backend = self.model.backend()?;
        match annotate_once(&backend, &mut self.resolver, &self.renderer, image) {
            Ok(annotated) => {
                log::info!(
                    "annotated {}x{} image with {} detections",
                    image.width(),
                    image.height(),
                    annotated.detections
                );
                Ok(Some(annotated.image))
            }
            Err(e @ OverlayError::InferenceFailure(_)) => {
                log::warn!("dropping image: {}", e);
                Ok(None)
            }
            Err(e @ OverlayError::RenderSurfaceFailure { .. }) => {
                log::error!("dropping image: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

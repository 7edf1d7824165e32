//! Frame pipeline orchestration.
//!
//! Per inference result: run the detector, resolve detections, render the
//! overlay. `StillPipeline` does this once per call on the caller's thread.
//! `VideoPipeline` does it on a background worker, one frame at a time, and
//! hands each result to the presentation side as a `PresentedFrame` message.

mod still;
mod video;

use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

use crate::detect::{run_inference, SharedBackend};
use crate::error::OverlayResult;
use crate::geometry::ImageSize;
use crate::render::OverlayRenderer;
use crate::resolve::DetectionResolver;

pub use still::StillPipeline;
pub use video::{PresentedFrame, SubmitError, VideoPipeline};

/// Count of video frames processed.
///
/// Written by the pipeline worker only; readable from any thread.
#[derive(Debug, Default)]
pub struct FrameCounter(AtomicU64);

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Bump the counter and return the new value.
    pub(crate) fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Output of one successful pass.
pub(crate) struct Annotated {
    pub image: RgbaImage,
    pub detections: usize,
}

/// Inference, resolution and rendering for one image.
pub(crate) fn annotate_once(
    backend: &SharedBackend,
    resolver: &mut DetectionResolver,
    renderer: &OverlayRenderer,
    image: &RgbaImage,
) -> OverlayResult<Annotated> {
    let raw = run_inference(backend, image)?;
    let detections = resolver.resolve_all(&raw, ImageSize::of(image));
    let image = renderer.render(image, &detections)?;
    Ok(Annotated {
        image,
        detections: detections.len(),
    })
}

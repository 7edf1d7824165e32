use anyhow::Result;
use image::RgbaImage;

use crate::detect::result::RawDetection;

/// Detector backend trait.
///
/// A backend turns one image of arbitrary size into a list of raw detections.
/// Boxes are normalized with a bottom-left origin; labels are the backend's
/// top-ranked class name, if it classifies at all.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one image.
    ///
    /// The image is borrowed for the call only.
    fn detect(&mut self, image: &RgbaImage) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook, run once when the model is initialized.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

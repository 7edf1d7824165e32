//! Frames and image loading.

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};

/// One image submitted to a pipeline.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbaImage,
    /// Monotonic submission instant, for latency logging only.
    pub submitted_at: Instant,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            submitted_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode an image file and rotate/flip it upright per its EXIF orientation.
///
/// Photos taken on phones are often stored sideways with an orientation tag;
/// the detector must see them the way a viewer displays them.
pub fn load_upright(path: &Path) -> Result<RgbaImage> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to read image {}", path.display()))?;
    let mut decoder = reader
        .into_decoder()
        .with_context(|| format!("unsupported image format {}", path.display()))?;
    let orientation = decoder
        .orientation()
        .with_context(|| format!("failed to read orientation of {}", path.display()))?;
    let mut image = DynamicImage::from_decoder(decoder)
        .with_context(|| format!("failed to decode image {}", path.display()))?;
    image.apply_orientation(orientation);

    let image = image.into_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(anyhow!("image {} has no pixels", path.display()));
    }
    Ok(image)
}

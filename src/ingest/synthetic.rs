//! Synthetic frame source: `stub://WIDTHxHEIGHT/COUNT`.

use anyhow::{anyhow, Context, Result};
use image::{Rgba, RgbaImage};

use super::FrameSource;
use crate::frame::Frame;

pub const SCHEME: &str = "stub://";

/// Generates `count` frames of a gradient that shifts each frame.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    count: u64,
    produced: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, count: u64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("synthetic frames must be at least 1x1"));
        }
        Ok(Self {
            width,
            height,
            count,
            produced: 0,
        })
    }

    pub fn parse(spec: &str) -> Result<Self> {
        let rest = spec
            .strip_prefix(SCHEME)
            .ok_or_else(|| anyhow!("synthetic source must start with {}", SCHEME))?;
        let (dims, count) = rest
            .split_once('/')
            .ok_or_else(|| anyhow!("expected {}WIDTHxHEIGHT/COUNT, got '{}'", SCHEME, spec))?;
        let (width, height) = dims
            .split_once('x')
            .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got '{}'", dims))?;
        Self::new(
            width.parse().context("invalid synthetic width")?,
            height.parse().context("invalid synthetic height")?,
            count.parse().context("invalid synthetic frame count")?,
        )
    }

    fn render(&self, index: u64) -> RgbaImage {
        let shift = (index % 256) as u32;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba([
                ((x + shift) % 256) as u8,
                ((y + shift) % 256) as u8,
                (shift * 3 % 256) as u8,
                255,
            ])
        })
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.produced >= self.count {
            return Ok(None);
        }
        let image = self.render(self.produced);
        self.produced += 1;
        Ok(Some(Frame::new(image)))
    }

    fn describe(&self) -> String {
        format!(
            "{}{}x{}/{}",
            SCHEME, self.width, self.height, self.count
        )
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;
use serde::Deserialize;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;

/// Stub backend for demos and tests.
///
/// Replays a script of per-frame detections, one entry per call, wrapping
/// around at the end. An empty script detects nothing.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    script: Vec<Vec<RawDetection>>,
    cursor: usize,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    frames: Vec<Vec<RawDetection>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(script: Vec<Vec<RawDetection>>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Same detections for every frame.
    pub fn repeating(detections: Vec<RawDetection>) -> Self {
        Self::scripted(vec![detections])
    }

    /// Load a script from a JSON fixture: `{"frames": [[{"box": ..., ...}], ...]}`.
    pub fn from_fixture(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detection fixture {}", path.display()))?;
        let fixture: FixtureFile = serde_json::from_str(&raw)
            .with_context(|| format!("invalid detection fixture {}", path.display()))?;
        Ok(Self::scripted(fixture.frames))
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _image: &RgbaImage) -> Result<Vec<RawDetection>> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let detections = self.script[self.cursor % self.script.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);
        Ok(detections)
    }
}

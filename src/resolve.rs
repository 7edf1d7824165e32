//! Detection resolution: raw detector output to render-ready records.
//!
//! Color policy: a known label always gets its palette entry. An absent label,
//! or one missing from the known-label set, gets a uniformly random palette
//! entry. Known labels are never colored at random.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::detect::RawDetection;
use crate::error::{OverlayError, OverlayResult};
use crate::geometry::{to_pixel_box, ImageSize, PixelBox};
use crate::labels::{Color, ColorPalette, LabelSet};

/// A resolved detection, ready to draw. Lives for one rendering pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub pixel_box: PixelBox,
    pub confidence: f32,
    pub label: Option<String>,
    pub color: Color,
}

pub struct DetectionResolver {
    labels: Arc<LabelSet>,
    palette: Arc<ColorPalette>,
    rng: StdRng,
}

impl DetectionResolver {
    pub fn new(labels: Arc<LabelSet>, palette: Arc<ColorPalette>) -> Result<Self> {
        Self::with_rng(labels, palette, StdRng::from_entropy())
    }

    /// Resolver with a caller-supplied generator for the random fallback.
    pub fn with_rng(labels: Arc<LabelSet>, palette: Arc<ColorPalette>, rng: StdRng) -> Result<Self> {
        if palette.len() != labels.len() {
            return Err(anyhow!(
                "palette has {} colors but there are {} labels",
                palette.len(),
                labels.len()
            ));
        }
        Ok(Self {
            labels,
            palette,
            rng,
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// Strict lookup of a label's palette color.
    pub fn lookup_color(&self, label: &str) -> OverlayResult<Color> {
        self.labels
            .index_of(label)
            .and_then(|index| self.palette.get(index))
            .ok_or_else(|| OverlayError::LabelNotFound {
                label: label.to_string(),
            })
    }

    fn random_color(&mut self) -> Color {
        let index = self.palette.random_index(&mut self.rng);
        // random_index is always in range of a non-empty palette
        self.palette.get(index).unwrap_or(Color::RED)
    }

    fn resolve_color(&mut self, label: Option<&str>) -> Color {
        let Some(label) = label else {
            return self.random_color();
        };
        match self.lookup_color(label) {
            Ok(color) => color,
            Err(e) => {
                log::warn!("{}; using a random palette color", e);
                self.random_color()
            }
        }
    }

    pub fn resolve(&mut self, raw: &RawDetection, size: ImageSize) -> Detection {
        Detection {
            pixel_box: to_pixel_box(&raw.normalized_box, size),
            confidence: raw.confidence,
            label: raw.label.clone(),
            color: self.resolve_color(raw.label.as_deref()),
        }
    }

    pub fn resolve_all(&mut self, raws: &[RawDetection], size: ImageSize) -> Vec<Detection> {
        raws.iter().map(|raw| self.resolve(raw, size)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedBox;
    use proptest::prelude::*;

    fn resolver(seed: u64) -> DetectionResolver {
        let labels = Arc::new(LabelSet::coco());
        let palette = Arc::new(ColorPalette::generate(labels.len(), 7).unwrap());
        DetectionResolver::with_rng(labels, palette, StdRng::seed_from_u64(seed)).unwrap()
    }

    fn raw(label: Option<&str>) -> RawDetection {
        RawDetection::new(NormalizedBox::new(0.1, 0.2, 0.3, 0.4), 0.82, label)
    }

    #[test]
    fn known_labels_map_to_their_palette_entry() {
        let mut resolver = resolver(1);
        let names = ["person", "cat", "dog", "toothbrush"];
        let raws: Vec<RawDetection> = names.iter().map(|n| raw(Some(n))).collect();
        let detections = resolver.resolve_all(&raws, ImageSize::new(1280, 720));

        assert_eq!(detections.len(), names.len());
        for (detection, name) in detections.iter().zip(names) {
            let index = resolver.labels().index_of(name).unwrap();
            assert_eq!(detection.color, resolver.palette().get(index).unwrap());
            assert_eq!(detection.label.as_deref(), Some(name));
        }
    }

    #[test]
    fn known_label_color_does_not_depend_on_rng() {
        let a = resolver(1).resolve(&raw(Some("cat")), ImageSize::new(10, 10));
        let b = resolver(999).resolve(&raw(Some("cat")), ImageSize::new(10, 10));
        assert_eq!(a.color, b.color);
    }

    #[test]
    fn strict_lookup_reports_unknown_label() {
        let resolver = resolver(1);
        match resolver.lookup_color("unicorn") {
            Err(OverlayError::LabelNotFound { label }) => assert_eq!(label, "unicorn"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_label_falls_back_and_is_kept() {
        let mut resolver = resolver(3);
        let detection = resolver.resolve(&raw(Some("unicorn")), ImageSize::new(100, 100));
        assert_eq!(detection.label.as_deref(), Some("unicorn"));
        let palette: Vec<Color> = (0..80).filter_map(|i| resolver.palette().get(i)).collect();
        assert!(palette.contains(&detection.color));
    }

    #[test]
    fn copies_box_and_confidence() {
        let mut resolver = resolver(1);
        let detection = resolver.resolve(&raw(None), ImageSize::new(1280, 720));
        assert_eq!(detection.confidence, 0.82);
        assert_eq!(detection.label, None);
        assert!((detection.pixel_box.x - 128.0).abs() < 1e-9);
        assert!((detection.pixel_box.y - 288.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_palette_of_wrong_length() {
        let labels = Arc::new(LabelSet::new(["cat", "dog"]).unwrap());
        let palette = Arc::new(ColorPalette::generate(3, 0).unwrap());
        assert!(DetectionResolver::new(labels, palette).is_err());
    }

    proptest! {
        #[test]
        fn unlabeled_detections_draw_from_palette(seed in any::<u64>(), len in 1usize..16) {
            let labels: Vec<String> = (0..len).map(|i| format!("class{i}")).collect();
            let labels = Arc::new(LabelSet::new(labels).unwrap());
            // distinct colors so membership identifies an index
            let colors = (0..len).map(|i| Color::new(i as u8, 0, 0)).collect();
            let palette = Arc::new(ColorPalette::from_colors(colors).unwrap());
            let mut resolver =
                DetectionResolver::with_rng(labels, palette, StdRng::seed_from_u64(seed)).unwrap();

            for _ in 0..32 {
                let detection = resolver.resolve(&raw(None), ImageSize::new(64, 64));
                prop_assert!((detection.color.r as usize) < len);
                prop_assert_eq!(detection.color.g, 0);
            }
        }
    }
}

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::detect::{BackendRegistry, ModelInit, StubBackend};
use crate::labels::{Color, ColorPalette, LabelSet};
use crate::render::{
    OverlayRenderer, RenderStyle, StrokeMode, DEFAULT_FONT_SCALE_RATIO, DEFAULT_STROKE_WIDTH,
    DEFAULT_TEXT_OFFSET_RATIO,
};
use crate::resolve::DetectionResolver;

const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_PALETTE_SEED: u64 = 0;

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    labels: Option<LabelsConfigFile>,
    palette: Option<PaletteConfigFile>,
    render: Option<RenderConfigFile>,
    backend: Option<BackendConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct LabelsConfigFile {
    path: Option<PathBuf>,
    names: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct PaletteConfigFile {
    seed: Option<u64>,
    colors: Option<Vec<Color>>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    stroke_width: Option<f64>,
    text_offset_ratio: Option<f64>,
    font_scale_ratio: Option<f64>,
    stroke_mode: Option<StrokeModeName>,
    fixed_color: Option<Color>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum StrokeModeName {
    PerLabel,
    Fixed,
}

#[derive(Debug, Deserialize, Default)]
struct BackendConfigFile {
    name: Option<String>,
    fixture_path: Option<PathBuf>,
}

/// Process-wide overlay configuration. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub labels: Arc<LabelSet>,
    pub palette: Arc<ColorPalette>,
    pub render: RenderStyle,
    pub font_path: Option<PathBuf>,
    pub backend: BackendSettings,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub name: String,
    pub fixture_path: Option<PathBuf>,
}

impl OverlayConfig {
    /// Load from the file named by `OVERLAY_CONFIG` (if any), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OVERLAY_CONFIG").ok();
        let mut file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => read_config_file(Path::new(path))?,
            _ => OverlayConfigFile::default(),
        };
        apply_env(&mut file_cfg)?;
        Self::from_file(file_cfg)
    }

    /// Defaults only: COCO labels, seeded palette, stub backend.
    pub fn defaults() -> Result<Self> {
        Self::from_file(OverlayConfigFile::default())
    }

    fn from_file(file: OverlayConfigFile) -> Result<Self> {
        let labels_cfg = file.labels.unwrap_or_default();
        let labels = match (labels_cfg.path, labels_cfg.names) {
            (Some(_), Some(_)) => {
                return Err(anyhow!("labels.path and labels.names are mutually exclusive"))
            }
            (Some(path), None) => LabelSet::from_file(&path)?,
            (None, Some(names)) => LabelSet::new(names)?,
            (None, None) => LabelSet::coco(),
        };

        let palette_cfg = file.palette.unwrap_or_default();
        let palette = ColorPalette::for_labels(
            &labels,
            palette_cfg.colors,
            palette_cfg.seed.unwrap_or(DEFAULT_PALETTE_SEED),
        )?;

        let render_cfg = file.render.unwrap_or_default();
        let stroke_mode = match render_cfg.stroke_mode.unwrap_or(StrokeModeName::PerLabel) {
            StrokeModeName::PerLabel => StrokeMode::PerLabel,
            StrokeModeName::Fixed => StrokeMode::Fixed(render_cfg.fixed_color.unwrap_or(Color::RED)),
        };
        let render = RenderStyle {
            stroke_width: render_cfg.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
            text_offset_ratio: render_cfg
                .text_offset_ratio
                .unwrap_or(DEFAULT_TEXT_OFFSET_RATIO),
            font_scale_ratio: render_cfg
                .font_scale_ratio
                .unwrap_or(DEFAULT_FONT_SCALE_RATIO),
            stroke_mode,
        };

        let backend_cfg = file.backend.unwrap_or_default();
        let backend = BackendSettings {
            name: backend_cfg
                .name
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            fixture_path: backend_cfg.fixture_path,
        };

        let cfg = Self {
            labels: Arc::new(labels),
            palette: Arc::new(palette),
            render,
            font_path: render_cfg.font_path,
            backend,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let style = &self.render;
        if !(style.stroke_width.is_finite() && style.stroke_width > 0.0) {
            return Err(anyhow!("render.stroke_width must be a positive number"));
        }
        if !(style.text_offset_ratio.is_finite() && style.text_offset_ratio > 0.0) {
            return Err(anyhow!("render.text_offset_ratio must be a positive number"));
        }
        if !(style.font_scale_ratio.is_finite() && style.font_scale_ratio > 0.0) {
            return Err(anyhow!("render.font_scale_ratio must be a positive number"));
        }
        if self.backend.name.trim().is_empty() {
            return Err(anyhow!("backend.name must not be empty"));
        }
        Ok(())
    }

    /// Register the configured backends and initialize the selected one.
    ///
    /// A backend that cannot be built is reported through `ModelInit` so the
    /// failure surfaces on first use of the pipeline.
    pub fn initialize_model(&self) -> ModelInit {
        let mut registry = BackendRegistry::new();
        let stub = match &self.backend.fixture_path {
            Some(path) => match StubBackend::from_fixture(path) {
                Ok(stub) => stub,
                Err(e) => {
                    log::error!("failed to load detection fixture: {:#}", e);
                    return ModelInit::unavailable(format!("{:#}", e));
                }
            },
            None => StubBackend::new(),
        };
        registry.register(stub);
        log::debug!("registered detector backends: {:?}", registry.list());
        if let Err(e) = registry.set_default(&self.backend.name) {
            log::error!("{:#}", e);
            return ModelInit::unavailable(format!("{:#}", e));
        }
        registry.initialize(None)
    }

    pub fn build_resolver(&self) -> Result<DetectionResolver> {
        DetectionResolver::new(self.labels.clone(), self.palette.clone())
    }

    pub fn build_renderer(&self) -> Result<OverlayRenderer> {
        match &self.font_path {
            Some(path) => OverlayRenderer::with_font_file(self.render.clone(), path),
            None => OverlayRenderer::new(self.render.clone()),
        }
    }
}

fn apply_env(file: &mut OverlayConfigFile) -> Result<()> {
    if let Ok(name) = std::env::var("OVERLAY_BACKEND") {
        if !name.trim().is_empty() {
            file.backend.get_or_insert_with(Default::default).name = Some(name);
        }
    }
    if let Ok(path) = std::env::var("OVERLAY_FIXTURE_PATH") {
        if !path.trim().is_empty() {
            file.backend.get_or_insert_with(Default::default).fixture_path =
                Some(PathBuf::from(path));
        }
    }
    if let Ok(path) = std::env::var("OVERLAY_LABELS_PATH") {
        if !path.trim().is_empty() {
            let labels = file.labels.get_or_insert_with(Default::default);
            labels.path = Some(PathBuf::from(path));
            labels.names = None;
        }
    }
    if let Ok(width) = std::env::var("OVERLAY_STROKE_WIDTH") {
        let width: f64 = width
            .trim()
            .parse()
            .map_err(|_| anyhow!("OVERLAY_STROKE_WIDTH must be a number of pixels"))?;
        file.render.get_or_insert_with(Default::default).stroke_width = Some(width);
    }
    if let Ok(seed) = std::env::var("OVERLAY_PALETTE_SEED") {
        let seed: u64 = seed
            .trim()
            .parse()
            .map_err(|_| anyhow!("OVERLAY_PALETTE_SEED must be an unsigned integer"))?;
        file.palette.get_or_insert_with(Default::default).seed = Some(seed);
    }
    if let Ok(path) = std::env::var("OVERLAY_FONT_PATH") {
        if !path.trim().is_empty() {
            file.render.get_or_insert_with(Default::default).font_path = Some(PathBuf::from(path));
        }
    }
    Ok(())
}

/// JSON by default; TOML when the file has a `.toml` extension.
fn read_config_file(path: &Path) -> Result<OverlayConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_coco_labels_and_wide_strokes() {
        let cfg = OverlayConfig::defaults().unwrap();
        assert_eq!(cfg.labels.len(), 80);
        assert_eq!(cfg.palette.len(), 80);
        assert_eq!(cfg.render.stroke_width, 9.0);
        assert_eq!(cfg.render.stroke_mode, StrokeMode::PerLabel);
        assert_eq!(cfg.backend.name, "stub");
        assert!(cfg.initialize_model().is_ready());
    }

    #[test]
    fn fixed_mode_defaults_to_red() {
        let file: OverlayConfigFile =
            serde_json::from_str(r#"{"render": {"stroke_mode": "fixed"}}"#).unwrap();
        let cfg = OverlayConfig::from_file(file).unwrap();
        assert_eq!(cfg.render.stroke_mode, StrokeMode::Fixed(Color::RED));
    }

    #[test]
    fn rejects_invalid_render_settings() {
        for json in [
            r#"{"render": {"stroke_width": 0}}"#,
            r#"{"render": {"font_scale_ratio": -0.1}}"#,
            r#"{"backend": {"name": " "}}"#,
            r#"{"labels": {"names": ["cat"], "path": "labels.txt"}}"#,
            r#"{"labels": {"names": ["cat", "dog"]}, "palette": {"colors": [[1, 2, 3]]}}"#,
        ] {
            let file: OverlayConfigFile = serde_json::from_str(json).unwrap();
            assert!(OverlayConfig::from_file(file).is_err(), "accepted {}", json);
        }
    }

    #[test]
    fn unknown_backend_yields_unavailable_model() {
        let file: OverlayConfigFile =
            serde_json::from_str(r#"{"backend": {"name": "coreml"}}"#).unwrap();
        let cfg = OverlayConfig::from_file(file).unwrap();
        assert!(!cfg.initialize_model().is_ready());
    }

    #[test]
    fn missing_fixture_yields_unavailable_model() {
        let file: OverlayConfigFile = serde_json::from_str(
            r#"{"backend": {"fixture_path": "/definitely/not/here.json"}}"#,
        )
        .unwrap();
        let cfg = OverlayConfig::from_file(file).unwrap();
        assert!(!cfg.initialize_model().is_ready());
    }
}

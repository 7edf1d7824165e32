//! Detection overlays.
//!
//! Turns object-detector output into annotated images: every detection becomes
//! a colored rectangle plus a `"<label> : <percent>"` caption drawn over the
//! source frame.
//!
//! # Module Structure
//!
//! - `geometry`: normalized (bottom-left origin) to pixel (top-left origin) boxes
//! - `labels`: known-label set and the per-label color palette
//! - `detect`: inference collaborator contract and backends
//! - `resolve`: raw detections to render-ready `Detection`s
//! - `render`: overlay planning and rasterization
//! - `pipeline`: still and video orchestration
//! - `frame`, `ingest`: frames and where they come from
//! - `config`: file + environment configuration
//!
//! Only `OverlayError::ModelUnavailable` is fatal. Every other failure is
//! recovered per frame.

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod labels;
pub mod pipeline;
pub mod render;
pub mod resolve;

pub use config::{BackendSettings, OverlayConfig};
pub use detect::{BackendRegistry, DetectorBackend, ModelInit, RawDetection, StubBackend};
pub use error::{OverlayError, OverlayResult};
pub use frame::{load_upright, Frame};
pub use geometry::{to_pixel_box, ImageSize, NormalizedBox, PixelBox};
pub use ingest::{open_source, DirectorySource, FrameSource, SyntheticSource};
pub use labels::{Color, ColorPalette, LabelSet, COCO_LABELS};
pub use pipeline::{FrameCounter, PresentedFrame, StillPipeline, SubmitError, VideoPipeline};
pub use render::{caption_text, OverlayPlan, OverlayRenderer, RenderStyle, StrokeMode};
pub use resolve::{Detection, DetectionResolver};

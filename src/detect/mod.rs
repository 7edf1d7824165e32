//! Inference collaborator contract.
//!
//! The detector itself (model format, thresholds, non-max suppression) lives
//! behind `DetectorBackend`. This crate only consumes what a backend returns.

mod backend;
mod backends;
mod model;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
pub use model::{ModelInit, SharedBackend};
pub use registry::BackendRegistry;
pub use result::RawDetection;

pub(crate) use model::run_inference;

//! Frame sources for video mode.
//!
//! - Directory of still images, read in file-name order
//! - Synthetic `stub://WxH/N` source (testing, demos)
//!
//! Sources only decode frames. Pacing and dropping are up to the caller.

pub mod file;
pub mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

pub use file::DirectorySource;
pub use synthetic::SyntheticSource;

/// Anything that yields frames in order until exhausted.
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Open `stub://...` as a synthetic source, anything else as a directory.
pub fn open_source(spec: &str) -> Result<Box<dyn FrameSource>> {
    if spec.starts_with(synthetic::SCHEME) {
        Ok(Box::new(SyntheticSource::parse(spec)?))
    } else {
        Ok(Box::new(DirectorySource::open(spec)?))
    }
}

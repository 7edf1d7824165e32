//! Image-directory frame source.
//!
//! Every file with a supported image extension is one frame. Frames are
//! ordered by file name, so `frame_0001.png`-style numbering plays in order.
//! A file that does not decode is skipped with a warning.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::FrameSource;
use crate::frame::{load_upright, Frame};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub struct DirectorySource {
    root: PathBuf,
    paths: Vec<PathBuf>,
    next: usize,
}

impl DirectorySource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if root.as_os_str().is_empty() || root.to_string_lossy().contains("://") {
            return Err(anyhow!(
                "frame source '{}' must be a local directory",
                root.display()
            ));
        }
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&root)
            .with_context(|| format!("failed to list frame directory {}", root.display()))?
        {
            let path = entry?.path();
            if path.is_file() && is_image_path(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        log::info!(
            "DirectorySource: {} frames in {}",
            paths.len(),
            root.display()
        );
        Ok(Self {
            root,
            paths,
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for DirectorySource {
    /// Files that fail to decode are logged and skipped.
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        while let Some(path) = self.paths.get(self.next) {
            self.next += 1;
            match load_upright(path) {
                Ok(image) => return Ok(Some(Frame::new(image))),
                Err(e) => log::warn!("skipping frame {}: {:#}", path.display(), e),
            }
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn yields_images_in_name_order_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("b.png", 2u8), ("a.png", 1), ("c.PNG", 3)] {
            RgbaImage::from_pixel(2, 2, Rgba([shade, 0, 0, 255]))
                .save_with_format(dir.path().join(name), image::ImageFormat::Png)
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectorySource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 3);
        let shades: Vec<u8> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|frame| frame.image.get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![1, 2, 3]);
    }

    #[test]
    fn undecodable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("a1.png", 1u8), ("a2.png", 2), ("a5.png", 5)] {
            RgbaImage::from_pixel(2, 2, Rgba([shade, 0, 0, 255]))
                .save_with_format(dir.path().join(name), image::ImageFormat::Png)
                .unwrap();
        }
        std::fs::write(dir.path().join("a3.png"), b"garbage").unwrap();
        std::fs::write(dir.path().join("a4.jpg"), b"").unwrap();

        let mut source = DirectorySource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 5);
        let shades: Vec<u8> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|frame| frame.image.get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![1, 2, 5]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn rejects_urls_and_missing_directories() {
        assert!(DirectorySource::open("rtsp://camera").is_err());
        assert!(DirectorySource::open("/definitely/not/here").is_err());
    }
}

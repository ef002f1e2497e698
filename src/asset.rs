//! Video asset descriptors.
//!
//! A [`VideoAsset`] is created once per playable file during the library
//! scan and is read-only afterwards. Segments borrow it through an
//! [`Arc`](std::sync::Arc) so the producer thread can reach the path without
//! copying the whole library.

use std::path::{Path, PathBuf};

/// Stream-level facts extracted by an [`AssetProber`](crate::AssetProber).
#[derive(Debug, Clone, PartialEq)]
pub struct AssetInfo {
    /// Container duration in whole seconds (truncated).
    pub duration_secs: u64,
    /// Average frame rate of the best video stream.
    pub native_fps: f64,
    /// Decoded frame width in pixels.
    pub width: u32,
    /// Decoded frame height in pixels.
    pub height: u32,
}

/// A playable video file.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoAsset {
    path: PathBuf,
    duration_secs: u64,
    native_fps: f64,
    frame_size: (u32, u32),
    file_size_bytes: u64,
}

impl VideoAsset {
    /// An asset at `path` with probed `info`.
    pub fn new(path: impl Into<PathBuf>, info: AssetInfo, file_size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            duration_secs: info.duration_secs,
            native_fps: info.native_fps,
            frame_size: (info.width, info.height),
            file_size_bytes,
        }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration in whole seconds.
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Frame rate the file was encoded at.
    pub fn native_fps(&self) -> f64 {
        self.native_fps
    }

    /// `(width, height)` of decoded frames.
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    /// Size on disk when the library was scanned.
    pub fn file_size_bytes(&self) -> u64 {
        self.file_size_bytes
    }

    /// File size in mebibytes, as shown in the overlay.
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Final path component, or the whole path if it has none.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

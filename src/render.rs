//! Display seam.
//!
//! The pacer hands each frame to a [`Renderer`] together with the letterboxed
//! target rectangle, then describes the overlay with an [`OverlayInfo`].
//! Renderers are expected to return quickly; anything slow (uploads,
//! presentation) belongs on the display's own thread.

use std::time::Duration;

use crate::source::Frame;

/// Top-left anchor of each overlay line, in window coordinates.
pub const OVERLAY_LINE_ORIGINS: [(i32, i32); 4] = [(10, 10), (10, 40), (10, 70), (10, 100)];

/// Receives frames and overlay text from the pacer.
pub trait Renderer {
    /// Draw `frame` scaled to `target_size` with its top-left at `position`.
    fn render(&mut self, frame: Frame, target_size: (u32, u32), position: (i32, i32));

    /// Draw the text overlay for the frame just rendered.
    fn overlay(&mut self, info: &OverlayInfo);

    /// The window changed size.
    fn resize(&mut self, width: u32, height: u32);

    /// Show everything drawn since the last call.
    fn present(&mut self) {}
}

/// Per-frame overlay contents.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayInfo {
    /// Playback position within the segment.
    pub elapsed: Duration,
    /// Length of the segment.
    pub total: Duration,
    /// Target playback rate.
    pub fps: f64,
    /// File size in MiB.
    pub file_size_mb: f64,
    /// Final path component of the asset.
    pub file_name: String,
}

impl OverlayInfo {
    /// The four overlay lines, in the order of [`OVERLAY_LINE_ORIGINS`].
    pub fn lines(&self) -> [String; 4] {
        [
            self.file_name.clone(),
            format!(
                "Time: {} / {}",
                format_clock(self.elapsed),
                format_clock(self.total)
            ),
            format!("FPS: {}", self.fps),
            format!("Size: {:.2} MB", self.file_size_mb),
        ]
    }
}

/// `MM:SS` with truncated seconds; minutes keep counting past 99.
pub fn format_clock(time: Duration) -> String {
    let seconds = time.as_secs();
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

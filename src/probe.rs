//! FFmpeg-backed asset probing.
//!
//! [`FfmpegProber`] opens a file's container, reads the duration and the
//! best video stream's rate and frame size, and closes the demuxer again.
//! Nothing is decoded, so probing a large library stays cheap.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use reelshuffle::{AssetProber, FfmpegProber};
//!
//! let info = FfmpegProber.probe(Path::new("input.mp4"))?;
//! println!("{}s, {}x{} @ {:.2} fps", info.duration_secs, info.width, info.height, info.native_fps);
//! # Ok::<(), reelshuffle::PlaybackError>(())
//! ```

use std::path::Path;

use ffmpeg_next::{codec::context::Context as CodecContext, media::Type};

use crate::{asset::AssetInfo, error::PlaybackError, library::AssetProber, utilities};

/// Microseconds per second (FFmpeg's `AV_TIME_BASE`).
const AV_TIME_BASE: i64 = 1_000_000;

/// Probes files with FFmpeg's demuxer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegProber;

impl AssetProber for FfmpegProber {
    fn probe(&self, path: &Path) -> Result<AssetInfo, PlaybackError> {
        let open_error = |reason: String| PlaybackError::DecodeOpen {
            path: path.to_path_buf(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| PlaybackError::NoVideoStream {
                path: path.to_path_buf(),
            })?;

        let native_fps = utilities::rational_to_fps(stream.avg_frame_rate())
            .or_else(|| utilities::rational_to_fps(stream.rate()))
            .unwrap_or(0.0);

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| open_error(format!("Failed to read codec parameters: {error}")))?;

        // Container duration is unset for some live or damaged files.
        let duration = input_context.duration();
        let duration_secs = if duration > 0 {
            (duration / AV_TIME_BASE) as u64
        } else {
            0
        };

        log::debug!(
            "Probed {}: {}s, {}x{}, {:.2} fps",
            path.display(),
            duration_secs,
            decoder.width(),
            decoder.height(),
            native_fps
        );

        Ok(AssetInfo {
            duration_secs,
            native_fps,
            width: decoder.width(),
            height: decoder.height(),
        })
    }
}

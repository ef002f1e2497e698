//! # reelshuffle
//!
//! Ambient video shuffling: play random segments of the videos in a
//! directory, one after another, at a steady frame rate.
//!
//! Each segment runs through a small two-thread pipeline. A
//! [`FrameProducer`] decodes the segment on its own thread with
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), resamples it to the
//! target rate and fills a bounded [`frame_channel`]. The session thread's
//! [`PlaybackPacer`] takes one frame per tick, letterboxes it for the current
//! window and hands it to a [`Renderer`]. The [`SegmentScheduler`] ties the
//! two together and keeps going until the user quits.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reelshuffle::{
//!     FfmpegOpener, FfmpegProber, MonotonicClock, NoScanProgress, PlayerConfig, ScanOptions,
//!     SegmentScheduler, VideoLibrary, window,
//! };
//!
//! let config = PlayerConfig::new().with_intervals(20, 40);
//! let library = VideoLibrary::scan(
//!     "/srv/videos",
//!     &ScanOptions::from_config(&config),
//!     &FfmpegProber,
//!     &NoScanProgress,
//!     &mut rand::rng(),
//! )?;
//!
//! let size = config.initial_window_size();
//! let summary = window::run_window("reelshuffle", size, move |mut renderer, mut events| {
//!     let clock = MonotonicClock::new();
//!     let opener = Arc::new(FfmpegOpener);
//!     let mut scheduler =
//!         SegmentScheduler::new(&library, &config, opener, rand::rng(), &clock);
//!     scheduler.run(&mut renderer, &mut events)
//! })?;
//! println!("{} segments played", summary.segments);
//! # Ok::<(), reelshuffle::PlaybackError>(())
//! ```
//!
//! ## Features
//!
//! - **Random segments**: a length between the configured bounds, at a random
//!   offset, from a playlist reshuffled after every pass
//! - **Resampling**: any source rate is played back at the target rate by
//!   repeating or dropping decoded frames
//! - **Backpressure**: the producer stops decoding ahead once the channel
//!   holds `preload_threshold` frames
//! - **Prompt cancellation**: skipping a segment releases its decoder without
//!   waiting for the channel to drain
//! - **Testable seams**: [`DecoderOpener`], [`Renderer`], [`EventSource`] and
//!   [`Clock`] can all be replaced, down to a simulated clock
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `window` | Native playback window via `eframe` (default) |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod asset;
pub mod channel;
pub mod clock;
pub mod config;
pub mod decoder;
pub mod error;
pub mod ffmpeg;
pub mod input;
pub mod layout;
pub mod library;
pub mod pacer;
pub mod probe;
pub mod producer;
pub mod render;
pub mod scheduler;
pub mod segment;
pub mod source;
mod utilities;
#[cfg(feature = "window")]
pub mod window;

pub use asset::{AssetInfo, VideoAsset};
pub use channel::{FrameReceiver, FrameSender, PutError, Received, frame_channel};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::PlayerConfig;
pub use decoder::{FfmpegDecoder, FfmpegOpener};
pub use error::PlaybackError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use input::{EventSource, NoEvents, PlayerEvent};
pub use layout::{centered_position, display_size};
pub use library::{
    AssetProber, NoScanProgress, ScanOptions, ScanProgress, VIDEO_EXTENSIONS, VideoLibrary,
};
pub use pacer::{PlaybackPacer, SegmentOutcome, SegmentReport};
pub use probe::FfmpegProber;
pub use producer::{FrameProducer, ProducerState};
pub use render::{OverlayInfo, Renderer, format_clock};
pub use scheduler::{Playlist, SegmentScheduler, SessionSummary};
pub use segment::PlaybackSegment;
pub use source::{DecoderBackend, DecoderOpener, Frame, FrameSource, TimedFrame};
#[cfg(feature = "window")]
pub use window::{WindowRenderer, run_window};

//! Player configuration.
//!
//! [`PlayerConfig`] is a builder that threads interval bounds, the target
//! frame rate, and the pipeline's buffering and timeout knobs through the
//! scheduler, producer, and pacer without widening every signature.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use reelshuffle::PlayerConfig;
//!
//! let config = PlayerConfig::new()
//!     .with_intervals(20, 45)
//!     .with_target_fps(30.0)
//!     .with_get_timeout(Duration::from_millis(500));
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use crate::error::PlaybackError;

/// Default lower bound of a segment, in seconds.
pub const DEFAULT_MIN_INTERVAL: u64 = 30;
/// Default upper bound of a segment, in seconds.
pub const DEFAULT_MAX_INTERVAL: u64 = 60;
/// Default playback rate.
pub const DEFAULT_TARGET_FPS: f64 = 24.0;
/// Default frame channel capacity (ten seconds at 24 fps).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 240;
/// Default occupancy at which the producer stops decoding ahead.
pub const DEFAULT_PRELOAD_THRESHOLD: usize = 120;

/// Configuration for a playback session.
///
/// The defaults are 30–60 s segments
/// at 24 fps, a 240-frame channel throttled at 120, one-second put/get/join
/// timeouts and a 10 ms throttle step.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub(crate) min_interval: u64,
    pub(crate) max_interval: u64,
    pub(crate) target_fps: f64,
    pub(crate) channel_capacity: usize,
    pub(crate) preload_threshold: usize,
    pub(crate) put_timeout: Duration,
    pub(crate) get_timeout: Duration,
    pub(crate) join_timeout: Duration,
    pub(crate) throttle_sleep: Duration,
    pub(crate) max_videos: Option<usize>,
    pub(crate) initial_window_size: (u32, u32),
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            target_fps: DEFAULT_TARGET_FPS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            preload_threshold: DEFAULT_PRELOAD_THRESHOLD,
            put_timeout: Duration::from_secs(1),
            get_timeout: Duration::from_secs(1),
            join_timeout: Duration::from_secs(1),
            throttle_sleep: Duration::from_millis(10),
            max_videos: None,
            initial_window_size: (1280, 720),
        }
    }

    /// Set the minimum and maximum segment length, in whole seconds.
    #[must_use]
    pub fn with_intervals(mut self, min_seconds: u64, max_seconds: u64) -> Self {
        self.min_interval = min_seconds;
        self.max_interval = max_seconds;
        self
    }

    /// Set the rate frames are resampled to and displayed at.
    #[must_use]
    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    /// Set the frame channel capacity and the producer's preload threshold.
    #[must_use]
    pub fn with_buffering(mut self, capacity: usize, preload_threshold: usize) -> Self {
        self.channel_capacity = capacity;
        self.preload_threshold = preload_threshold;
        self
    }

    /// How long a single producer `put` may block before rechecking cancellation.
    #[must_use]
    pub fn with_put_timeout(mut self, timeout: Duration) -> Self {
        self.put_timeout = timeout;
        self
    }

    /// How long the pacer waits for a frame before declaring a stall.
    #[must_use]
    pub fn with_get_timeout(mut self, timeout: Duration) -> Self {
        self.get_timeout = timeout;
        self
    }

    /// How long the scheduler waits for a cancelled producer to finish.
    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Step length of the producer's throttling sleep.
    #[must_use]
    pub fn with_throttle_sleep(mut self, step: Duration) -> Self {
        self.throttle_sleep = step;
        self
    }

    /// Limit how many suitable videos the library scan keeps.
    #[must_use]
    pub fn with_max_videos(mut self, max_videos: Option<usize>) -> Self {
        self.max_videos = max_videos;
        self
    }

    /// Window size assumed for layout until the first resize event arrives.
    #[must_use]
    pub fn with_initial_window_size(mut self, width: u32, height: u32) -> Self {
        self.initial_window_size = (width, height);
        self
    }

    /// Shortest segment, in seconds.
    pub fn min_interval(&self) -> u64 {
        self.min_interval
    }

    /// Longest segment, in seconds.
    pub fn max_interval(&self) -> u64 {
        self.max_interval
    }

    /// Playback rate every segment is resampled to.
    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    /// Slots in each segment's frame channel.
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Occupancy at which the producer starts throttling.
    pub fn preload_threshold(&self) -> usize {
        self.preload_threshold
    }

    /// Bound on a single producer `put`.
    pub fn put_timeout(&self) -> Duration {
        self.put_timeout
    }

    /// How long the pacer waits for a frame before stalling.
    pub fn get_timeout(&self) -> Duration {
        self.get_timeout
    }

    /// How long the scheduler waits for a cancelled producer.
    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }

    /// Sleep between occupancy checks while throttled.
    pub fn throttle_sleep(&self) -> Duration {
        self.throttle_sleep
    }

    /// Cap on assets accepted by a scan.
    pub fn max_videos(&self) -> Option<usize> {
        self.max_videos
    }

    /// Window size assumed until the first resize.
    pub fn initial_window_size(&self) -> (u32, u32) {
        self.initial_window_size
    }

    /// Interval between two rendered frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] naming the first offending value.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.min_interval == 0 {
            return Err(invalid("minimum interval must be at least 1 second"));
        }
        if self.max_interval < self.min_interval {
            return Err(invalid(format!(
                "maximum interval ({}) must be greater than or equal to minimum interval ({})",
                self.max_interval, self.min_interval
            )));
        }
        if !self.target_fps.is_finite() || self.target_fps <= 0.0 {
            return Err(invalid(format!(
                "target fps must be a positive number, got {}",
                self.target_fps
            )));
        }
        if self.channel_capacity == 0 {
            return Err(invalid("channel capacity must be at least 1"));
        }
        if self.preload_threshold == 0 || self.preload_threshold > self.channel_capacity {
            return Err(invalid(format!(
                "preload threshold must be within 1..={}, got {}",
                self.channel_capacity, self.preload_threshold
            )));
        }
        if self.put_timeout.is_zero() || self.get_timeout.is_zero() || self.join_timeout.is_zero()
        {
            return Err(invalid("timeouts must be non-zero"));
        }
        if self.max_videos == Some(0) {
            return Err(invalid("max videos must be a positive integer"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> PlaybackError {
    PlaybackError::InvalidConfig(message.into())
}

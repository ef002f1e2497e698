//! Segment selection.
//!
//! A [`PlaybackSegment`] is one randomly placed time window of one asset.
//! [`PlaybackSegment::choose`] draws the window length uniformly from the
//! configured interval bounds (clamped to the asset's duration) and then
//! places it uniformly inside the asset.

use std::{sync::Arc, time::Duration};

use rand::Rng;

use crate::{asset::VideoAsset, error::PlaybackError};

/// One bounded window of one asset, chosen immediately before playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSegment {
    asset: Arc<VideoAsset>,
    start_secs: u64,
    end_secs: u64,
    target_fps: f64,
}

impl PlaybackSegment {
    /// Build a segment from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] unless
    /// `start < end <= asset.duration` and `target_fps` is positive.
    pub fn new(
        asset: Arc<VideoAsset>,
        start_secs: u64,
        end_secs: u64,
        target_fps: f64,
    ) -> Result<Self, PlaybackError> {
        if start_secs >= end_secs || end_secs > asset.duration_secs() {
            return Err(PlaybackError::InvalidConfig(format!(
                "segment {start_secs}s..{end_secs}s does not fit {} ({}s)",
                asset.file_name(),
                asset.duration_secs()
            )));
        }
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(PlaybackError::InvalidConfig(format!(
                "target fps must be positive, got {target_fps}"
            )));
        }
        Ok(Self {
            asset,
            start_secs,
            end_secs,
            target_fps,
        })
    }

    /// Pick a random window of `asset` whose length lies in
    /// `[min(min_interval, duration), min(max_interval, duration)]`.
    ///
    /// Assets shorter than `min_interval` are played whole.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::AssetTooShort`] for zero-length assets.
    pub fn choose<R: Rng>(
        asset: Arc<VideoAsset>,
        min_interval: u64,
        max_interval: u64,
        target_fps: f64,
        rng: &mut R,
    ) -> Result<Self, PlaybackError> {
        let duration = asset.duration_secs();
        if duration == 0 {
            return Err(PlaybackError::AssetTooShort {
                path: asset.path().to_path_buf(),
            });
        }

        let play_duration = if duration >= min_interval {
            let upper = max_interval.min(duration).max(min_interval);
            rng.random_range(min_interval..=upper)
        } else {
            duration
        };

        let start_secs = if duration > play_duration {
            rng.random_range(0..=duration - play_duration)
        } else {
            0
        };

        log::debug!(
            "Chose segment {}s..{}s of {} ({}s long)",
            start_secs,
            start_secs + play_duration,
            asset.file_name(),
            duration
        );

        Self::new(asset, start_secs, start_secs + play_duration, target_fps)
    }

    /// The asset this segment is cut from.
    pub fn asset(&self) -> &Arc<VideoAsset> {
        &self.asset
    }

    /// First second of the segment.
    pub fn start_secs(&self) -> u64 {
        self.start_secs
    }

    /// Second at which the segment ends, exclusive.
    pub fn end_secs(&self) -> u64 {
        self.end_secs
    }

    /// Output frame rate.
    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    /// [`start_secs`](Self::start_secs) as a `Duration`.
    pub fn start(&self) -> Duration {
        Duration::from_secs(self.start_secs)
    }

    /// [`end_secs`](Self::end_secs) as a `Duration`.
    pub fn end(&self) -> Duration {
        Duration::from_secs(self.end_secs)
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.end_secs - self.start_secs)
    }

    /// Number of frames the window yields at the target rate.
    pub fn frame_count(&self) -> u64 {
        (self.duration().as_secs_f64() * self.target_fps).floor() as u64
    }
}

//! Error types for the `reelshuffle` crate.
//!
//! This module defines [`PlaybackError`], the unified error type returned by
//! every fallible operation in the crate. Decode errors are scoped to one
//! segment: the scheduler logs them and moves on. Only [`PlaybackError::NoAssets`]
//! ends a session before it starts.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `reelshuffle` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlaybackError {
    /// A video file could not be opened or positioned for decoding.
    #[error("Failed to open video at {path}: {reason}")]
    DecodeOpen {
        /// Path of the asset being opened.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// A frame could not be decoded mid-stream.
    #[error("Failed to decode video frame: {0}")]
    DecodeFrame(String),

    /// The file does not contain a video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// Path of the offending file.
        path: PathBuf,
    },

    /// The frame channel stayed saturated for the whole timeout.
    ///
    /// Transient: the caller should recheck cancellation and retry or give up.
    #[error("Frame channel timed out after {0:?}")]
    ChannelTimeout(Duration),

    /// The channel ran dry without the producer recording a failure.
    #[error("Playback of {path} stalled: no frames arrived in time")]
    SegmentStalled {
        /// Path of the asset whose segment stalled.
        path: PathBuf,
    },

    /// No playable video was found during the library scan.
    #[error("No suitable video files found in {directory}")]
    NoAssets {
        /// The directory that was scanned.
        directory: PathBuf,
    },

    /// The asset is too short to cut a segment from.
    #[error("Video {path} is too short to play")]
    AssetTooShort {
        /// Path of the asset.
        path: PathBuf,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred while reading the library directory.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// The playback window could not be created or the session thread died.
    #[error("Window error: {0}")]
    WindowError(String),
}

impl From<FfmpegError> for PlaybackError {
    fn from(error: FfmpegError) -> Self {
        PlaybackError::FfmpegError(error.to_string())
    }
}

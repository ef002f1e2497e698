//! Frame source: one segment of one file, resampled to the target rate.
//!
//! [`FrameSource`] sits on top of a [`DecoderBackend`] and turns its
//! variable-cadence stream of timestamped frames into exactly
//! `floor(window × target_fps)` frames, one per output tick. Output frame `i`
//! is the latest decoded frame whose presentation time is at or before
//! `start + i / target_fps`, so a slower source repeats frames and a faster
//! one drops them.
//!
//! The source holds at most two decoded frames (the current one and one
//! frame of lookahead). Dropping it, or calling [`FrameSource::close`],
//! releases the backend.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use image::RgbImage;

use crate::{error::PlaybackError, segment::PlaybackSegment};

/// A decoded RGB raster, 3 bytes per pixel, row-major.
pub type Frame = RgbImage;

/// A decoded frame together with its presentation time.
#[derive(Debug, Clone)]
pub struct TimedFrame {
    /// Presentation time relative to the start of the file.
    pub timestamp: Duration,
    /// Decoded RGB24 pixels at native size.
    pub image: Frame,
}

/// An open decoder positioned somewhere in a file.
///
/// Implementations must release their native resources in `close` and in
/// `Drop`, and `close` must be callable more than once.
pub trait DecoderBackend: Send {
    /// Position the decoder at or before `time`.
    fn seek(&mut self, time: Duration) -> Result<(), PlaybackError>;

    /// Decode the next frame, or `Ok(None)` at end of stream.
    fn decode_frame(&mut self) -> Result<Option<TimedFrame>, PlaybackError>;

    /// Release the underlying decoder and file handles.
    fn close(&mut self);

    /// Flag that aborts a blocking `decode_frame` from another thread.
    ///
    /// Once the flag is set, an in-flight or later decode returns an error
    /// promptly. Backends without a way to interrupt return `None`.
    fn interrupter(&self) -> Option<Arc<AtomicBool>> {
        None
    }
}

/// Opens [`DecoderBackend`]s for files.
///
/// Shared between segments, so it must be cheap to call repeatedly and
/// usable from producer threads.
pub trait DecoderOpener: Send + Sync + 'static {
    type Backend: DecoderBackend + 'static;

    fn open(&self, path: &Path) -> Result<Self::Backend, PlaybackError>;
}

/// Resampling frame sequence over one [`PlaybackSegment`].
pub struct FrameSource<B: DecoderBackend> {
    backend: Option<B>,
    path: PathBuf,
    start: Duration,
    target_fps: f64,
    total_frames: u64,
    emitted: u64,
    current: Option<TimedFrame>,
    lookahead: Option<TimedFrame>,
    frame_gap: Duration,
    exhausted: bool,
    failure: Option<PlaybackError>,
}

impl<B: DecoderBackend> FrameSource<B> {
    /// Open the segment's file and seek to its start.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::DecodeOpen`] if the file cannot be opened or
    /// the seek fails.
    pub fn open<O>(opener: &O, segment: &PlaybackSegment) -> Result<Self, PlaybackError>
    where
        O: DecoderOpener<Backend = B> + ?Sized,
    {
        let path = segment.asset().path().to_path_buf();
        let mut backend = opener.open(&path).map_err(|error| into_open_error(&path, error))?;
        if let Err(error) = backend.seek(segment.start()) {
            backend.close();
            return Err(into_open_error(&path, error));
        }

        log::debug!(
            "Opened frame source for {} at {:?} ({} frames at {} fps)",
            path.display(),
            segment.start(),
            segment.frame_count(),
            segment.target_fps()
        );

        Ok(Self::from_backend(
            backend,
            path,
            segment.start(),
            segment.target_fps(),
            segment.frame_count(),
        ))
    }

    /// Wrap an already-positioned backend.
    pub fn from_backend(
        backend: B,
        path: PathBuf,
        start: Duration,
        target_fps: f64,
        total_frames: u64,
    ) -> Self {
        Self {
            backend: Some(backend),
            path,
            start,
            target_fps,
            total_frames,
            emitted: 0,
            current: None,
            lookahead: None,
            frame_gap: Duration::from_secs_f64(1.0 / target_fps),
            exhausted: false,
            failure: None,
        }
    }

    /// Produce the next resampled frame, or `Ok(None)` once the window (or the
    /// stream) is over.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::DecodeFrame`] once the backend has failed and
    /// every frame decoded before the failure has been handed out. The source
    /// is closed before the error is returned.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, PlaybackError> {
        if self.emitted >= self.total_frames {
            self.close();
            return Ok(None);
        }
        if let Some(error) = self.failure.take() {
            self.close();
            return Err(error);
        }
        if self.backend.is_none() {
            return Ok(None);
        }

        let tick = self.start + Duration::from_secs_f64(self.emitted as f64 / self.target_fps);

        loop {
            if self.lookahead.is_none() && !self.exhausted {
                match self.pull() {
                    Ok(Some(frame)) => self.lookahead = Some(frame),
                    Ok(None) => self.exhausted = true,
                    Err(error) => {
                        // Reported on the next call, after the held frame.
                        self.failure = Some(error);
                        self.exhausted = true;
                    }
                }
            }

            match self.lookahead.take() {
                Some(next) if next.timestamp <= tick => self.promote(next),
                other => {
                    self.lookahead = other;
                    break;
                }
            }
        }

        if self.exhausted && self.lookahead.is_none() && self.ran_past_stream(tick) {
            return self.finish();
        }

        let image = self
            .current
            .as_ref()
            .or(self.lookahead.as_ref())
            .map(|frame| frame.image.clone());
        match image {
            Some(image) => {
                self.emitted += 1;
                Ok(Some(image))
            }
            None => self.finish(),
        }
    }

    /// Close and report a pending failure, if any.
    fn finish(&mut self) -> Result<Option<Frame>, PlaybackError> {
        self.close();
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }

    /// The backend's interrupt flag, if it has one.
    pub fn interrupter(&self) -> Option<Arc<AtomicBool>> {
        self.backend.as_ref().and_then(|backend| backend.interrupter())
    }

    /// Frames handed out so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// `true` once the backend has been released.
    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    /// Release the backend. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.close();
            log::debug!("Closed frame source for {}", self.path.display());
        }
        self.current = None;
        self.lookahead = None;
    }

    fn promote(&mut self, next: TimedFrame) {
        if let Some(previous) = &self.current {
            let gap = next.timestamp.saturating_sub(previous.timestamp);
            if !gap.is_zero() {
                self.frame_gap = gap;
            }
        }
        self.current = Some(next);
    }

    /// After the last decoded frame, a tick more than one source frame past it
    /// lies beyond the end of the stream.
    fn ran_past_stream(&self, tick: Duration) -> bool {
        self.current
            .as_ref()
            .is_some_and(|last| tick >= last.timestamp + self.frame_gap)
    }

    fn pull(&mut self) -> Result<Option<TimedFrame>, PlaybackError> {
        match self.backend.as_mut() {
            Some(backend) => backend.decode_frame().map_err(into_frame_error),
            None => Ok(None),
        }
    }
}

impl<B: DecoderBackend> Iterator for FrameSource<B> {
    type Item = Result<Frame, PlaybackError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl<B: DecoderBackend> Drop for FrameSource<B> {
    fn drop(&mut self) {
        self.close();
    }
}

fn into_open_error(path: &Path, error: PlaybackError) -> PlaybackError {
    match error {
        PlaybackError::DecodeOpen { .. } => error,
        other => PlaybackError::DecodeOpen {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

fn into_frame_error(error: PlaybackError) -> PlaybackError {
    match error {
        PlaybackError::DecodeFrame(_) => error,
        other => PlaybackError::DecodeFrame(other.to_string()),
    }
}

//! Bounded single-producer/single-consumer frame channel.
//!
//! [`frame_channel`] returns a [`FrameSender`]/[`FrameReceiver`] pair over a
//! fixed-capacity `crossbeam_channel::bounded` queue. Neither half is
//! `Clone`, so one segment's producer and pacer are the only parties that can
//! reach it. The end-of-stream marker occupies a slot like any frame, so
//! frames plus marker never exceed the capacity.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use image::RgbImage;
//! use reelshuffle::{Received, frame_channel};
//!
//! let (sender, receiver) = frame_channel(2);
//! sender.put(RgbImage::new(4, 4), Duration::from_millis(10)).unwrap();
//! sender.put_end(Duration::from_millis(10)).unwrap();
//!
//! assert!(matches!(receiver.get(Duration::from_millis(10)), Received::Frame(_)));
//! assert!(matches!(receiver.get(Duration::from_millis(10)), Received::End));
//! ```

use std::{fmt, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::{error::PlaybackError, source::Frame};

enum Item {
    Frame(Frame),
    End,
}

/// Outcome of [`FrameReceiver::get`].
#[derive(Debug)]
pub enum Received {
    /// The next frame, in production order.
    Frame(Frame),
    /// The producer finished and enqueued the end marker.
    End,
    /// Nothing arrived within the timeout (or the producer went away
    /// without an end marker).
    Empty,
}

/// Returned by [`FrameSender::put`] when the frame could not be enqueued.
/// Both variants hand the frame back so the caller can retry without
/// decoding it again.
pub enum PutError {
    /// The channel stayed full for the whole timeout.
    Saturated(Frame),
    /// The receiver has been dropped; no later `put` can succeed.
    Disconnected(Frame),
}

impl PutError {
    /// Take back the rejected frame.
    pub fn into_frame(self) -> Frame {
        match self {
            PutError::Saturated(frame) | PutError::Disconnected(frame) => frame,
        }
    }

    /// `true` when the receiver is gone.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, PutError::Disconnected(_))
    }
}

impl fmt::Debug for PutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, frame) = match self {
            PutError::Saturated(frame) => ("Saturated", frame),
            PutError::Disconnected(frame) => ("Disconnected", frame),
        };
        f.debug_tuple(name).field(&frame.dimensions()).finish()
    }
}

/// Producer half of a frame channel.
pub struct FrameSender {
    inner: Sender<Item>,
    capacity: usize,
}

/// Consumer half of a frame channel.
pub struct FrameReceiver {
    inner: Receiver<Item>,
    capacity: usize,
}

/// Create a channel holding at most `capacity` items (clamped to at least 1).
pub fn frame_channel(capacity: usize) -> (FrameSender, FrameReceiver) {
    let capacity = capacity.max(1);
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    (
        FrameSender {
            inner: sender,
            capacity,
        },
        FrameReceiver {
            inner: receiver,
            capacity,
        },
    )
}

impl FrameSender {
    /// Enqueue a frame, waiting at most `timeout` for space.
    ///
    /// # Errors
    ///
    /// Returns [`PutError::Saturated`] if the channel stayed full and
    /// [`PutError::Disconnected`] if the receiver has been dropped.
    pub fn put(&self, frame: Frame, timeout: Duration) -> Result<(), PutError> {
        match self.inner.send_timeout(Item::Frame(frame), timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(Item::Frame(frame))) => Err(PutError::Saturated(frame)),
            Err(SendTimeoutError::Disconnected(Item::Frame(frame))) => {
                Err(PutError::Disconnected(frame))
            }
            Err(SendTimeoutError::Timeout(Item::End) | SendTimeoutError::Disconnected(Item::End)) => {
                unreachable!("put only sends frames")
            }
        }
    }

    /// Enqueue the end-of-stream marker.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::ChannelTimeout`] if no slot freed up in time
    /// or the receiver is gone.
    pub fn put_end(&self, timeout: Duration) -> Result<(), PlaybackError> {
        self.inner
            .send_timeout(Item::End, timeout)
            .map_err(|_| PlaybackError::ChannelTimeout(timeout))
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// `true` when no item is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Fixed number of slots, end marker included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl FrameReceiver {
    /// Dequeue the next item, waiting at most `timeout`.
    pub fn get(&self, timeout: Duration) -> Received {
        match self.inner.recv_timeout(timeout) {
            Ok(Item::Frame(frame)) => Received::Frame(frame),
            Ok(Item::End) => Received::End,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Received::Empty,
        }
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// `true` when no item is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Fixed number of slots, end marker included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

//! Frame producer.
//!
//! A [`FrameProducer`] owns one segment's decode thread. The thread opens a
//! [`FrameSource`], pushes resampled frames into the segment's channel and
//! throttles itself once the channel holds `preload_threshold` frames. Its
//! lifecycle is
//!
//! ```text
//! Idle ──start──▶ Running ──▶ Stopped   (stream ended or cancelled)
//!                         └─▶ Failed    (open or decode error)
//! ```
//!
//! with `Cancelling` reported while a cancel request is pending. Whatever the
//! outcome, the thread releases the source and then tries once to enqueue the
//! end marker. A failure is recorded before the marker is sent, so a consumer
//! that sees the marker can already tell a failed stream from a finished one.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use reelshuffle::{
//!     AssetInfo, FfmpegOpener, FrameProducer, PlaybackSegment, PlayerConfig, VideoAsset,
//!     frame_channel,
//! };
//!
//! let info = AssetInfo { duration_secs: 120, native_fps: 30.0, width: 1280, height: 720 };
//! let asset = Arc::new(VideoAsset::new("clip.mp4", info, 0));
//! let segment = PlaybackSegment::new(asset, 10, 40, 24.0)?;
//! let config = PlayerConfig::new();
//!
//! let (sender, receiver) = frame_channel(config.channel_capacity());
//! let mut producer = FrameProducer::new(segment, sender, &config);
//! producer.start(Arc::new(FfmpegOpener))?;
//! // ... consume from `receiver` ...
//! producer.cancel();
//! producer.join(Duration::from_secs(1));
//! # Ok::<(), reelshuffle::PlaybackError>(())
//! ```

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::RecvTimeoutError;

use crate::{
    channel::{FrameSender, PutError},
    config::PlayerConfig,
    error::PlaybackError,
    segment::PlaybackSegment,
    source::{DecoderBackend, DecoderOpener, Frame, FrameSource},
};

/// Observable producer state.
#[derive(Debug, Clone)]
pub enum ProducerState {
    /// Constructed, not started.
    Idle,
    /// Decoding and enqueueing frames.
    Running,
    /// Cancel requested, thread not finished yet.
    Cancelling,
    /// Finished without error (end of segment or cancellation).
    Stopped,
    /// Finished because the source failed; carries the recorded error.
    Failed(Arc<PlaybackError>),
}

impl ProducerState {
    /// `true` for `Stopped` and `Failed`.
    pub fn is_finished(&self) -> bool {
        matches!(self, ProducerState::Stopped | ProducerState::Failed(_))
    }

    /// `true` for `Failed`.
    pub fn is_failed(&self) -> bool {
        matches!(self, ProducerState::Failed(_))
    }
}

#[derive(Debug, Clone)]
enum Status {
    Idle,
    Running,
    Stopped,
    Failed(Arc<PlaybackError>),
}

/// Type-erased access to the running source so `cancel` can drop it
/// without knowing the decoder backend.
trait SegmentFrames: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, PlaybackError>;
}

impl<B: DecoderBackend> SegmentFrames for FrameSource<B> {
    fn next_frame(&mut self) -> Result<Option<Frame>, PlaybackError> {
        FrameSource::next_frame(self)
    }
}

struct Shared {
    status: Mutex<Status>,
    cancelling: AtomicBool,
    source: Mutex<Option<Box<dyn SegmentFrames>>>,
    /// Aborts a decode that holds the `source` lock.
    interrupt: Mutex<Option<Arc<AtomicBool>>>,
    frames_sent: AtomicU64,
}

impl Shared {
    fn is_cancelling(&self) -> bool {
        self.cancelling.load(Ordering::Acquire)
    }

    fn set_status(&self, status: Status) {
        *lock(&self.status) = status;
    }

    fn install(&self, source: Box<dyn SegmentFrames>, interrupt: Option<Arc<AtomicBool>>) {
        *lock(&self.interrupt) = interrupt;
        *lock(&self.source) = Some(source);
        // A cancel that raced the open could not see the source yet.
        if self.is_cancelling() {
            self.interrupt_decode();
            self.release();
        }
    }

    fn interrupt_decode(&self) {
        if let Some(flag) = lock(&self.interrupt).as_ref() {
            flag.store(true, Ordering::Release);
        }
    }

    /// Decode one frame while holding the source; `None` once released.
    fn next_frame(&self) -> Result<Option<Frame>, PlaybackError> {
        match lock(&self.source).as_mut() {
            Some(source) => source.next_frame(),
            None => Ok(None),
        }
    }

    fn release(&self) {
        drop(lock(&self.source).take());
    }

    /// Release only if no decode is in flight.
    fn try_release(&self) {
        if let Ok(mut slot) = self.source.try_lock() {
            drop(slot.take());
        }
    }
}

/// Timing knobs copied out of [`PlayerConfig`] for the decode thread.
#[derive(Debug, Clone, Copy)]
struct ProducerSettings {
    put_timeout: Duration,
    preload_threshold: usize,
    throttle_sleep: Duration,
}

/// Drives one segment's [`FrameSource`] on a dedicated thread.
pub struct FrameProducer {
    segment: PlaybackSegment,
    settings: ProducerSettings,
    shared: Arc<Shared>,
    sender: Option<FrameSender>,
    handle: Option<JoinHandle<()>>,
    done: Option<crossbeam_channel::Receiver<()>>,
}

impl FrameProducer {
    /// An idle producer that will feed `sender`.
    pub fn new(segment: PlaybackSegment, sender: FrameSender, config: &PlayerConfig) -> Self {
        Self {
            segment,
            settings: ProducerSettings {
                put_timeout: config.put_timeout(),
                preload_threshold: config.preload_threshold().max(1),
                throttle_sleep: config.throttle_sleep(),
            },
            shared: Arc::new(Shared {
                status: Mutex::new(Status::Idle),
                cancelling: AtomicBool::new(false),
                source: Mutex::new(None),
                interrupt: Mutex::new(None),
                frames_sent: AtomicU64::new(0),
            }),
            sender: Some(sender),
            handle: None,
            done: None,
        }
    }

    /// The segment this producer decodes.
    pub fn segment(&self) -> &PlaybackSegment {
        &self.segment
    }

    /// Spawn the decode thread.
    ///
    /// A producer cancelled before `start` goes straight to `Stopped` and only
    /// enqueues the end marker.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidConfig`] if the producer was already
    /// started and [`PlaybackError::IoError`] if the thread cannot be spawned.
    pub fn start<O: DecoderOpener>(&mut self, opener: Arc<O>) -> Result<(), PlaybackError> {
        let sender = self.sender.take().ok_or_else(|| {
            PlaybackError::InvalidConfig("producer already started".to_string())
        })?;

        if self.shared.is_cancelling() {
            self.shared.set_status(Status::Stopped);
            let _ = sender.put_end(self.settings.put_timeout);
            return Ok(());
        }

        self.shared.set_status(Status::Running);

        let shared = Arc::clone(&self.shared);
        let segment = self.segment.clone();
        let settings = self.settings;
        let (done_sender, done_receiver) = crossbeam_channel::bounded(1);

        let spawned = thread::Builder::new()
            .name(format!("producer-{}", segment.asset().file_name()))
            .spawn(move || {
                run(&shared, &*opener, &segment, &sender, settings);
                let _ = done_sender.send(());
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.done = Some(done_receiver);
                Ok(())
            }
            Err(error) => {
                self.shared.set_status(Status::Failed(Arc::new(PlaybackError::DecodeFrame(
                    format!("failed to spawn producer thread: {error}"),
                ))));
                Err(PlaybackError::IoError(error))
            }
        }
    }

    /// Request cancellation and release the source if it is not mid-decode.
    ///
    /// A decode in flight is interrupted when the backend supports it, so the
    /// thread can release the source itself shortly after. Idempotent, and
    /// safe to call before [`start`](FrameProducer::start).
    pub fn cancel(&self) {
        if self.shared.cancelling.swap(true, Ordering::AcqRel) {
            return;
        }
        log::debug!(
            "Cancelling producer for {}",
            self.segment.asset().file_name()
        );
        self.shared.interrupt_decode();
        self.shared.try_release();
    }

    /// `true` once [`cancel`](FrameProducer::cancel) has been called.
    pub fn is_cancelling(&self) -> bool {
        self.shared.is_cancelling()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProducerState {
        let status = lock(&self.shared.status).clone();
        match status {
            Status::Stopped => ProducerState::Stopped,
            Status::Failed(error) => ProducerState::Failed(error),
            _ if self.shared.is_cancelling() => ProducerState::Cancelling,
            Status::Idle => ProducerState::Idle,
            Status::Running => ProducerState::Running,
        }
    }

    /// The recorded failure, if the producer ended in `Failed`.
    pub fn error(&self) -> Option<Arc<PlaybackError>> {
        match self.state() {
            ProducerState::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Frames successfully enqueued so far.
    pub fn frames_sent(&self) -> u64 {
        self.shared.frames_sent.load(Ordering::Acquire)
    }

    /// Wait at most `timeout` for the decode thread to finish.
    ///
    /// Returns `true` if the thread has finished (or never ran). On timeout
    /// the thread is detached and left to release its resources on its own.
    pub fn join(&mut self, timeout: Duration) -> bool {
        let Some(done) = self.done.take() else {
            return self.handle.is_none();
        };

        match done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        self.shared.set_status(Status::Failed(Arc::new(
                            PlaybackError::DecodeFrame("producer thread panicked".to_string()),
                        )));
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Producer for {} did not stop within {:?}; detaching it",
                    self.segment.asset().file_name(),
                    timeout
                );
                self.handle = None;
                false
            }
        }
    }
}

impl Drop for FrameProducer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run<O: DecoderOpener + ?Sized>(
    shared: &Shared,
    opener: &O,
    segment: &PlaybackSegment,
    sender: &FrameSender,
    settings: ProducerSettings,
) {
    let result = produce(shared, opener, segment, sender, settings);
    shared.release();

    let status = match result {
        Ok(()) => Status::Stopped,
        Err(error) if shared.is_cancelling() => {
            log::debug!("Ignoring error after cancellation: {error}");
            Status::Stopped
        }
        Err(error) => {
            log::warn!(
                "Producer for {} failed: {error}",
                segment.asset().file_name()
            );
            Status::Failed(Arc::new(error))
        }
    };
    shared.set_status(status);

    // A cancelled consumer is no longer draining, so waiting would only
    // hold up `join`.
    let end_timeout = if shared.is_cancelling() {
        Duration::ZERO
    } else {
        settings.put_timeout
    };
    if sender.put_end(end_timeout).is_err() {
        log::debug!(
            "Dropped end marker for {}: channel full or closed",
            segment.asset().file_name()
        );
    }

    log::debug!(
        "Producer for {} finished after {} frames",
        segment.asset().file_name(),
        shared.frames_sent.load(Ordering::Acquire)
    );
}

fn produce<O: DecoderOpener + ?Sized>(
    shared: &Shared,
    opener: &O,
    segment: &PlaybackSegment,
    sender: &FrameSender,
    settings: ProducerSettings,
) -> Result<(), PlaybackError> {
    if shared.is_cancelling() {
        return Ok(());
    }

    let source = FrameSource::open(opener, segment)?;
    let interrupt = source.interrupter();
    shared.install(Box::new(source), interrupt);

    loop {
        if shared.is_cancelling() {
            return Ok(());
        }

        let Some(mut frame) = shared.next_frame()? else {
            return Ok(());
        };

        loop {
            match sender.put(frame, settings.put_timeout) {
                Ok(()) => break,
                Err(PutError::Disconnected(_)) => return Ok(()),
                Err(PutError::Saturated(returned)) => {
                    if shared.is_cancelling() {
                        return Ok(());
                    }
                    frame = returned;
                }
            }
        }
        shared.frames_sent.fetch_add(1, Ordering::AcqRel);

        while sender.len() >= settings.preload_threshold && !shared.is_cancelling() {
            thread::sleep(settings.throttle_sleep);
        }
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

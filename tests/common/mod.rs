//! Test doubles shared by the integration tests.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use image::{Rgb, RgbImage};
use reelshuffle::{
    AssetInfo, AssetProber, Clock, DecoderBackend, DecoderOpener, EventSource, Frame,
    OverlayInfo, PlaybackError, PlayerEvent, Renderer, TimedFrame, VideoAsset,
};

// ── decoder ────────────────────────────────────────────────────────

/// Frame with its stream index encoded in the first pixel.
pub fn indexed_frame(index: u64, size: (u32, u32)) -> Frame {
    let mut image = RgbImage::new(size.0, size.1);
    image.put_pixel(0, 0, Rgb([(index % 256) as u8, ((index / 256) % 256) as u8, 0]));
    image
}

/// Stream index encoded by [`indexed_frame`].
pub fn frame_index(frame: &Frame) -> u64 {
    let pixel = frame.get_pixel(0, 0);
    u64::from(pixel[0]) + u64::from(pixel[1]) * 256
}

/// Opens [`MockBackend`]s producing a synthetic constant-rate stream.
#[derive(Debug, Clone)]
pub struct MockOpener {
    pub native_fps: f64,
    /// Frames in the whole file.
    pub stream_frames: u64,
    /// Number of successful decodes before every further decode fails.
    pub fail_after: Option<u64>,
    pub decode_delay: Duration,
    pub fail_open: bool,
    pub frame_size: (u32, u32),
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl MockOpener {
    pub fn new(native_fps: f64, stream_frames: u64) -> Self {
        Self {
            native_fps,
            stream_frames,
            fail_after: None,
            decode_delay: Duration::ZERO,
            fail_open: false,
            frame_size: (16, 9),
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_after(mut self, decodes: u64) -> Self {
        self.fail_after = Some(decodes);
        self
    }

    pub fn with_decode_delay(mut self, delay: Duration) -> Self {
        self.decode_delay = delay;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn backend(&self) -> MockBackend {
        MockBackend {
            settings: self.clone(),
            next_index: 0,
            decoded: 0,
            closed: false,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl DecoderOpener for MockOpener {
    type Backend = MockBackend;

    fn open(&self, path: &Path) -> Result<MockBackend, PlaybackError> {
        if self.fail_open {
            return Err(PlaybackError::DecodeOpen {
                path: path.to_path_buf(),
                reason: "mock open failure".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(self.backend())
    }
}

pub struct MockBackend {
    settings: MockOpener,
    next_index: u64,
    decoded: u64,
    closed: bool,
    interrupt: Arc<AtomicBool>,
}

impl MockBackend {
    /// Sleep for `delay` in 1 ms steps, failing as soon as the flag is set.
    fn interruptible_sleep(&self, delay: Duration) -> Result<(), PlaybackError> {
        let deadline = Instant::now() + delay;
        while Instant::now() < deadline {
            if self.interrupt.load(Ordering::Acquire) {
                return Err(PlaybackError::DecodeFrame("mock decode interrupted".to_string()));
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }
}

impl DecoderBackend for MockBackend {
    fn seek(&mut self, time: Duration) -> Result<(), PlaybackError> {
        self.next_index = (time.as_secs_f64() * self.settings.native_fps).floor() as u64;
        Ok(())
    }

    fn decode_frame(&mut self) -> Result<Option<TimedFrame>, PlaybackError> {
        if self.closed {
            return Ok(None);
        }
        if self
            .settings
            .fail_after
            .is_some_and(|limit| self.decoded >= limit)
        {
            return Err(PlaybackError::DecodeFrame("mock decode failure".to_string()));
        }
        if self.next_index >= self.settings.stream_frames {
            return Ok(None);
        }
        if !self.settings.decode_delay.is_zero() {
            self.interruptible_sleep(self.settings.decode_delay)?;
        }

        let index = self.next_index;
        self.next_index += 1;
        self.decoded += 1;
        Ok(Some(TimedFrame {
            timestamp: Duration::from_secs_f64(index as f64 / self.settings.native_fps),
            image: indexed_frame(index, self.settings.frame_size),
        }))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.settings.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn interrupter(&self) -> Option<Arc<AtomicBool>> {
        Some(Arc::clone(&self.interrupt))
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.close();
    }
}

// ── assets ─────────────────────────────────────────────────────────

pub fn asset(name: &str, duration_secs: u64) -> Arc<VideoAsset> {
    Arc::new(VideoAsset::new(name, asset_info(duration_secs), 4 * 1024 * 1024))
}

pub fn asset_info(duration_secs: u64) -> AssetInfo {
    AssetInfo {
        duration_secs,
        native_fps: 24.0,
        width: 16,
        height: 9,
    }
}

/// Probes by file name; unknown names fail.
#[derive(Debug, Default)]
pub struct MockProber {
    durations: HashMap<String, u64>,
}

impl MockProber {
    pub fn with(mut self, file_name: &str, duration_secs: u64) -> Self {
        self.durations.insert(file_name.to_string(), duration_secs);
        self
    }
}

impl AssetProber for MockProber {
    fn probe(&self, path: &Path) -> Result<AssetInfo, PlaybackError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.durations
            .get(&name)
            .map(|&duration| asset_info(duration))
            .ok_or_else(|| PlaybackError::DecodeOpen {
                path: path.to_path_buf(),
                reason: "unreadable".to_string(),
            })
    }
}

// ── renderer ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    pub index: u64,
    pub target_size: (u32, u32),
    pub position: (i32, i32),
}

/// Records everything the pacer asks it to draw.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub frames: Vec<RenderedFrame>,
    pub overlays: Vec<OverlayInfo>,
    pub resizes: Vec<(u32, u32)>,
    pub presents: usize,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, frame: Frame, target_size: (u32, u32), position: (i32, i32)) {
        self.frames.push(RenderedFrame {
            index: frame_index(&frame),
            target_size,
            position,
        });
    }

    fn overlay(&mut self, info: &OverlayInfo) {
        self.overlays.push(info.clone());
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resizes.push((width, height));
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}

// ── events ─────────────────────────────────────────────────────────

/// Hands out a fixed list of events, one per poll.
#[derive(Debug, Default)]
pub struct ScriptedEvents {
    script: VecDeque<PlayerEvent>,
}

impl ScriptedEvents {
    pub fn new(events: impl IntoIterator<Item = PlayerEvent>) -> Self {
        Self {
            script: events.into_iter().collect(),
        }
    }
}

impl EventSource for ScriptedEvents {
    fn poll(&mut self) -> Option<PlayerEvent> {
        self.script.pop_front()
    }
}

/// Emits `Quit` once the clock reaches `at`.
pub struct QuitAt<'c, C: Clock> {
    pub clock: &'c C,
    pub at: Duration,
}

impl<C: Clock> EventSource for QuitAt<'_, C> {
    fn poll(&mut self) -> Option<PlayerEvent> {
        (self.clock.now() >= self.at).then_some(PlayerEvent::Quit)
    }
}

/// Emits `Quit` on the poll after `polls` empty ones.
pub struct QuitAfterPolls {
    pub remaining: usize,
}

impl EventSource for QuitAfterPolls {
    fn poll(&mut self) -> Option<PlayerEvent> {
        if self.remaining == 0 {
            return Some(PlayerEvent::Quit);
        }
        self.remaining -= 1;
        None
    }
}

/// Poll `condition` every millisecond until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

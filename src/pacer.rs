//! Playback pacer: the consumer side of a segment.
//!
//! [`PlaybackPacer::play`] renders one frame per tick at the segment's
//! target rate. Each deadline is anchored to the wall-clock time the previous
//! tick began rather than to the previous deadline, so a stall is followed by
//! normal cadence instead of a burst of catch-up frames.
//!
//! A tick first waits for its deadline, then takes a frame (bounded wait),
//! then drains pending input events, and finally hands the frame and overlay
//! to the renderer.

use std::{sync::Arc, time::Duration};

use crate::{
    channel::{FrameReceiver, Received},
    clock::Clock,
    config::PlayerConfig,
    error::PlaybackError,
    input::{EventSource, PlayerEvent},
    layout,
    producer::{FrameProducer, ProducerState},
    render::{OverlayInfo, Renderer},
    segment::PlaybackSegment,
};

/// Why a segment's playback ended.
#[derive(Debug, Clone)]
pub enum SegmentOutcome {
    /// The producer's end marker arrived.
    Completed,
    /// No frame arrived in time and the producer recorded no failure.
    Stalled,
    /// The producer failed; playback of this segment is abandoned.
    Failed(Arc<PlaybackError>),
    /// The user skipped to the next segment.
    Skipped,
    /// The user asked to quit the session.
    Quit,
}

impl SegmentOutcome {
    /// `true` when the user asked to end the session.
    pub fn is_quit(&self) -> bool {
        matches!(self, SegmentOutcome::Quit)
    }
}

/// Summary of one segment's playback.
#[derive(Debug, Clone)]
pub struct SegmentReport {
    /// Why playback of the segment ended.
    pub outcome: SegmentOutcome,
    /// Frames handed to the renderer.
    pub frames_rendered: u64,
    /// Playback position reached, advanced by exactly one frame interval per
    /// rendered frame.
    pub elapsed: Duration,
}

/// Wall-clock paced consumer of a frame channel.
///
/// Lives for the whole session so the last known window size carries over
/// from one segment to the next.
pub struct PlaybackPacer<'c, C: Clock + ?Sized> {
    clock: &'c C,
    get_timeout: Duration,
    window_size: (u32, u32),
}

impl<'c, C: Clock + ?Sized> PlaybackPacer<'c, C> {
    /// A pacer using `config`'s get timeout and initial window size.
    pub fn new(config: &PlayerConfig, clock: &'c C) -> Self {
        Self {
            clock,
            get_timeout: config.get_timeout(),
            window_size: config.initial_window_size(),
        }
    }

    /// Window size used for layout.
    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    /// Record a window resize and forward it to the renderer.
    pub fn handle_resize(&mut self, width: u32, height: u32, renderer: &mut dyn Renderer) {
        self.window_size = (width, height);
        renderer.resize(width, height);
    }

    /// Play `segment` from `receiver` until it ends, stalls, fails, or the
    /// user intervenes.
    ///
    /// The caller still owns `producer` and must cancel and join it afterwards.
    pub fn play(
        &mut self,
        segment: &PlaybackSegment,
        receiver: &FrameReceiver,
        producer: &FrameProducer,
        renderer: &mut dyn Renderer,
        events: &mut dyn EventSource,
    ) -> SegmentReport {
        let asset = segment.asset();
        let frame_interval = Duration::from_secs_f64(1.0 / segment.target_fps());
        let file_name = asset.file_name();
        let file_size_mb = asset.file_size_mb();

        let mut next_frame_deadline = self.clock.now();
        let mut elapsed = Duration::ZERO;
        let mut frames_rendered = 0_u64;

        let report = |outcome, frames_rendered, elapsed| SegmentReport {
            outcome,
            frames_rendered,
            elapsed,
        };

        loop {
            let now = self.clock.now();
            if now < next_frame_deadline {
                self.clock.sleep(next_frame_deadline - now);
                continue;
            }

            let frame = match receiver.get(self.get_timeout) {
                Received::Frame(frame) => frame,
                Received::End => {
                    let outcome = match producer.state() {
                        ProducerState::Failed(error) => SegmentOutcome::Failed(error),
                        _ => SegmentOutcome::Completed,
                    };
                    return report(outcome, frames_rendered, elapsed);
                }
                Received::Empty => {
                    let outcome = match producer.state() {
                        ProducerState::Failed(error) => SegmentOutcome::Failed(error),
                        _ => {
                            log::warn!(
                                "Frame channel empty after {:?}, skipping {file_name}",
                                self.get_timeout
                            );
                            SegmentOutcome::Stalled
                        }
                    };
                    return report(outcome, frames_rendered, elapsed);
                }
            };

            while let Some(event) = events.poll() {
                match event {
                    PlayerEvent::Quit => {
                        return report(SegmentOutcome::Quit, frames_rendered, elapsed);
                    }
                    PlayerEvent::Skip => {
                        log::info!("Skipping {file_name}");
                        return report(SegmentOutcome::Skipped, frames_rendered, elapsed);
                    }
                    PlayerEvent::Resize(width, height) => {
                        self.handle_resize(width, height, renderer);
                    }
                }
            }

            let frame_size = frame.dimensions();
            let target_size = layout::display_size(frame_size, self.window_size);
            let position = layout::centered_position(target_size, self.window_size);
            renderer.render(frame, target_size, position);
            renderer.overlay(&OverlayInfo {
                elapsed,
                total: segment.duration(),
                fps: segment.target_fps(),
                file_size_mb,
                file_name: file_name.clone(),
            });
            renderer.present();

            frames_rendered += 1;
            elapsed += frame_interval;
            next_frame_deadline = now + frame_interval;
        }
    }
}

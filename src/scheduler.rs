//! Segment scheduler: the session loop.
//!
//! [`SegmentScheduler::run`] walks a shuffled [`Playlist`] forever, cutting a
//! random [`PlaybackSegment`] from each asset and playing it through a fresh
//! channel, producer and the session's pacer. A segment that fails or stalls
//! is logged and the session moves on. The loop ends on a quit event, or
//! once no asset in the playlist can yield a segment.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reelshuffle::{
//!     FfmpegOpener, FfmpegProber, MonotonicClock, NoEvents, NoScanProgress, PlayerConfig,
//!     ScanOptions, SegmentScheduler, VideoLibrary,
//! };
//! # use reelshuffle::{OverlayInfo, Renderer, Frame};
//! # struct Discard;
//! # impl Renderer for Discard {
//! #     fn render(&mut self, _: Frame, _: (u32, u32), _: (i32, i32)) {}
//! #     fn overlay(&mut self, _: &OverlayInfo) {}
//! #     fn resize(&mut self, _: u32, _: u32) {}
//! # }
//!
//! let config = PlayerConfig::new();
//! let mut rng = rand::rng();
//! let library = VideoLibrary::scan(
//!     "/srv/videos",
//!     &ScanOptions::from_config(&config),
//!     &FfmpegProber,
//!     &NoScanProgress,
//!     &mut rng,
//! )?;
//!
//! let clock = MonotonicClock::new();
//! let mut scheduler =
//!     SegmentScheduler::new(&library, &config, Arc::new(FfmpegOpener), rng, &clock);
//! let summary = scheduler.run(&mut Discard, &mut NoEvents);
//! println!("played {} segments", summary.segments);
//! # Ok::<(), reelshuffle::PlaybackError>(())
//! ```

use std::{collections::HashSet, path::PathBuf, sync::Arc};

use rand::{Rng, seq::SliceRandom};

use crate::{
    asset::VideoAsset,
    channel::frame_channel,
    clock::Clock,
    config::PlayerConfig,
    error::PlaybackError,
    input::{EventSource, PlayerEvent},
    library::VideoLibrary,
    pacer::{PlaybackPacer, SegmentOutcome, SegmentReport},
    producer::FrameProducer,
    render::Renderer,
    segment::PlaybackSegment,
    source::DecoderOpener,
};

/// An endless shuffled ordering over a fixed set of assets.
///
/// Every asset is visited once per pass; the order is reshuffled each time a
/// pass completes.
#[derive(Debug, Clone)]
pub struct Playlist {
    assets: Vec<Arc<VideoAsset>>,
    position: usize,
    passes: u64,
}

impl Playlist {
    /// Shuffle `assets` into an initial order.
    pub fn new<R: Rng>(assets: Vec<Arc<VideoAsset>>, rng: &mut R) -> Self {
        let mut playlist = Self {
            assets,
            position: 0,
            passes: 0,
        };
        playlist.assets.shuffle(rng);
        playlist
    }

    /// Next asset in order, reshuffling after the last one. `None` when empty.
    pub fn next_asset<R: Rng>(&mut self, rng: &mut R) -> Option<Arc<VideoAsset>> {
        if self.assets.is_empty() {
            return None;
        }
        if self.position >= self.assets.len() {
            self.assets.shuffle(rng);
            self.position = 0;
            self.passes += 1;
            log::info!("All videos played. Reshuffling playlist.");
        }
        let asset = Arc::clone(&self.assets[self.position]);
        self.position += 1;
        Some(asset)
    }

    /// Number of assets in one pass.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// `true` when there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Completed passes over the whole list.
    pub fn passes(&self) -> u64 {
        self.passes
    }
}

/// Segment counts for a finished session.
///
/// `failed` also counts assets no segment could be cut from; those are not
/// included in `segments`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Segments handed to the pacer.
    pub segments: u64,
    /// Segments that reached their end marker.
    pub completed: u64,
    /// Segments abandoned after an empty `get`.
    pub stalled: u64,
    /// Segments ended by a skip event.
    pub skipped: u64,
    /// Segments whose producer failed, plus unplayable assets.
    pub failed: u64,
    /// Frames drawn across all segments.
    pub frames_rendered: u64,
}

impl SessionSummary {
    fn record(&mut self, report: &SegmentReport) {
        self.segments += 1;
        self.frames_rendered += report.frames_rendered;
        match report.outcome {
            SegmentOutcome::Completed => self.completed += 1,
            SegmentOutcome::Stalled => self.stalled += 1,
            SegmentOutcome::Failed(_) => self.failed += 1,
            SegmentOutcome::Skipped => self.skipped += 1,
            SegmentOutcome::Quit => {}
        }
    }
}

/// Drives segment lifecycles over a library until the user quits.
pub struct SegmentScheduler<'c, O, R, C>
where
    O: DecoderOpener,
    R: Rng,
    C: Clock + ?Sized,
{
    playlist: Playlist,
    config: PlayerConfig,
    opener: Arc<O>,
    rng: R,
    pacer: PlaybackPacer<'c, C>,
}

impl<'c, O, R, C> SegmentScheduler<'c, O, R, C>
where
    O: DecoderOpener,
    R: Rng,
    C: Clock + ?Sized,
{
    /// A scheduler over a freshly shuffled playlist of `library`.
    pub fn new(
        library: &VideoLibrary,
        config: &PlayerConfig,
        opener: Arc<O>,
        mut rng: R,
        clock: &'c C,
    ) -> Self {
        let playlist = Playlist::new(library.assets().to_vec(), &mut rng);
        Self {
            playlist,
            config: config.clone(),
            opener,
            rng,
            pacer: PlaybackPacer::new(config, clock),
        }
    }

    /// The playlist being cycled.
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Choose the next segment to play, or `None` if the playlist is empty.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::AssetTooShort`] if the chosen asset has no
    /// playable duration.
    pub fn next_segment(&mut self) -> Option<Result<PlaybackSegment, PlaybackError>> {
        let asset = self.playlist.next_asset(&mut self.rng)?;
        Some(PlaybackSegment::choose(
            asset,
            self.config.min_interval(),
            self.config.max_interval(),
            self.config.target_fps(),
            &mut self.rng,
        ))
    }

    /// Run segments until a quit event arrives.
    ///
    /// Also stops once every asset in the playlist has failed to yield a
    /// segment with no playable one in between.
    pub fn run(
        &mut self,
        renderer: &mut dyn Renderer,
        events: &mut dyn EventSource,
    ) -> SessionSummary {
        let mut summary = SessionSummary::default();
        let mut unplayable: HashSet<PathBuf> = HashSet::new();

        loop {
            if self.drain_idle_events(renderer, events) {
                break;
            }

            let segment = match self.next_segment() {
                Some(Ok(segment)) => {
                    unplayable.clear();
                    segment
                }
                Some(Err(error)) => {
                    log::warn!("{error}");
                    summary.failed += 1;
                    if let PlaybackError::AssetTooShort { path } = error {
                        unplayable.insert(path);
                    }
                    if unplayable.len() >= self.playlist.len() {
                        log::warn!("No playable segment in the playlist; stopping");
                        break;
                    }
                    continue;
                }
                None => {
                    log::warn!("Playlist is empty; nothing to play");
                    break;
                }
            };

            let report = self.play_segment(segment, renderer, events);
            summary.record(&report);
            if report.outcome.is_quit() {
                break;
            }
        }

        log::info!(
            "Session ended after {} segments ({} completed, {} skipped, {} stalled, {} failed)",
            summary.segments,
            summary.completed,
            summary.skipped,
            summary.stalled,
            summary.failed
        );
        summary
    }

    /// Play one segment through a fresh channel and producer.
    ///
    /// The producer is always cancelled and joined (bounded by the join
    /// timeout) before this returns.
    pub fn play_segment(
        &mut self,
        segment: PlaybackSegment,
        renderer: &mut dyn Renderer,
        events: &mut dyn EventSource,
    ) -> SegmentReport {
        log::info!(
            "Playing {} from {}s to {}s",
            segment.asset().file_name(),
            segment.start_secs(),
            segment.end_secs()
        );

        let (sender, receiver) = frame_channel(self.config.channel_capacity());
        let mut producer = FrameProducer::new(segment.clone(), sender, &self.config);

        let report = match producer.start(Arc::clone(&self.opener)) {
            Ok(()) => self
                .pacer
                .play(&segment, &receiver, &producer, renderer, events),
            Err(error) => SegmentReport {
                outcome: SegmentOutcome::Failed(Arc::new(error)),
                frames_rendered: 0,
                elapsed: Default::default(),
            },
        };

        // Closing the receiver first unblocks a producer stuck in `put`.
        producer.cancel();
        drop(receiver);
        producer.join(self.config.join_timeout());

        match &report.outcome {
            SegmentOutcome::Failed(error) => log::warn!(
                "Error playing {}: {error}",
                segment.asset().path().display()
            ),
            SegmentOutcome::Stalled => log::warn!(
                "{}",
                PlaybackError::SegmentStalled {
                    path: segment.asset().path().to_path_buf(),
                }
            ),
            _ => log::debug!(
                "Finished {} after {} frames",
                segment.asset().file_name(),
                report.frames_rendered
            ),
        }

        report
    }

    /// Handle events that arrive between segments. Returns `true` on quit.
    fn drain_idle_events(
        &mut self,
        renderer: &mut dyn Renderer,
        events: &mut dyn EventSource,
    ) -> bool {
        while let Some(event) = events.poll() {
            match event {
                PlayerEvent::Quit => return true,
                PlayerEvent::Skip => {}
                PlayerEvent::Resize(width, height) => {
                    self.pacer.handle_resize(width, height, renderer);
                }
            }
        }
        false
    }
}

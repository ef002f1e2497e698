//! FFmpeg decoder backend.
//!
//! [`FfmpegDecoder`] demuxes the best video stream of a file, decodes it and
//! converts every frame to packed RGB24 at the stream's native resolution.
//! Scaling to the window happens in the renderer, so frames stay
//! independent of the window size.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    error::PlaybackError,
    source::{DecoderBackend, DecoderOpener, TimedFrame},
    utilities,
};

/// Consecutive demuxer read errors tolerated before the stream is declared broken.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 64;

/// Opens [`FfmpegDecoder`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl DecoderOpener for FfmpegOpener {
    type Backend = FfmpegDecoder;

    fn open(&self, path: &Path) -> Result<FfmpegDecoder, PlaybackError> {
        FfmpegDecoder::open(path)
    }
}

/// A decoder over one file's best video stream.
///
/// Setting the flag returned by [`DecoderBackend::interrupter`] makes FFmpeg
/// abandon a blocking read, and the pending `decode_frame` fails.
pub struct FfmpegDecoder {
    path: PathBuf,
    stream: Option<OpenStream>,
    interrupt: Arc<AtomicBool>,
}

// SAFETY: the FFmpeg contexts are owned exclusively and only touched through
// `&mut self`, and the producer keeps the decoder behind a mutex.
unsafe impl Send for FfmpegDecoder {}

struct OpenStream {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    time_base: Rational,
    stream_start: i64,
    width: u32,
    height: u32,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    eof_sent: bool,
    interrupt: Arc<AtomicBool>,
}

impl FfmpegDecoder {
    /// Open `path` and prepare an RGB24 converter for its best video stream.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::DecodeOpen`] if FFmpeg cannot open the file
    /// or build a decoder, and [`PlaybackError::NoVideoStream`] if there is
    /// no video stream.
    pub fn open(path: &Path) -> Result<Self, PlaybackError> {
        let open_error = |reason: String| PlaybackError::DecodeOpen {
            path: path.to_path_buf(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let interrupt = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupt);
        let input_context =
            ffmpeg_next::format::input_with_interrupt(&path, move || flag.load(Ordering::Acquire))
                .map_err(|error| open_error(error.to_string()))?;

        let (video_stream_index, time_base, stream_start, decoder) = {
            let stream = input_context.streams().best(Type::Video).ok_or_else(|| {
                PlaybackError::NoVideoStream {
                    path: path.to_path_buf(),
                }
            })?;
            let decoder_context = CodecContext::from_parameters(stream.parameters())
                .map_err(|error| open_error(format!("Failed to read codec parameters: {error}")))?;
            let decoder = decoder_context
                .decoder()
                .video()
                .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;
            let start = stream.start_time();
            // AV_NOPTS_VALUE is i64::MIN.
            let stream_start = if start == i64::MIN { 0 } else { start };
            (stream.index(), stream.time_base(), stream_start, decoder)
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| open_error(format!("Failed to create RGB converter: {error}")))?;

        log::debug!(
            "Opened decoder for {} (stream={}, {}x{})",
            path.display(),
            video_stream_index,
            width,
            height
        );

        Ok(Self {
            path: path.to_path_buf(),
            interrupt: Arc::clone(&interrupt),
            stream: Some(OpenStream {
                input_context,
                decoder,
                scaler,
                video_stream_index,
                time_base,
                stream_start,
                width,
                height,
                decoded_frame: VideoFrame::empty(),
                rgb_frame: VideoFrame::empty(),
                eof_sent: false,
                interrupt,
            }),
        })
    }

    /// The file this decoder reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DecoderBackend for FfmpegDecoder {
    fn seek(&mut self, time: Duration) -> Result<(), PlaybackError> {
        let stream = self.stream.as_mut().ok_or_else(|| closed_error(&self.path))?;
        let target = utilities::duration_to_seek_timestamp(time);
        stream
            .input_context
            .seek(target, ..target)
            .map_err(|error| PlaybackError::DecodeOpen {
                path: self.path.clone(),
                reason: format!("Seek to {time:?} failed: {error}"),
            })?;
        stream.decoder.flush();
        stream.eof_sent = false;
        Ok(())
    }

    fn decode_frame(&mut self) -> Result<Option<TimedFrame>, PlaybackError> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_frame(),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Released decoder for {}", self.path.display());
        }
    }

    fn interrupter(&self) -> Option<Arc<AtomicBool>> {
        Some(Arc::clone(&self.interrupt))
    }
}

impl OpenStream {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, PlaybackError> {
        let mut read_errors = 0;

        loop {
            if self.interrupt.load(Ordering::Acquire) {
                return Err(PlaybackError::DecodeFrame("decode interrupted".to_string()));
            }
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return self.convert_current_frame().map(Some);
            }

            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    read_errors = 0;
                    if packet.stream() == self.video_stream_index {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|error| PlaybackError::DecodeFrame(error.to_string()))?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder
                        .send_eof()
                        .map_err(|error| PlaybackError::DecodeFrame(error.to_string()))?;
                    self.eof_sent = true;
                }
                Err(error) => {
                    read_errors += 1;
                    if read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        return Err(PlaybackError::DecodeFrame(format!(
                            "Demuxer kept failing: {error}"
                        )));
                    }
                }
            }
        }
    }

    fn convert_current_frame(&mut self) -> Result<TimedFrame, PlaybackError> {
        let pts = self
            .decoded_frame
            .timestamp()
            .or_else(|| self.decoded_frame.pts())
            .unwrap_or(self.stream_start);
        let seconds = utilities::pts_to_seconds(pts - self.stream_start, self.time_base);

        self.scaler
            .run(&self.decoded_frame, &mut self.rgb_frame)
            .map_err(|error| PlaybackError::DecodeFrame(error.to_string()))?;

        let buffer = utilities::frame_to_buffer(&self.rgb_frame, self.width, self.height, 3);
        let image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            PlaybackError::DecodeFrame(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })?;

        Ok(TimedFrame {
            timestamp: Duration::from_secs_f64(seconds.max(0.0)),
            image,
        })
    }
}

fn closed_error(path: &Path) -> PlaybackError {
    PlaybackError::DecodeOpen {
        path: path.to_path_buf(),
        reason: "decoder already closed".to_string(),
    }
}

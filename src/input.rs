//! Input seam: user and window events polled once per pacing tick.

/// An event that affects playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// End the whole session.
    Quit,
    /// End the current segment and move on.
    Skip,
    /// The window now has this inner size.
    Resize(u32, u32),
}

/// Non-blocking source of [`PlayerEvent`]s.
pub trait EventSource {
    /// Return the next pending event, if any, without blocking.
    fn poll(&mut self) -> Option<PlayerEvent>;
}

/// A source that never produces events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl EventSource for NoEvents {
    fn poll(&mut self) -> Option<PlayerEvent> {
        None
    }
}

impl EventSource for crossbeam_channel::Receiver<PlayerEvent> {
    /// A disconnected channel means the window is gone, which reads as `Quit`.
    fn poll(&mut self) -> Option<PlayerEvent> {
        match self.try_recv() {
            Ok(event) => Some(event),
            Err(crossbeam_channel::TryRecvError::Empty) => None,
            Err(crossbeam_channel::TryRecvError::Disconnected) => Some(PlayerEvent::Quit),
        }
    }
}

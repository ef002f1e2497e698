//! Frame producer lifecycle tests, driven by a mock decoder.

mod common;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use reelshuffle::{
    FrameProducer, PlaybackError, PlaybackSegment, PlayerConfig, ProducerState, Received,
    frame_channel,
};

use common::{MockOpener, asset, frame_index, wait_until};

fn segment(duration_secs: u64) -> PlaybackSegment {
    PlaybackSegment::new(asset("mock.mp4", duration_secs), 0, duration_secs, 24.0).unwrap()
}

/// Read until the end marker, returning the frame indices seen.
fn drain(receiver: &reelshuffle::FrameReceiver) -> Vec<u64> {
    let mut indices = Vec::new();
    loop {
        match receiver.get(Duration::from_secs(2)) {
            Received::Frame(frame) => indices.push(frame_index(&frame)),
            Received::End => return indices,
            Received::Empty => panic!("no end marker after {} frames", indices.len()),
        }
    }
}

#[test]
fn produces_every_frame_then_end_marker() {
    let config = PlayerConfig::new();
    let (sender, receiver) = frame_channel(config.channel_capacity());
    let opener = MockOpener::new(24.0, 48);
    let mut producer = FrameProducer::new(segment(2), sender, &config);

    assert!(matches!(producer.state(), ProducerState::Idle));
    producer.start(Arc::new(opener.clone())).unwrap();

    let indices = drain(&receiver);
    assert_eq!(indices, (0..48).collect::<Vec<_>>());

    assert!(producer.join(config.join_timeout()));
    assert!(matches!(producer.state(), ProducerState::Stopped));
    assert_eq!(producer.frames_sent(), 48);
    assert_eq!(opener.opened_count(), 1);
    assert_eq!(opener.closed_count(), 1);
}

#[test]
fn decode_failure_is_recorded_before_end_marker() {
    let config = PlayerConfig::new();
    let (sender, receiver) = frame_channel(config.channel_capacity());
    let opener = MockOpener::new(24.0, 1000).failing_after(10);
    let mut producer = FrameProducer::new(segment(30), sender, &config);
    producer.start(Arc::new(opener.clone())).unwrap();

    let indices = drain(&receiver);
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
    assert_eq!(producer.frames_sent(), 10);

    let error = producer.error().expect("producer should have failed");
    assert!(matches!(*error, PlaybackError::DecodeFrame(_)));
    assert!(producer.join(config.join_timeout()));
    assert!(producer.state().is_failed());
    assert_eq!(opener.closed_count(), 1);
}

#[test]
fn open_failure_fails_producer() {
    let config = PlayerConfig::new();
    let (sender, receiver) = frame_channel(config.channel_capacity());
    let mut producer = FrameProducer::new(segment(10), sender, &config);
    producer
        .start(Arc::new(MockOpener::new(24.0, 240).failing_open()))
        .unwrap();

    assert!(drain(&receiver).is_empty());
    assert!(producer.join(config.join_timeout()));
    match producer.state() {
        ProducerState::Failed(error) => {
            assert!(matches!(*error, PlaybackError::DecodeOpen { .. }));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn cancel_stops_a_slow_decoder_within_join_timeout() {
    let config = PlayerConfig::new();
    let (sender, receiver) = frame_channel(config.channel_capacity());
    let opener = MockOpener::new(24.0, 10_000).with_decode_delay(Duration::from_millis(100));
    let mut producer = FrameProducer::new(segment(300), sender, &config);
    producer.start(Arc::new(opener.clone())).unwrap();

    assert!(wait_until(Duration::from_secs(5), || producer.frames_sent() > 0));

    let started = Instant::now();
    producer.cancel();
    assert!(producer.is_cancelling());
    assert!(producer.join(config.join_timeout()));
    assert!(started.elapsed() < config.join_timeout());

    assert!(matches!(producer.state(), ProducerState::Stopped));
    assert_eq!(opener.closed_count(), 1);
    drop(receiver);
}

#[test]
fn cancel_is_idempotent() {
    let config = PlayerConfig::new();
    let (sender, _receiver) = frame_channel(config.channel_capacity());
    let mut producer = FrameProducer::new(segment(60), sender, &config);
    producer.start(Arc::new(MockOpener::new(24.0, 1440))).unwrap();

    producer.cancel();
    producer.cancel();
    assert!(producer.join(config.join_timeout()));
    producer.cancel();
    assert!(matches!(producer.state(), ProducerState::Stopped));
}

#[test]
fn cancel_before_start_only_sends_end_marker() {
    let config = PlayerConfig::new();
    let (sender, receiver) = frame_channel(config.channel_capacity());
    let opener = MockOpener::new(24.0, 240);
    let mut producer = FrameProducer::new(segment(10), sender, &config);

    producer.cancel();
    producer.start(Arc::new(opener.clone())).unwrap();

    assert!(matches!(receiver.get(Duration::from_millis(100)), Received::End));
    assert!(matches!(producer.state(), ProducerState::Stopped));
    assert!(producer.join(config.join_timeout()));
    assert_eq!(opener.opened_count(), 0);
}

#[test]
fn second_start_is_rejected() {
    let config = PlayerConfig::new();
    let (sender, _receiver) = frame_channel(config.channel_capacity());
    let opener = Arc::new(MockOpener::new(24.0, 240));
    let mut producer = FrameProducer::new(segment(10), sender, &config);

    producer.start(Arc::clone(&opener)).unwrap();
    let second = producer.start(opener);
    assert!(matches!(second, Err(PlaybackError::InvalidConfig(_))));

    producer.cancel();
    assert!(producer.join(config.join_timeout()));
}

#[test]
fn throttles_at_preload_threshold() {
    let config = PlayerConfig::new().with_buffering(40, 20);
    let (sender, receiver) = frame_channel(config.channel_capacity());
    let mut producer = FrameProducer::new(segment(60), sender, &config);
    producer.start(Arc::new(MockOpener::new(24.0, 1440))).unwrap();

    assert!(wait_until(Duration::from_secs(5), || receiver.len() >= 20));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(receiver.len(), 20);
    assert_eq!(producer.frames_sent(), 20);
    assert!(matches!(producer.state(), ProducerState::Running));

    // Consuming frees the producer to refill up to the threshold again.
    for _ in 0..5 {
        assert!(matches!(receiver.get(Duration::from_secs(1)), Received::Frame(_)));
    }
    assert!(wait_until(Duration::from_secs(5), || producer.frames_sent() == 25));

    producer.cancel();
    assert!(producer.join(config.join_timeout()));
}

#[test]
fn dropped_receiver_ends_production() {
    // A threshold above capacity keeps the producer blocked in `put`.
    let config = PlayerConfig::new()
        .with_buffering(4, 8)
        .with_put_timeout(Duration::from_millis(50));
    let (sender, receiver) = frame_channel(config.channel_capacity());
    let mut producer = FrameProducer::new(segment(60), sender, &config);
    producer.start(Arc::new(MockOpener::new(24.0, 1440))).unwrap();

    assert!(wait_until(Duration::from_secs(5), || receiver.len() == 4));
    drop(receiver);
    assert!(producer.join(Duration::from_secs(2)));
    assert!(matches!(producer.state(), ProducerState::Stopped));
    assert_eq!(producer.frames_sent(), 4);
}

#[test]
fn cancel_with_full_channel_does_not_wait_for_end_marker_slot() {
    // Threshold equal to capacity leaves no room for the end marker.
    let config = PlayerConfig::new()
        .with_buffering(4, 4)
        .with_put_timeout(Duration::from_secs(3));
    let (sender, receiver) = frame_channel(config.channel_capacity());
    let mut producer = FrameProducer::new(segment(60), sender, &config);
    producer.start(Arc::new(MockOpener::new(24.0, 1440))).unwrap();

    assert!(wait_until(Duration::from_secs(5), || receiver.len() == 4));

    let started = Instant::now();
    producer.cancel();
    assert!(producer.join(config.join_timeout()));
    assert!(started.elapsed() < config.join_timeout());
    assert!(matches!(producer.state(), ProducerState::Stopped));
    assert_eq!(receiver.len(), 4);
}

#[test]
fn cancel_interrupts_a_decode_longer_than_join_timeout() {
    let config = PlayerConfig::new();
    let (sender, _receiver) = frame_channel(config.channel_capacity());
    let opener = MockOpener::new(24.0, 1440).with_decode_delay(Duration::from_millis(1500));
    let mut producer = FrameProducer::new(segment(60), sender, &config);
    producer.start(Arc::new(opener.clone())).unwrap();

    assert!(wait_until(Duration::from_secs(5), || opener.opened_count() == 1));
    std::thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    producer.cancel();
    assert!(producer.join(config.join_timeout()));
    assert!(started.elapsed() < config.join_timeout());

    assert!(matches!(producer.state(), ProducerState::Stopped));
    assert_eq!(producer.frames_sent(), 0);
    assert_eq!(opener.closed_count(), 1);
}

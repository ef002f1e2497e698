//! Frame channel integration tests.

mod common;

use std::{
    thread,
    time::{Duration, Instant},
};

use reelshuffle::{PlaybackError, PutError, Received, frame_channel};

use common::{frame_index, indexed_frame};

const SHORT: Duration = Duration::from_millis(20);

#[test]
fn preserves_order_under_backpressure() {
    let (sender, receiver) = frame_channel(8);

    let producer = thread::spawn(move || {
        for index in 0..1000 {
            let mut frame = indexed_frame(index, (2, 2));
            loop {
                match sender.put(frame, Duration::from_millis(100)) {
                    Ok(()) => break,
                    Err(error) => frame = error.into_frame(),
                }
            }
            assert!(sender.len() <= sender.capacity());
        }
        sender.put_end(Duration::from_secs(1)).unwrap();
    });

    let mut expected = 0;
    loop {
        assert!(receiver.len() <= 8);
        match receiver.get(Duration::from_secs(1)) {
            Received::Frame(frame) => {
                assert_eq!(frame_index(&frame), expected);
                expected += 1;
            }
            Received::End => break,
            Received::Empty => panic!("producer stalled at frame {expected}"),
        }
    }
    producer.join().unwrap();
    assert_eq!(expected, 1000);
}

#[test]
fn put_on_full_channel_times_out_and_returns_the_frame() {
    let (sender, _receiver) = frame_channel(2);
    sender.put(indexed_frame(0, (2, 2)), SHORT).unwrap();
    sender.put(indexed_frame(1, (2, 2)), SHORT).unwrap();

    let started = Instant::now();
    let rejected = sender.put(indexed_frame(7, (2, 2)), SHORT).unwrap_err();
    assert!(started.elapsed() >= SHORT);
    assert!(matches!(rejected, PutError::Saturated(_)));
    assert_eq!(frame_index(&rejected.into_frame()), 7);
    assert_eq!(sender.len(), 2);
}

#[test]
fn end_marker_needs_a_free_slot() {
    let (sender, receiver) = frame_channel(1);
    sender.put(indexed_frame(0, (2, 2)), SHORT).unwrap();

    let result = sender.put_end(SHORT);
    assert!(matches!(result, Err(PlaybackError::ChannelTimeout(_))));

    assert!(matches!(receiver.get(SHORT), Received::Frame(_)));
    sender.put_end(SHORT).unwrap();
    assert!(matches!(receiver.get(SHORT), Received::End));
}

#[test]
fn get_on_empty_channel_waits_then_reports_empty() {
    let (_sender, receiver) = frame_channel(4);

    let started = Instant::now();
    assert!(matches!(receiver.get(SHORT), Received::Empty));
    assert!(started.elapsed() >= SHORT);
}

#[test]
fn frames_before_end_marker_are_delivered_first() {
    let (sender, receiver) = frame_channel(4);
    for index in 0..3 {
        sender.put(indexed_frame(index, (2, 2)), SHORT).unwrap();
    }
    sender.put_end(SHORT).unwrap();
    assert_eq!(receiver.len(), 4);

    for index in 0..3 {
        match receiver.get(SHORT) {
            Received::Frame(frame) => assert_eq!(frame_index(&frame), index),
            other => panic!("expected frame {index}, got {other:?}"),
        }
    }
    assert!(matches!(receiver.get(SHORT), Received::End));
    assert!(receiver.is_empty());
}

#[test]
fn zero_capacity_is_clamped() {
    let (sender, receiver) = frame_channel(0);
    assert_eq!(sender.capacity(), 1);
    assert_eq!(receiver.capacity(), 1);
    sender.put(indexed_frame(0, (2, 2)), SHORT).unwrap();
}

#[test]
fn dropped_receiver_disconnects_sender() {
    let (sender, receiver) = frame_channel(4);
    drop(receiver);

    // Disconnection is reported at once, not after the timeout.
    let started = Instant::now();
    let error = sender
        .put(indexed_frame(3, (2, 2)), Duration::from_secs(5))
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(error, PutError::Disconnected(_)));
    assert_eq!(frame_index(&error.into_frame()), 3);
    assert!(sender.put_end(SHORT).is_err());
}

#[test]
fn dropped_sender_reads_as_empty() {
    let (sender, receiver) = frame_channel(4);
    drop(sender);
    assert!(matches!(receiver.get(SHORT), Received::Empty));
}

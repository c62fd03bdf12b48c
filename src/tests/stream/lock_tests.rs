//! Tests for the rendezvous state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::record::Record;
use crate::stream::{Side, StreamLock, StreamState};

fn wait_for_state(lock: &StreamLock, lane: usize, state: StreamState) {
    while lock.state(lane) != state {
        thread::yield_now();
    }
}

#[test]
fn records_arrive_in_write_order() {
    let lock = Arc::new(StreamLock::new(&[true]));

    let producer = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || {
            for text in ["a", "b", "c"] {
                lock.output(0, Record::from(text)).expect("output");
            }
            lock.sever(0, Side::Output);
        })
    };

    let mut seen = Vec::new();
    while let Ok(record) = lock.read(0) {
        seen.push(record.to_string());
    }
    producer.join().expect("producer");

    assert_eq!(seen, vec!["a", "b", "c"]);
    assert_eq!(lock.consumed(0), 3);
    assert_eq!(lock.state(0), StreamState::Severed);
}

#[test]
fn peek_does_not_release_the_producer() {
    let lock = Arc::new(StreamLock::new(&[true]));
    let released = Arc::new(AtomicBool::new(false));

    let producer = {
        let lock = Arc::clone(&lock);
        let released = Arc::clone(&released);
        thread::spawn(move || {
            lock.output(0, Record::from("x")).expect("output");
            released.store(true, Ordering::SeqCst);
        })
    };

    let peeked = lock.peek(0).expect("peek");
    assert_eq!(peeked, "x");
    // Peeking twice sees the same record.
    assert_eq!(lock.peek(0).expect("second peek"), "x");

    thread::sleep(Duration::from_millis(50));
    assert!(!released.load(Ordering::SeqCst));
    assert_eq!(lock.state(0), StreamState::Full);

    let read = lock.read(0).expect("read");
    assert_eq!(read, peeked);
    producer.join().expect("producer");

    assert!(released.load(Ordering::SeqCst));
    assert_eq!(lock.consumed(0), 1);
}

#[test]
fn producer_waits_for_a_consumer() {
    let lock = Arc::new(StreamLock::new(&[true]));

    let producer = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.output(0, Record::from("late")))
    };

    wait_for_state(&lock, 0, StreamState::ReadyToOutput);
    assert_eq!(lock.read(0).expect("read"), "late");
    assert!(producer.join().expect("producer").is_ok());
}

#[test]
fn severed_lane_fails_immediately() {
    let lock = StreamLock::new(&[true]);
    lock.sever(0, Side::Input);

    assert!(lock.output(0, Record::from("x")).is_err());
    assert!(lock.peek(0).is_err());
    assert!(lock.read(0).is_err());

    // Idempotent.
    lock.sever(0, Side::Input);
    lock.sever(0, Side::Output);
    assert_eq!(lock.state(0), StreamState::Severed);
}

#[test]
fn unconnected_lane_starts_severed() {
    let lock = StreamLock::new(&[false, true]);
    assert_eq!(lock.lane_count(), 2);
    assert_eq!(lock.state(0), StreamState::Severed);
    assert_eq!(lock.state(1), StreamState::Empty);
    assert!(lock.peek(0).is_err());
}

#[test]
fn consumer_sever_releases_a_blocked_producer() {
    let lock = Arc::new(StreamLock::new(&[true]));

    let producer = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.output(0, Record::from("x")))
    };

    assert_eq!(lock.peek(0).expect("peek"), "x");
    lock.sever(0, Side::Input);

    assert!(producer.join().expect("producer").is_err());
    assert!(lock.read(0).is_err());
}

#[test]
fn producer_sever_keeps_a_handed_off_record() {
    let lock = Arc::new(StreamLock::new(&[true]));

    let consumer = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || {
            let first = lock.read(0).map(|r| r.to_string());
            let second = lock.read(0).map(|r| r.to_string());
            (first, second)
        })
    };

    wait_for_state(&lock, 0, StreamState::Reading);
    lock.output(0, Record::from("last")).expect("output");
    lock.sever(0, Side::Output);

    let (first, second) = consumer.join().expect("consumer");
    assert_eq!(first.as_deref(), Ok("last"));
    assert!(second.is_err());
}

fn spawn_waiting_producers(lock: &Arc<StreamLock>) -> Vec<thread::JoinHandle<()>> {
    let handles = ["zero", "one"]
        .into_iter()
        .enumerate()
        .map(|(lane, text)| {
            let lock = Arc::clone(lock);
            thread::spawn(move || {
                lock.output(lane, Record::from(text)).expect("output");
            })
        })
        .collect();
    wait_for_state(lock, 0, StreamState::ReadyToOutput);
    wait_for_state(lock, 1, StreamState::ReadyToOutput);
    handles
}

#[test]
fn read_any_prefers_the_lowest_waiting_lane() {
    let lock = Arc::new(StreamLock::new(&[true, true]));
    let producers = spawn_waiting_producers(&lock);

    let (lane, record) = lock.read_any().expect("first");
    assert_eq!((lane, record.as_str()), (0, "zero"));

    let (lane, record) = lock.read_any().expect("second");
    assert_eq!((lane, record.as_str()), (1, "one"));

    for p in producers {
        p.join().expect("producer");
    }
}

#[test]
fn read_any_after_peek_any_takes_the_peeked_record() {
    let lock = Arc::new(StreamLock::new(&[true, true]));
    let producers = spawn_waiting_producers(&lock);

    let (peeked_lane, peeked) = lock.peek_any().expect("peek");
    assert_eq!(peeked_lane, 0);

    let (read_lane, read) = lock.read_any().expect("read");
    assert_eq!(read_lane, peeked_lane);
    assert_eq!(read, peeked);

    assert_eq!(lock.read_any().expect("rest").1, "one");
    for p in producers {
        p.join().expect("producer");
    }
}

#[test]
fn waiting_lower_lane_beats_a_higher_lane_holding_a_record() {
    let lock = Arc::new(StreamLock::new(&[true, true]));

    let high = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.output(1, Record::from("one")).expect("output"))
    };
    // The record sits in lane 1 while its producer stays blocked.
    assert_eq!(lock.peek(1).expect("peek"), "one");
    assert_eq!(lock.state(1), StreamState::Full);

    let low = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.output(0, Record::from("zero")).expect("output"))
    };
    wait_for_state(&lock, 0, StreamState::ReadyToOutput);

    let (lane, record) = lock.read_any().expect("first");
    assert_eq!((lane, record.as_str()), (0, "zero"));
    let (lane, record) = lock.read_any().expect("second");
    assert_eq!((lane, record.as_str()), (1, "one"));

    low.join().expect("low producer");
    high.join().expect("high producer");
}

#[test]
fn any_operations_pick_the_only_lane_with_data() {
    let lock = Arc::new(StreamLock::new(&[true, true]));

    let producer = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.output(0, Record::from("zero")).expect("output"))
    };
    wait_for_state(&lock, 0, StreamState::ReadyToOutput);

    let (lane, peeked) = lock.peek_any().expect("peek");
    assert_eq!((lane, peeked.as_str()), (0, "zero"));
    let (lane, read) = lock.read_any().expect("read");
    assert_eq!((lane, read.as_str()), (0, "zero"));

    producer.join().expect("producer");
    assert_eq!(lock.consumed(0), 1);
    assert_eq!(lock.consumed(1), 0);
}

#[test]
fn any_operations_end_when_every_lane_is_severed() {
    let lock = Arc::new(StreamLock::new(&[true, true]));

    let reader = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.read_any())
    };

    lock.sever(1, Side::Output);
    thread::sleep(Duration::from_millis(20));
    lock.sever(0, Side::Output);

    assert!(reader.join().expect("reader").is_err());
    assert!(lock.peek_any().is_err());
}

#[test]
fn read_any_drains_the_remaining_lane() {
    let lock = Arc::new(StreamLock::new(&[true, true]));
    lock.sever(0, Side::Output);

    let producer = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || {
            for text in ["p", "q"] {
                lock.output(1, Record::from(text)).expect("output");
            }
            lock.sever(1, Side::Output);
        })
    };

    let mut seen = Vec::new();
    while let Ok((lane, record)) = lock.read_any() {
        assert_eq!(lane, 1);
        seen.push(record.to_string());
    }
    producer.join().expect("producer");
    assert_eq!(seen, vec!["p", "q"]);
}

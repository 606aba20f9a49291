//! Change Feed Tests
//!
//! Ordering across collections, overflow policies and shutdown as seen by a
//! subscriber on another thread.

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn store_with(capacity: usize, overflow: OverflowPolicy) -> Repos {
    Repos::with_builder(
        Database::builder()
            .feed_capacity(capacity)
            .overflow(overflow)
            .id_generator(Arc::new(SequentialIds::new())),
    )
    .unwrap()
}

#[test]
fn test_events_follow_commit_order_across_collections() {
    let repos = store_with(64, OverflowPolicy::Block);
    let stream = repos.changes();
    let suite = repos.suites.insert(Suite::new("s", at(1))).unwrap();
    let case = repos.cases.insert(Case::new(suite.as_str(), "c", at(2))).unwrap();
    repos.cases.start(&case, at(3)).unwrap();
    repos.logs.insert(LogLine::new(case.as_str(), 0, "hello", at(4))).unwrap();
    repos.suites.delete(&suite, at(5)).unwrap();

    let events = stream.drain();
    let summary: Vec<_> = events.iter().map(|e| (e.collection, e.op)).collect();
    assert_eq!(
        summary,
        vec![
            (Collection::Suites, ChangeOp::Insert),
            (Collection::Cases, ChangeOp::Insert),
            (Collection::Cases, ChangeOp::Update),
            (Collection::Logs, ChangeOp::Insert),
            (Collection::Suites, ChangeOp::Update),
        ]
    );
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    let deleted: Suite = events[4].decode().unwrap();
    assert!(deleted.entity.deleted);
}

#[test]
fn test_blocking_feed_with_live_subscriber() {
    let repos = store_with(2, OverflowPolicy::Block);
    let stream = repos.changes();
    let reader = thread::spawn(move || stream.take(20).count());

    for n in 0..20 {
        repos.suites.insert(Suite::new("s", at(n))).unwrap();
    }
    assert_eq!(reader.join().unwrap(), 20);
    assert_eq!(repos.database().feed_stats().dropped, 0);
}

#[test]
fn test_drop_newest_leaves_sequence_gaps() {
    let repos = store_with(2, OverflowPolicy::DropNewest);
    let stream = repos.changes();
    for n in 0..4 {
        repos.suites.insert(Suite::new("s", at(n))).unwrap();
    }
    let first = stream.drain();
    assert_eq!(first.iter().filter_map(|e| e.id()).collect::<Vec<_>>(), vec!["1", "2"]);

    repos.suites.insert(Suite::new("s", at(9))).unwrap();
    let next = stream.try_recv().unwrap();
    assert_eq!(next.id(), Some("5"));
    assert_eq!(next.sequence, first[1].sequence + 3);
    assert_eq!(repos.database().feed_stats().dropped, 2);
}

#[test]
fn test_close_ends_stream_after_drain() {
    let repos = store_with(16, OverflowPolicy::DropOldest);
    let stream = repos.changes();
    repos.suites.insert(Suite::new("s", at(1))).unwrap();
    repos.close();
    repos.close();

    assert!(repos.suites.insert(Suite::new("late", at(2))).is_err());
    assert_eq!(stream.recv_timeout(Duration::from_millis(100)).unwrap().id(), Some("1"));
    assert!(stream.recv().is_none());
    assert!(stream.is_finished());
}

#[test]
fn test_subscriber_joining_mid_stream_sees_only_later_events() {
    let repos = store_with(16, OverflowPolicy::DropOldest);
    repos.suites.insert(Suite::new("before", at(1))).unwrap();

    let a = repos.changes();
    let b = repos.changes();
    repos.suites.insert(Suite::new("after", at(2))).unwrap();

    for stream in [&a, &b] {
        let events = stream.drain();
        assert_eq!(events.len(), 1);
        let suite: Suite = events[0].decode().unwrap();
        assert_eq!(suite.name, "after");
        assert_eq!(events[0].sequence, 2);
    }
    assert_eq!(repos.database().feed_stats().subscribers, 2);
}

#[test]
fn test_concurrent_subscribers_each_receive_every_event() {
    let repos = store_with(4, OverflowPolicy::Block);
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let stream = repos.changes();
            thread::spawn(move || {
                stream
                    .take(30)
                    .map(|e| e.sequence)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for n in 0..30 {
        repos.suites.insert(Suite::new("s", at(n))).unwrap();
    }
    let expected: Vec<u64> = (1..=30).collect();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), expected);
    }
    assert_eq!(repos.database().feed_stats().dropped, 0);
}

#[test]
fn test_dropped_subscriber_does_not_stall_blocking_writers() {
    let repos = store_with(1, OverflowPolicy::Block);
    let idle = repos.changes();
    repos.suites.insert(Suite::new("a", at(1))).unwrap();
    drop(idle);

    for n in 2..6 {
        repos.suites.insert(Suite::new("s", at(n))).unwrap();
    }
    let stats = repos.database().feed_stats();
    assert_eq!(stats.subscribers, 0);
    assert_eq!(stats.published, 5);
}

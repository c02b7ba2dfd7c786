/*!
 * Bounded Channel Integration Tests
 *
 * Producer/consumer delivery under contention and wakeups with nothing to take
 */

use pretty_assertions::assert_eq;
use queued_sync::demo::{self, DemoConfig, Item};
use queued_sync::{BoundedChannel, CancelToken, SyncError};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < Duration::from_secs(10));
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_capacity_one_delivers_every_item_once() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 2_500;

    let channel: Arc<BoundedChannel<Item>> = Arc::new(BoundedChannel::new(1));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let channel = channel.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    channel.put((p, seq)).unwrap();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let channel = channel.clone();
            thread::spawn(move || {
                let mut taken = Vec::with_capacity(PER_PRODUCER);
                for _ in 0..PER_PRODUCER {
                    taken.push(channel.take().unwrap());
                }
                taken
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }

    let mut seen = HashSet::with_capacity(PRODUCERS * PER_PRODUCER);
    for handle in consumers {
        let taken = handle.join().unwrap();
        // Each consumer sees any one producer's items in production order
        for p in 0..PRODUCERS {
            let seqs: Vec<usize> = taken.iter().filter(|(q, _)| *q == p).map(|(_, s)| *s).collect();
            assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        }
        for item in taken {
            assert!(seen.insert(item), "duplicate delivery of {:?}", item);
        }
    }

    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    assert!(channel.is_empty());
    assert_eq!(channel.waiting_consumers(), 0);
    assert_eq!(channel.waiting_producers(), 0);
}

#[test]
fn test_demo_run_is_consistent() {
    let config = DemoConfig {
        producers: 4,
        consumers: 4,
        capacity: 1,
        items: 10_000,
    };
    let report = demo::run(&config).unwrap();

    assert_eq!(report.produced, 10_000);
    assert_eq!(report.consumed, 10_000);
    assert_eq!(report.duplicates, 0);
    assert!(report.is_consistent());
}

#[test]
fn test_uneven_producers_and_consumers() {
    let config = DemoConfig {
        producers: 3,
        consumers: 5,
        capacity: 4,
        items: 1_001,
    };
    let report = demo::run(&config).unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.consumed, 1_001);
}

#[test]
fn test_signal_without_item_keeps_consumer_waiting() {
    let channel: Arc<BoundedChannel<u32>> = Arc::new(BoundedChannel::new(2));

    let consumer = {
        let channel = channel.clone();
        thread::spawn(move || channel.take())
    };
    wait_until(|| channel.waiting_consumers() == 1);

    for _ in 0..5 {
        channel.signal_not_empty().unwrap();
        thread::sleep(Duration::from_millis(10));
    }

    // Woken with nothing to take: back to waiting, not returning empty-handed
    assert!(!consumer.is_finished());
    wait_until(|| channel.waiting_consumers() == 1);

    channel.put(42).unwrap();
    assert_eq!(consumer.join().unwrap(), Ok(42));
}

#[test]
fn test_cancelled_producer_leaves_items_intact() {
    let channel: Arc<BoundedChannel<u32>> = Arc::new(BoundedChannel::new(1));
    channel.put(1).unwrap();
    let cancel = CancelToken::new();

    let producer = {
        let channel = channel.clone();
        let cancel = cancel.clone();
        thread::spawn(move || channel.put_cancellable(2, &cancel))
    };
    wait_until(|| channel.waiting_producers() == 1);
    cancel.cancel();

    assert_eq!(producer.join().unwrap(), Err(SyncError::Interrupted));
    assert_eq!(channel.len(), 1);
    assert_eq!(channel.take(), Ok(1));
    assert_eq!(channel.try_take(), None);
}

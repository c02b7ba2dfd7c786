/*!
 * Synchronization Primitives Benchmarks
 *
 * Compare the queued locks against each other and parking_lot under
 * contention, plus bounded channel throughput
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use queued_sync::{BoundedChannel, ExclusiveLock, FifoMutex, ReentrantLock, SyncConfig};
use std::sync::Arc;
use std::thread;

const OPS_PER_THREAD: usize = 1_000;

/// Run `threads` workers that each perform `OPS_PER_THREAD` critical sections
fn contend<F>(threads: usize, op: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let op = op.clone();
            thread::spawn(move || {
                for _ in 0..OPS_PER_THREAD {
                    op();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_lock_unlock");

    let exclusive = ExclusiveLock::new();
    group.bench_function("exclusive", |b| {
        b.iter(|| {
            exclusive.lock();
            exclusive.unlock().unwrap();
        })
    });

    let reentrant = ReentrantLock::new();
    group.bench_function("reentrant", |b| {
        b.iter(|| {
            reentrant.lock();
            reentrant.unlock().unwrap();
        })
    });

    let fifo = FifoMutex::new();
    group.bench_function("fifo", |b| {
        b.iter(|| {
            fifo.lock();
            fifo.unlock().unwrap();
        })
    });

    let baseline = parking_lot::Mutex::new(0u64);
    group.bench_function("parking_lot", |b| {
        b.iter(|| {
            *baseline.lock() += 1;
        })
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_lock_unlock");
    group.sample_size(20);

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements((threads * OPS_PER_THREAD) as u64));

        group.bench_with_input(BenchmarkId::new("exclusive", threads), &threads, |b, &t| {
            b.iter(|| {
                let lock = ExclusiveLock::new();
                contend(t, move || {
                    lock.lock();
                    black_box(lock.owner_id());
                    lock.unlock().unwrap();
                });
            })
        });

        group.bench_with_input(
            BenchmarkId::new("exclusive_no_spin", threads),
            &threads,
            |b, &t| {
                b.iter(|| {
                    let lock = ExclusiveLock::with_config(SyncConfig::no_spin());
                    contend(t, move || {
                        lock.lock();
                        lock.unlock().unwrap();
                    });
                })
            },
        );

        group.bench_with_input(BenchmarkId::new("fifo", threads), &threads, |b, &t| {
            b.iter(|| {
                let mutex = FifoMutex::new();
                contend(t, move || {
                    mutex.lock();
                    mutex.unlock().unwrap();
                });
            })
        });

        group.bench_with_input(BenchmarkId::new("parking_lot", threads), &threads, |b, &t| {
            b.iter(|| {
                let mutex = parking_lot::Mutex::new(0u64);
                contend(t, move || {
                    *mutex.lock() += 1;
                });
            })
        });
    }

    group.finish();
}

fn bench_channel_throughput(c: &mut Criterion) {
    const ITEMS: usize = 10_000;
    let mut group = c.benchmark_group("channel_throughput");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ITEMS as u64));

    for capacity in [1usize, 16, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let channel = Arc::new(BoundedChannel::new(capacity));
                    let producer = {
                        let channel = channel.clone();
                        thread::spawn(move || {
                            for i in 0..ITEMS {
                                channel.put(i).unwrap();
                            }
                        })
                    };
                    let mut sum = 0usize;
                    for _ in 0..ITEMS {
                        sum += channel.take().unwrap();
                    }
                    producer.join().unwrap();
                    black_box(sum)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended,
    bench_contended,
    bench_channel_throughput
);
criterion_main!(benches);

/*!
 * Producer/Consumer Runner
 *
 * Drives a `BoundedChannel` with several producers and consumers and checks
 * what came out: every item exactly once, each producer's items in order.
 */

use super::config::{ConfigError, DemoConfig};
use crate::errors::{SyncError, SyncResult};
use crate::monitoring::WorkerSpan;
use crate::sync::BoundedChannel;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

/// Demo run errors
#[derive(Error, Debug)]
pub enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Channel operation failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(String),
}

/// One produced item: (producer index, sequence number within that producer)
pub type Item = (usize, usize);

/// Outcome of a demo run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoReport {
    pub produced: usize,
    pub consumed: usize,
    pub duplicates: usize,
    /// True if every consumer saw each producer's items in increasing order
    pub per_producer_order: bool,
    pub elapsed_ms: u64,
}

impl DemoReport {
    /// Every produced item was delivered exactly once
    pub fn is_consistent(&self) -> bool {
        self.produced == self.consumed && self.duplicates == 0 && self.per_producer_order
    }
}

/// Split `total` into `parts` shares differing by at most one
fn share(total: usize, parts: usize, index: usize) -> usize {
    total / parts + usize::from(index < total % parts)
}

/// Run the demo to completion
pub fn run(config: &DemoConfig) -> Result<DemoReport, DemoError> {
    config.validate()?;
    let channel: Arc<BoundedChannel<Item>> = Arc::new(BoundedChannel::new(config.capacity));
    let start = Instant::now();

    let producers: Vec<_> = (0..config.producers)
        .map(|p| {
            let channel = channel.clone();
            let count = share(config.items, config.producers, p);
            thread::Builder::new()
                .name(format!("producer-{}", p))
                .spawn(move || -> SyncResult<usize> {
                    let mut span = WorkerSpan::new("producer", p);
                    for seq in 0..count {
                        channel.put((p, seq))?;
                        span.record_item();
                    }
                    Ok(span.items())
                })
        })
        .collect::<Result<_, _>>()?;

    let consumers: Vec<_> = (0..config.consumers)
        .map(|c| {
            let channel = channel.clone();
            let count = share(config.items, config.consumers, c);
            thread::Builder::new()
                .name(format!("consumer-{}", c))
                .spawn(move || -> SyncResult<Vec<Item>> {
                    let mut span = WorkerSpan::new("consumer", c);
                    let mut taken = Vec::with_capacity(count);
                    for _ in 0..count {
                        taken.push(channel.take()?);
                        span.record_item();
                    }
                    Ok(taken)
                })
        })
        .collect::<Result<_, _>>()?;

    let mut produced = 0;
    for handle in producers {
        produced += join(handle)??;
    }

    let mut seen = HashSet::with_capacity(config.items);
    let mut consumed = 0;
    let mut duplicates = 0;
    let mut per_producer_order = true;
    for handle in consumers {
        let taken = join(handle)??;
        let mut last_seq = vec![None; config.producers];
        for (p, seq) in taken {
            consumed += 1;
            if !seen.insert((p, seq)) {
                duplicates += 1;
            }
            if last_seq[p].is_some_and(|last| last >= seq) {
                per_producer_order = false;
            }
            last_seq[p] = Some(seq);
        }
    }

    let report = DemoReport {
        produced,
        consumed,
        duplicates,
        per_producer_order,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        produced = report.produced,
        consumed = report.consumed,
        duplicates = report.duplicates,
        elapsed_ms = report.elapsed_ms,
        "Demo run finished"
    );
    Ok(report)
}

fn join<T>(handle: thread::JoinHandle<T>) -> Result<T, DemoError> {
    let name = handle.thread().name().unwrap_or("unnamed").to_string();
    handle.join().map_err(|_| DemoError::WorkerPanicked(name))
}

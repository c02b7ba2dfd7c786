/*!
 * Structured Tracing
 * Subscriber setup and worker spans using the tracing crate
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Workers running longer than this are reported as slow
const SLOW_WORKER: Duration = Duration::from_secs(5);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - QSYNC_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("QSYNC_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one producer or consumer thread
pub struct WorkerSpan {
    span: tracing::Span,
    start: Instant,
    role: &'static str,
    index: usize,
    items: usize,
}

impl WorkerSpan {
    pub fn new(role: &'static str, index: usize) -> Self {
        let span = span!(
            Level::DEBUG,
            "worker",
            role = role,
            index = index,
            items = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );
        {
            let _entered = span.enter();
            debug!(role, index, "worker started");
        }
        Self {
            span,
            start: Instant::now(),
            role,
            index,
            items: 0,
        }
    }

    /// Count one item moved through the channel
    #[inline]
    pub fn record_item(&mut self) {
        self.items += 1;
    }

    #[inline]
    pub fn items(&self) -> usize {
        self.items
    }
}

impl Drop for WorkerSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("items", self.items);
        self.span.record("duration_ms", duration.as_millis() as u64);
        let _entered = self.span.enter();

        if duration > SLOW_WORKER {
            warn!(
                role = self.role,
                index = self.index,
                items = self.items,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow worker detected"
            );
        } else {
            debug!(
                role = self.role,
                index = self.index,
                items = self.items,
                duration_ms = duration.as_millis() as u64,
                "worker finished"
            );
        }
    }
}

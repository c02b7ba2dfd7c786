/*!
 * Monitoring
 * Structured tracing setup and worker spans
 */

mod tracer;

pub use tracer::{init_tracing, WorkerSpan};

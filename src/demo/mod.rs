/*!
 * Bounded Channel Demo
 * Producer/consumer run over `BoundedChannel` with result verification
 */

mod config;
mod runner;

pub use config::{ConfigError, DemoConfig};
pub use runner::{run, DemoError, DemoReport, Item};

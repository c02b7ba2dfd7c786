/*!
 * Channel Demo - Main Entry Point
 *
 * Runs producers and consumers over a bounded channel built on the queued
 * synchronizer, then prints a JSON report of what was delivered.
 */

use anyhow::{bail, Context};
use tracing::info;

use queued_sync::demo::{self, DemoConfig};
use queued_sync::init_tracing;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = DemoConfig::from_env().context("Invalid demo configuration")?;
    info!(
        producers = config.producers,
        consumers = config.consumers,
        capacity = config.capacity,
        items = config.items,
        "Starting bounded channel demo"
    );
    println!("{}", serde_json::to_string_pretty(&config)?);

    let report = demo::run(&config).context("Demo run failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_consistent() {
        bail!("Channel delivered an inconsistent item set");
    }
    info!("Demo completed");
    Ok(())
}

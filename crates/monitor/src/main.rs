//! Fatigue Monitor - Main Entry Point
//!
//! Usage: `fatigue-monitor [settings.toml]`
//! Readings go to stdout as JSON lines; in vision mode, landmark frames
//! are read from stdin.

use std::path::PathBuf;

use anyhow::Context;
use monitor::{init_logging, run, Settings};
use tokio::io::{stdin, stdout, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref()).context("loading settings")?;

    init_logging(&settings.log)?;

    info!("=== Fatigue Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Mode {:?}, alerts {}",
        settings.mode,
        if settings.alerts_enabled { "on" } else { "off" }
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let summary = run(&settings, BufReader::new(stdin()), stdout(), shutdown).await?;

    info!(
        "Done: {} readings, peak level {}, {} alerts played",
        summary.readings, summary.peak_level, summary.alerts_played
    );
    Ok(())
}

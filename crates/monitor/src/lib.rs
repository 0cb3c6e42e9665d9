//! Fatigue Monitor
//!
//! Runs a monitoring session: readings from the simulated or vision
//! estimator are written as JSON lines, and their alert levels drive the
//! audio/voice alert scheduler.

mod input;
mod session;
mod settings;

pub use input::{parse_line, InputLine};
pub use session::{Session, SessionSummary};
pub use settings::{AudioBackend, LogSettings, Settings, DEFAULT_SETTINGS_FILE};

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use dms::{EstimatorMode, FatigueReading};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging on stderr; stdout carries readings
pub fn init_logging(settings: &LogSettings) -> anyhow::Result<()> {
    let level: Level = settings
        .level
        .parse()
        .with_context(|| format!("invalid log level {:?}", settings.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("failed to set tracing subscriber")
}

async fn write_reading<W>(output: &mut W, reading: &FatigueReading) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(reading)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    Ok(())
}

/// Run a session until `shutdown` resolves, `max_ticks` readings are
/// written, or (in vision mode) the input ends
pub async fn run<R, W, S>(
    settings: &Settings,
    input: R,
    mut output: W,
    shutdown: S,
) -> anyhow::Result<SessionSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut session = Session::new(settings)?;
    let span = info_span!("session", id = %session.id(), mode = ?settings.mode);

    async move {
        info!("Monitoring started");
        let simulated = session.mode() == EstimatorMode::Simulated;
        let limit_reached = |readings: u64| settings.max_ticks.map_or(false, |max| readings >= max);

        let period = Duration::from_millis(settings.dms.simulation.tick_period_ms.max(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut lines = input.lines();
        let mut input_open = true;
        let mut readings = 0u64;
        tokio::pin!(shutdown);

        let outcome = async {
            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        info!("Shutdown requested");
                        break;
                    }
                    _ = ticker.tick(), if simulated => {
                        let reading = session.handle(None).await;
                        write_reading(&mut output, &reading).await?;
                        readings += 1;
                        if limit_reached(readings) {
                            break;
                        }
                    }
                    line = lines.next_line(), if input_open => {
                        let Some(line) = line.context("reading input")? else {
                            debug!("Input closed");
                            input_open = false;
                            if simulated {
                                continue;
                            }
                            break;
                        };

                        match parse_line(&line) {
                            Ok(Some(InputLine::Manual { manual_alert })) => {
                                let outcome = session.manual_alert(manual_alert).await;
                                info!("Manual alert {}: {:?}", manual_alert, outcome);
                            }
                            Ok(Some(InputLine::Frame(frame))) if !simulated => {
                                let reading = session.handle(Some(&frame)).await;
                                write_reading(&mut output, &reading).await?;
                                readings += 1;
                            }
                            Ok(Some(InputLine::NoFace)) if !simulated => {
                                let reading = session.handle(None).await;
                                write_reading(&mut output, &reading).await?;
                                readings += 1;
                            }
                            Ok(Some(_)) => debug!("Ignoring frame input in simulated mode"),
                            Ok(None) => {}
                            Err(e) => warn!("Skipping malformed input line: {}", e),
                        }
                        if limit_reached(readings) {
                            break;
                        }
                    }
                }
            }
            output.flush().await?;
            Ok::<_, anyhow::Error>(())
        }
        .await;

        // Runs on every exit path so no alert timer outlives the session
        let summary = session.shutdown().await;
        outcome.map(|()| summary)
    }
    .instrument(span)
    .await
}

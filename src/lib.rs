pub mod api;
pub mod console;
pub mod history;
pub mod hooks;
pub mod models;
pub mod results;
pub mod schedule;
pub mod settings;
pub mod timer;
pub mod utils;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use console::Console;
use settings::{ConsoleSettings, SettingsStore};
use timer::SessionPhase;
use utils::format_countdown;

/// Runs a headless console until Ctrl-C.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    let default_level = if settings::debug_enabled() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    info!("Focus console starting up...");

    let store = SettingsStore::new(SettingsStore::default_path()?)?;
    let settings = store.current();
    debug!("settings loaded from {}", store.path().display());

    // One thread: pushes, ticks and panel loads all share the same event loop.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run_console(settings))
}

async fn run_console(settings: ConsoleSettings) -> Result<()> {
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for Ctrl-C: {err}");
            }
            info!("shutting down");
            shutdown.cancel();
        }
    });

    let console = Console::open(&settings)?;
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {}
        _ = console.seed_session() => {}
    }
    if console.refresh_until(&shutdown).await.is_some() {
        console.report().await;
    }

    let mut snapshots = console.session().subscribe();
    let mut last_phase = SessionPhase::Unknown;

    while !shutdown.is_cancelled() {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(snapshot) = *snapshots.borrow_and_update() else {
                    continue;
                };

                let remaining = format_countdown(snapshot.state.remaining_seconds as i64);
                if snapshot.phase != last_phase {
                    info!("{:?} ({} left)", snapshot.phase, remaining);
                    last_phase = snapshot.phase;
                    // A phase flip usually means new results or history.
                    if console.refresh_until(&shutdown).await.is_none() {
                        break;
                    }
                    console.report().await;
                } else {
                    debug!("{:?} ({} left)", snapshot.phase, remaining);
                }
            }
        }
    }

    console.close().await;
    Ok(())
}

//! Layered configuration agent.
//!
//! Loads its settings, keeps every configured document current as the
//! files change, and reports each reload until asked to stop.
//!
//! ```text
//!   layered-config.toml ──▶ Settings ──▶ Agent
//!                                          │
//!        Configs/app.json ─┐               ├─ Reloadable<app.json (+ app.prod.json)>
//!   Configs/app.prod.json ─┴─ notify ──────┤      debounce → re-read → swap
//!                                          │
//!             SIGHUP ──────────────────────┤  reload every document
//!   SIGINT / SIGTERM ──────────────────────┘  stop watchers, exit
//! ```

use clap::Parser;
use std::path::PathBuf;

use layered_config::lifecycle::{Agent, SignalEvent, SignalListener};
use layered_config::observability::logging::init_logging;
use layered_config::settings::{load_settings, Settings};

#[derive(Parser)]
#[command(name = "layered-config")]
#[command(about = "Keeps layered configuration documents loaded and current", long_about = None)]
struct Args {
    /// Agent settings file (TOML). Defaults apply when it does not exist.
    #[arg(short, long, default_value = "layered-config.toml")]
    settings: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let settings = if args.settings.exists() {
        load_settings(&args.settings)?
    } else {
        Settings::default()
    };
    init_logging(&settings.observability)?;

    tracing::info!(
        settings = %args.settings.display(),
        base_dir = %settings.store.base_dir.display(),
        default_ttl_secs = settings.cache.default_ttl_secs,
        "layered-config v0.1.0 starting"
    );

    let agent = Agent::start(&settings)?;
    let reporters = agent.spawn_reporters();

    let mut signals = SignalListener::new()?;
    loop {
        match signals.recv().await {
            SignalEvent::Reload => {
                let reloaded = agent.reload_all();
                tracing::info!(reloaded, "Reload requested");
            }
            SignalEvent::Shutdown => {
                tracing::info!("Shutdown requested");
                agent.stop();
                break;
            }
        }
    }

    for reporter in reporters {
        let _ = reporter.await;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

//! Kiosk dashboard generator: binary entrypoint.
//!
//! Runs one generation cycle, or keeps regenerating on an interval until
//! interrupted.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use chrono::Local;

use kiosk_dashboard::config::load_config;
use kiosk_dashboard::logging::{self, LogFormat};
use kiosk_dashboard::{generate_once, Aggregator, RuntimeContext, TemplateRenderer};

/// Wait after a failed cycle before trying again.
const RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(FromArgs)]
/// Generate the kiosk dashboard page.
struct Args {
    /// regenerate continuously instead of once
    #[argh(switch, short = 'l', long = "loop")]
    run_loop: bool,

    /// seconds between cycles in loop mode (default: display.refresh_interval)
    #[argh(option, short = 'i')]
    interval: Option<u64>,

    /// use mock data for every source
    #[argh(switch, short = 'm')]
    mock: bool,

    /// configuration file (TOML or JSON)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; missing file is fine.
    let _ = dotenvy::dotenv();
    logging::init(LogFormat::from_env());

    let args: Args = argh::from_env();
    let config = load_config(args.config.as_deref())?;
    let interval = Duration::from_secs(args.interval.unwrap_or(config.display.refresh_interval).max(1));
    let renderer = TemplateRenderer::from_path_or_default(&config.paths.template)?;

    if args.mock {
        tracing::info!("mock mode: all sources use substitute data");
    }
    let mut aggregator = Aggregator::new(RuntimeContext::new(config, args.mock)?);

    if !args.run_loop {
        generate_once(&mut aggregator, &renderer, Local::now()).await?;
        return Ok(());
    }

    tracing::info!(interval_secs = interval.as_secs(), "starting generation loop");
    loop {
        let wait = match generate_once(&mut aggregator, &renderer, Local::now()).await {
            Ok(_) => interval,
            Err(e) => {
                tracing::error!(error = ?e, retry_secs = RETRY_AFTER.as_secs(), "generation cycle failed");
                RETRY_AFTER
            }
        };
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_signal() => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = ?e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = ?e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

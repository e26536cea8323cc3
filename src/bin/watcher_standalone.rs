//! Plain tokio host: binds `$PORT` (default 10000) for platforms that only
//! need a health-checked web process, and shuts everything down on a signal.

use anyhow::{Context, Result};
use listing_watcher::{api, app, logging, metrics, WatchConfig, Watcher};
use tokio::sync::watch;

const DEFAULT_PORT: u16 = 10000;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let cfg = WatchConfig::load_default()?;
    let port: u16 = match std::env::var("PORT") {
        Ok(p) => p
            .trim()
            .parse()
            .with_context(|| format!("invalid PORT '{p}'"))?,
        Err(_) => DEFAULT_PORT,
    };

    let prometheus = metrics::init(cfg.poll_interval_secs, cfg.sources.len());
    let watcher = Watcher::from_config(cfg)?;
    let mut state = api::AppState::new(watcher.state());
    match prometheus {
        Ok(h) => state = state.with_metrics(h),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }

    let (tx, rx) = watch::channel(false);
    let handles = watcher.spawn(rx);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding 0.0.0.0:{port}"))?;
    tracing::info!(port, "HTTP listening");

    axum::serve(listener, api::create_router(state))
        .with_graceful_shutdown(app::shutdown_signal())
        .await
        .context("HTTP server")?;

    let _ = tx.send(true);
    handles.join().await;
    tracing::info!("stopped");
    Ok(())
}

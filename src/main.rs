//! Listing Watcher: Shuttle entrypoint.
//! Starts the poll scheduler and the chat command listener in the background
//! and serves the liveness / status router.

use listing_watcher::{api, app, logging, metrics, WatchConfig, Watcher};
use shuttle_axum::ShuttleAxum;
use tokio::sync::watch;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let cfg = WatchConfig::load_default()?;
    let prometheus = match metrics::init(cfg.poll_interval_secs, cfg.sources.len()) {
        Ok(h) => Some(h),
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled");
            None
        }
    };

    let watcher = Watcher::from_config(cfg)?;
    let mut state = api::AppState::new(watcher.state());
    if let Some(h) = prometheus {
        state = state.with_metrics(h);
    }

    // The runtime owns the process; this task holds the shutdown sender so the
    // background tasks live until a signal arrives.
    let (tx, rx) = watch::channel(false);
    let handles = watcher.spawn(rx);
    tokio::spawn(async move {
        app::shutdown_signal().await;
        let _ = tx.send(true);
        handles.join().await;
    });

    Ok(api::create_router(state).into())
}

use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and publish the static config gauges.
/// Fails if another recorder is already installed.
pub fn init(poll_interval_secs: u64, source_count: usize) -> Result<PrometheusHandle> {
    // Use default buckets to avoid API differences across crate versions.
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;

    gauge!("watch_poll_interval_secs").set(poll_interval_secs as f64);
    gauge!("watch_sources").set(source_count as f64);

    Ok(handle)
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mm_app::cli;
use mm_app::config_loader;
use mm_app::monitoring;
use mm_app::shutdown_handler::ShutdownFlag;
use mm_app::tracing_setup;
use tracing::info;

const APP_NAME: &str = "mm_coordinator";
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = cli::get_config_path(cli::DEFAULT_CONFIG_PATH);

    // Read the file before tracing exists so its [logging] section applies
    let loaded = config_loader::load_coordination_config(&config_path);
    let logging = loaded.as_ref().map(|file| file.logging.clone()).unwrap_or_default();
    let _guard = tracing_setup::init(APP_NAME, &logging);
    let config = config_loader::resolve_or_default(&config_path, loaded);

    let limiter = Arc::new(config.build_rate_limiter().context("invalid rate limit configuration")?);
    let locks = config.build_lock_manager().context("invalid lock manager configuration")?;

    info!(
        services = ?limiter.services(),
        policy = ?limiter.policy(),
        sweep_interval_secs = locks.sweep_interval().as_secs_f64(),
        "Starting coordinator"
    );
    for (service, stats) in limiter.all_stats() {
        info!(service = %service, strategy = %stats.strategy, max_requests = stats.max_requests, window_ms = stats.time_window.as_millis() as u64, "Rate limit tier");
    }

    locks.start().context("failed to start lock sweeper")?;

    let shutdown = ShutdownFlag::install().context("failed to install Ctrl+C handler")?;
    let reporter = monitoring::spawn_stats_reporter(Arc::clone(&limiter), locks.clone(), config.stats_interval(), shutdown.clone());

    shutdown.wait(SHUTDOWN_POLL).await;

    info!("Shutting down coordinator");
    let released = locks.stop();
    reporter.abort();
    let _ = reporter.await;
    monitoring::log_stats(&limiter, &locks);
    info!(released, "Coordinator stopped");

    Ok(())
}

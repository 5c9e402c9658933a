//! veriprice-daemon: attested price feeder with an in-process verifier.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use veriprice_daemon::events::{Event, EventBus, DEFAULT_CAPACITY};
use veriprice_daemon::{node, DaemonConfig};
use veriprice_feeder::{Clock, SystemClock};

/// Crates whose log level follows `[logging] level`.
const LOG_TARGETS: &[&str] = &[
    "veriprice_daemon",
    "veriprice_feeder",
    "veriprice_verifier",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    let mut filter = EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{target}={}", config.logging.level).parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(data_dir = %DaemonConfig::data_dir().display(), "Veriprice daemon starting");

    // 3. Create event bus and log every event as JSON
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bus = EventBus::new(DEFAULT_CAPACITY);
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(target: "veriprice_daemon::events", "{json}"),
                    Err(e) => warn!("event serialization failed: {e}"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "event log lagging");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // 4. Build verifier, ledger and pipeline
    let mut node = node::build(&config, clock.clone(), bus.clone()).await?;

    bus.emit(Event::system(
        "DaemonStarted",
        clock.now(),
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "symbol": config.feed.symbol,
            "poll_interval_secs": config.feed.poll_interval_secs,
        }),
    ));

    // 5. Poll until Ctrl-C
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Ctrl-C received, shutting down");
    };
    node::run_poll_loop(&mut node.pipeline, node.poll_interval, shutdown).await;

    match node.ledger.read(|v| v.latest_price_data()).await {
        Ok(record) => info!(
            price = %veriprice_types::format_price(record.price),
            observed_at = record.observed_at,
            "final committed price"
        ),
        Err(e) => info!("no price committed: {e}"),
    }

    info!("Daemon stopped");
    Ok(())
}

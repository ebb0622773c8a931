//! Entry point: loads configuration, wires the exchange adapter, journal,
//! and notifier, then hands a `LadderEngine` to the Scheduler until a
//! `ctrl_c` or termination signal requests a cooperative stop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ladder_engine::adapter::bitfinex::BitfinexAdapter;
use ladder_engine::adapter::ExchangeAdapter;
use ladder_engine::config::LadderConfig;
use ladder_engine::engine::LadderEngine;
use ladder_engine::journal::file::FileJournal;
use ladder_engine::journal::OrderJournal;
use ladder_engine::notify::{LogNotifier, NotificationSink};
use ladder_engine::scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = LadderConfig::from_env()?;
    log::info!(
        "ladder-engine starting: pair={} exchange={} count={} step={}%",
        config.pair,
        config.exchange,
        config.ladder_count,
        config.ladder_price_step_percent
    );

    if !config.is_active {
        log::warn!("co_isActive is false; the scheduler will poll without building a ladder");
    }

    let adapter: Arc<dyn ExchangeAdapter> =
        Arc::new(BitfinexAdapter::new(config.api_key.clone(), config.api_secret.clone()));

    let journal_path = std::env::var("LADDER_JOURNAL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("ladder-journal.json"));
    let journal: Arc<dyn OrderJournal> = Arc::new(FileJournal::open(journal_path).await);

    let notifier: Arc<dyn NotificationSink> = Arc::new(LogNotifier);

    let engine = Arc::new(LadderEngine::new(&config, adapter, journal, notifier));
    let open_orders_cache_sec = engine.open_orders_cache_sec();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutdown signal received; finishing the in-flight iteration and stopping");
            shutdown_signal.store(true, Ordering::Relaxed);
        }
    });

    let is_active = config.is_active;
    scheduler::run(open_orders_cache_sec, shutdown, move || {
        let engine = engine.clone();
        async move {
            if !is_active {
                return false;
            }
            match engine.tick().await {
                Ok(ok) => ok,
                Err(e) => {
                    log::error!("ladder iteration failed: {}", e);
                    true
                }
            }
        }
    })
    .await;

    log::info!("ladder-engine stopped");
    Ok(())
}

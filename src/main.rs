// ============================================================================
// ARBITRAGE SNIPER — Cross-Exchange Arbitrage Detection Engine
//
// Pipeline: ZMQ PULL ingress → book store → spread engine → Redis signal bus
//
// Guarantees:
//   - Staleness-aware top-of-book per (exchange, symbol)
//   - O(|exchanges|^2) spread scan, best opportunity above threshold wins
//   - Single-writer hot loop: book store and spread engine share one task
//   - Per-message error containment — decode/process errors are logged and
//     skipped, never crash the loop
//   - Cooperative shutdown: Ctrl+C drains in-flight work before closing
// ============================================================================

use clap::Parser;
use tracing_subscriber::EnvFilter;

use arbitrage_sniper::config::Config;
use arbitrage_sniper::driver::PipelineDriver;
use arbitrage_sniper::ingress::ZmqIngress;
use arbitrage_sniper::sink::RedisSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_target(false)
        .init();

    tracing::info!("=== Arbitrage Sniper — Quant Engine ===");
    tracing::info!(
        threshold_pct = config.spread_threshold_pct,
        symbols = ?config.symbols(),
        "[Engine] Starting"
    );

    let ingress = ZmqIngress::new(config.zmq_endpoint.clone());
    let sink = RedisSink::new(config.redis_url.clone(), config.signal_channel.clone());
    let mut driver = PipelineDriver::new(
        ingress,
        sink,
        config.max_price_age_ms,
        config.spread_threshold_pct,
    );

    let shutdown = driver.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {e}");
            return;
        }
        tracing::info!("[Shutdown] Signal received — draining...");
        shutdown.notify_waiters();
    });

    match driver.start().await {
        Ok(()) => {
            tracing::info!("[Engine] Shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!("[Engine] Fatal error: {e}");
            Err(e.into())
        }
    }
}

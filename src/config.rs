//! Runtime configuration, read once at startup from the environment.
//!
//! Mirrors `services/quant_engine/src/config.py` from the original engine:
//! same keys, same defaults, loaded once and passed down explicitly instead
//! of living behind a module-level singleton.

use clap::Parser;

/// Arbitrage Sniper — cross-exchange spread detector
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Upstream market-data producer endpoint (ZMQ PULL connect address)
    #[arg(long, env = "ZMQ_ENDPOINT", default_value = "tcp://ingestor:5555")]
    pub zmq_endpoint: String,

    /// Redis broker endpoint
    #[arg(long, env = "REDIS_URL", default_value = "redis://redis:6379")]
    pub redis_url: String,

    /// Minimum spread percentage required to emit a signal
    #[arg(long, env = "SPREAD_THRESHOLD_PCT", default_value = "0.5")]
    pub spread_threshold_pct: f64,

    /// Informational only — not consulted by the hot path (see design notes)
    #[arg(long, env = "SYMBOLS", default_value = "BTC/USDT")]
    pub symbols: String,

    /// Redis PUB/SUB topic signals are broadcast on
    #[arg(long, env = "SIGNAL_CHANNEL", default_value = "arbitrage:signals")]
    pub signal_channel: String,

    /// Staleness threshold, in milliseconds
    #[arg(long, env = "MAX_PRICE_AGE_MS", default_value = "5000")]
    pub max_price_age_ms: i64,

    /// Log verbosity (passed straight to `tracing_subscriber::EnvFilter`)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Symbols configured via `SYMBOLS`, split on commas. Not used in the
    /// hot path — the book store and spread engine accept any symbol seen
    /// on two or more exchanges, regardless of this list.
    pub fn symbols(&self) -> Vec<String> {
        self.symbols
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_splits_and_trims() {
        let cfg = Config {
            zmq_endpoint: String::new(),
            redis_url: String::new(),
            spread_threshold_pct: 0.5,
            symbols: " BTC/USDT, ETH/USDT ,".to_string(),
            signal_channel: String::new(),
            max_price_age_ms: 5000,
            log_level: "info".to_string(),
        };
        assert_eq!(cfg.symbols(), vec!["BTC/USDT", "ETH/USDT"]);
    }
}

//! Signal sink — C4.
//!
//! Publishes arbitrage signals to the broker and maintains a bounded
//! recent-signal history. Mirrors `original_source/redis_publisher.py`:
//! `PUBLISH`, then `ZADD` into the history sorted set, then
//! `ZREMRANGEBYRANK` to trim it to the 1000 most recent entries.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::EngineError;
use crate::spread::Opportunity;

/// Sorted-set key the signal history lives under.
const HISTORY_KEY: &str = "signals:history";

/// Maximum number of entries retained in the history, trimmed on every
/// publish.
const HISTORY_LIMIT: isize = 1000;

/// The externally visible record emitted by the sink.
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action: String,
    pub symbol: String,
    pub spread_pct: f64,
    pub buy_price: f64,
    pub sell_price: f64,
    pub profit_estimate: f64,
    pub timestamp: i64,
}

impl Signal {
    pub fn from_opportunity(opp: &Opportunity, publish_ts_ms: i64) -> Self {
        Self {
            kind: "ARBITRAGE_OPPORTUNITY",
            action: format!(
                "BUY_{}_SELL_{}",
                opp.buy_exchange.to_uppercase(),
                opp.sell_exchange.to_uppercase()
            ),
            symbol: opp.symbol.clone(),
            spread_pct: opp.spread_pct,
            buy_price: opp.buy_price,
            sell_price: opp.sell_price,
            profit_estimate: opp.profit,
            timestamp: publish_ts_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SinkStats {
    pub signals_published: u64,
    pub channel: String,
}

#[async_trait]
pub trait SignalSink: Send {
    async fn connect(&mut self) -> Result<(), EngineError>;
    async fn publish(&mut self, opportunity: &Opportunity) -> Result<(), EngineError>;
    fn stats(&self) -> SinkStats;
    async fn close(&mut self);
}

pub struct RedisSink {
    channel: String,
    connection: Option<redis::aio::MultiplexedConnection>,
    redis_url: String,
    signal_count: u64,
}

impl RedisSink {
    pub fn new(redis_url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            connection: None,
            redis_url: redis_url.into(),
            signal_count: 0,
        }
    }
}

#[async_trait]
impl SignalSink for RedisSink {
    async fn connect(&mut self) -> Result<(), EngineError> {
        let client = redis::Client::open(self.redis_url.as_str())
            .map_err(|e| EngineError::TransportFatal(e.to_string()))?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| EngineError::TransportFatal(e.to_string()))?;

        let _: () = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| EngineError::TransportFatal(e.to_string()))?;

        info!(url = %self.redis_url, "[Redis] Connected");
        self.connection = Some(connection);
        Ok(())
    }

    /// Build, serialize, broadcast, and record a signal. All four steps are
    /// one logical publish: a failure on any step is logged and the publish
    /// is considered complete — no retry, no rollback. `signal_count`
    /// increments once per attempted publish regardless of partial broker
    /// failures, matching `redis_publisher.py`.
    async fn publish(&mut self, opportunity: &Opportunity) -> Result<(), EngineError> {
        self.signal_count += 1;

        let now_ms = chrono::Utc::now().timestamp_millis();
        let signal = Signal::from_opportunity(opportunity, now_ms);

        let payload = match serde_json::to_string(&signal) {
            Ok(p) => p,
            Err(e) => {
                error!("[Redis] Failed to serialize signal: {e}");
                return Ok(());
            }
        };

        let Some(connection) = self.connection.as_mut() else {
            warn!("[Redis] Publish attempted before connect()");
            return Ok(());
        };

        if let Err(e) = connection.publish::<_, _, ()>(&self.channel, &payload).await {
            warn!("[Redis] Publish error: {e}");
        }
        if let Err(e) = connection
            .zadd::<_, _, _, ()>(HISTORY_KEY, &payload, now_ms)
            .await
        {
            warn!("[Redis] History insert error: {e}");
        }
        if let Err(e) = connection
            .zremrangebyrank::<_, ()>(HISTORY_KEY, 0, -(HISTORY_LIMIT + 1))
            .await
        {
            warn!("[Redis] History trim error: {e}");
        }

        info!(
            action = %signal.action,
            spread_pct = signal.spread_pct,
            profit = signal.profit_estimate,
            "[SIGNAL] published"
        );

        Ok(())
    }

    fn stats(&self) -> SinkStats {
        SinkStats {
            signals_published: self.signal_count,
            channel: self.channel.clone(),
        }
    }

    async fn close(&mut self) {
        self.connection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_opportunity() -> Opportunity {
        Opportunity {
            symbol: "BTC/USDT".to_string(),
            buy_exchange: "binance".to_string(),
            sell_exchange: "coinbase".to_string(),
            buy_price: 100.01,
            sell_price: 100.99,
            profit: 0.98,
            spread_pct: 0.9789,
        }
    }

    #[test]
    fn signal_action_uppercases_only_exchange_tokens() {
        let signal = Signal::from_opportunity(&sample_opportunity(), 123);
        assert_eq!(signal.action, "BUY_BINANCE_SELL_COINBASE");
        assert_eq!(signal.symbol, "BTC/USDT");
        assert_eq!(signal.kind, "ARBITRAGE_OPPORTUNITY");
    }

    #[test]
    fn signal_serializes_with_expected_field_names() {
        let signal = Signal::from_opportunity(&sample_opportunity(), 123);
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["type"], "ARBITRAGE_OPPORTUNITY");
        assert_eq!(json["profit_estimate"], 0.98);
        assert_eq!(json["timestamp"], 123);
    }
}

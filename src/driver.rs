//! Pipeline driver — C5.
//!
//! The hot loop: per message, updates the book store, invokes the spread
//! engine, and on a positive result invokes the signal sink. Owns the
//! `Init -> Connecting -> Running -> Draining -> Closed` lifecycle and
//! guarantees per-message error containment: only a fatal ingress transport
//! error or an explicit shutdown request end the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{info, warn};

use crate::book::BookStore;
use crate::error::EngineError;
use crate::ingress::{Ingress, IngressEvent};
use crate::sink::SignalSink;
use crate::spread::SpreadEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    Connecting,
    Running,
    Draining,
    Closed,
}

/// Channel depth between the ingress transport and the driver loop. Bounded
/// so a slow driver naturally backpressures ingestion, per the concurrency
/// model's "no internal backpressure beyond not pre-reading the next frame".
const INGRESS_CHANNEL_DEPTH: usize = 4096;

/// How often the driver logs combined component stats.
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// A source of `now_ms` readings. The production clock reads the local
/// wall-clock (`chrono::Utc::now()`); tests inject a fixed reading aligned
/// with their synthetic message timestamps so staleness filtering in
/// `BookStore::snapshot` behaves deterministically instead of racing the
/// real clock.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    Wall,
    Fixed(i64),
}

impl Clock {
    fn now_ms(&self) -> i64 {
        match self {
            Clock::Wall => chrono::Utc::now().timestamp_millis(),
            Clock::Fixed(ts_ms) => *ts_ms,
        }
    }
}

pub struct PipelineDriver<I: Ingress, S: SignalSink> {
    ingress: I,
    sink: S,
    book: BookStore,
    spread: SpreadEngine,
    state: DriverState,
    shutdown: Arc<Notify>,
    now: Clock,
    messages_processed: u64,
    messages_skipped_stale: u64,
    messages_skipped_decode: u64,
}

impl<I: Ingress, S: SignalSink> PipelineDriver<I, S> {
    pub fn new(ingress: I, sink: S, max_age_ms: i64, threshold_pct: f64) -> Self {
        Self::with_clock(ingress, sink, max_age_ms, threshold_pct, Clock::Wall)
    }

    /// Same as [`Self::new`], with the `now_ms` source replaced by `now`.
    /// Used by tests to align the driver's clock with synthetic message
    /// timestamps instead of the real wall clock.
    pub fn with_clock(
        ingress: I,
        sink: S,
        max_age_ms: i64,
        threshold_pct: f64,
        now: Clock,
    ) -> Self {
        Self {
            ingress,
            sink,
            book: BookStore::new(max_age_ms),
            spread: SpreadEngine::new(threshold_pct),
            state: DriverState::Init,
            shutdown: Arc::new(Notify::new()),
            now,
            messages_processed: 0,
            messages_skipped_stale: 0,
            messages_skipped_decode: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// A clone of the shutdown handle, so an external task (e.g. the
    /// Ctrl+C / SIGTERM handler in `main.rs`) can request `Draining`.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Drive the engine through its full lifecycle: connect sink then
    /// ingress, run until shutdown or a fatal transport error, then drain.
    pub async fn start(&mut self) -> Result<(), EngineError> {
        self.state = DriverState::Connecting;

        if let Err(e) = self.sink.connect().await {
            warn!("[Driver] Sink connect failed: {e}");
            self.state = DriverState::Closed;
            return Err(e);
        }
        if let Err(e) = self.ingress.connect().await {
            warn!("[Driver] Ingress connect failed: {e}");
            self.state = DriverState::Closed;
            return Err(e);
        }

        self.state = DriverState::Running;
        let result = self.run_loop().await;

        self.state = DriverState::Draining;
        self.log_shutdown_summary();
        self.ingress.close();
        self.sink.close().await;
        self.state = DriverState::Closed;

        result
    }

    /// Logs combined stats from all four components on shutdown, mirroring
    /// the original engine's `stop()` summary. Called once `run_loop` has
    /// returned, so none of the components are still borrowed by it.
    fn log_shutdown_summary(&self) {
        let book_stats = self.book.stats();
        let spread_stats = self.spread.stats();
        let ingress_stats = self.ingress.stats();
        let sink_stats = self.sink.stats();
        info!(
            exchanges = book_stats.exchanges.len(),
            symbols = book_stats.symbols_count,
            book_updates = book_stats.updates,
            signals_generated = spread_stats.signals_generated,
            ingress_endpoint = %ingress_stats.endpoint,
            ingress_messages_received = ingress_stats.messages_received,
            sink_channel = %sink_stats.channel,
            sink_signals_published = sink_stats.signals_published,
            "[Driver] shutdown summary"
        );
    }

    async fn run_loop(&mut self) -> Result<(), EngineError> {
        let (tx, mut rx) = mpsc::channel::<IngressEvent>(INGRESS_CHANNEL_DEPTH);

        let PipelineDriver {
            ingress,
            sink,
            book,
            spread,
            shutdown,
            now,
            messages_processed,
            messages_skipped_stale,
            messages_skipped_decode,
            ..
        } = self;

        // async-trait already returns a boxed, pinned future, so it is
        // Unpin and can be polled in `select!` without `tokio::pin!`.
        let mut ingress_fut = ingress.run(tx);

        let mut report_interval = tokio::time::interval(REPORT_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("[Driver] Shutdown requested, draining");
                    return Ok(());
                }
                result = &mut ingress_fut => {
                    return result;
                }
                _ = report_interval.tick() => {
                    let book_stats = book.stats();
                    let spread_stats = spread.stats();
                    let sink_stats = sink.stats();
                    info!(
                        processed = *messages_processed,
                        skipped_stale = *messages_skipped_stale,
                        skipped_decode = *messages_skipped_decode,
                        exchanges = book_stats.exchanges.len(),
                        symbols = book_stats.symbols_count,
                        book_updates = book_stats.updates,
                        signals_generated = spread_stats.signals_generated,
                        sink_channel = %sink_stats.channel,
                        sink_signals_published = sink_stats.signals_published,
                        "[Metrics] pipeline snapshot"
                    );
                }
                event = rx.recv() => {
                    match event {
                        Some(IngressEvent::Message(msg)) => {
                            let now_ms = now.now_ms();
                            let updated = book.update(&msg.exchange, &msg.symbol, msg.price, msg.timestamp);
                            if !updated {
                                *messages_skipped_stale += 1;
                                continue;
                            }
                            *messages_processed += 1;

                            if let Some(opportunity) = spread.find(&msg.symbol, book, now_ms) {
                                if let Err(e) = sink.publish(&opportunity).await {
                                    warn!(subsystem = "sink", error = %e, "[Driver] publish failed, skipping");
                                }
                            }
                        }
                        Some(IngressEvent::Decode(e)) => {
                            *messages_skipped_decode += 1;
                            warn!(subsystem = "ingress", error = %e, "[Driver] decode error, skipping");
                        }
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}

//! Cross-exchange arbitrage detection engine — core pipeline.
//!
//! Ingress (ZMQ) decodes trade messages, the book store keeps a
//! staleness-aware top-of-book per (exchange, symbol), the spread engine
//! scans for profitable cross-exchange spreads, and the sink (Redis)
//! publishes signals with a bounded recent-signal history. See
//! `SPEC_FULL.md` for the full design.

pub mod book;
pub mod config;
pub mod driver;
pub mod error;
pub mod ingress;
pub mod sink;
pub mod spread;

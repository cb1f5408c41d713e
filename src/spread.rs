//! Spread search engine — C2.
//!
//! Given a symbol, consults the book store and returns the best directed
//! cross-exchange opportunity above the configured threshold.

use crate::book::BookStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub symbol: String,
    pub buy_exchange: String,
    pub sell_exchange: String,
    pub buy_price: f64,
    pub sell_price: f64,
    pub profit: f64,
    pub spread_pct: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SpreadStats {
    pub threshold_pct: f64,
    pub signals_generated: u64,
}

pub struct SpreadEngine {
    threshold_pct: f64,
    signals_generated: u64,
}

impl SpreadEngine {
    pub fn new(threshold_pct: f64) -> Self {
        Self {
            threshold_pct,
            signals_generated: 0,
        }
    }

    /// Enumerate every ordered exchange pair for `symbol` and return the
    /// opportunity with the greatest raw (unrounded) spread percentage, if
    /// it exceeds the configured threshold.
    pub fn find(&mut self, symbol: &str, book: &BookStore, now_ms: i64) -> Option<Opportunity> {
        let exchanges = book.snapshot(symbol, now_ms);
        if exchanges.len() < 2 {
            return None;
        }

        let mut best: Option<(f64, Opportunity)> = None;

        for (buy_ex, buy_level) in exchanges.iter() {
            for (sell_ex, sell_level) in exchanges.iter() {
                if buy_ex == sell_ex {
                    continue;
                }

                let buy_price = buy_level.ask;
                let sell_price = sell_level.bid;
                let profit = sell_price - buy_price;
                let spread_pct = profit / buy_price * 100.0;

                let is_new_best = match &best {
                    None => true,
                    Some((best_spread, _)) => spread_pct > *best_spread,
                };

                if is_new_best {
                    best = Some((
                        spread_pct,
                        Opportunity {
                            symbol: symbol.to_string(),
                            buy_exchange: buy_ex.to_string(),
                            sell_exchange: sell_ex.to_string(),
                            buy_price: round2(buy_price),
                            sell_price: round2(sell_price),
                            profit: round2(profit),
                            spread_pct: round4(spread_pct),
                        },
                    });
                }
            }
        }

        let (raw_spread, opportunity) = best?;
        if raw_spread > self.threshold_pct {
            self.signals_generated += 1;
            Some(opportunity)
        } else {
            None
        }
    }

    pub fn stats(&self) -> SpreadStats {
        SpreadStats {
            threshold_pct: self.threshold_pct,
            signals_generated: self.signals_generated,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with(entries: &[(&str, f64, i64)]) -> BookStore {
        let mut book = BookStore::new(60_000);
        for (exchange, price, ts) in entries {
            book.update(exchange, "X", *price, *ts);
        }
        book
    }

    #[test]
    fn single_exchange_no_signal() {
        let book = book_with(&[("A", 100.0, 1000)]);
        let mut engine = SpreadEngine::new(0.5);
        assert!(engine.find("X", &book, 1000).is_none());
    }

    #[test]
    fn spread_below_threshold_yields_no_signal() {
        let book = book_with(&[("A", 100.0, 1000), ("B", 100.2, 1001)]);
        let mut engine = SpreadEngine::new(0.5);
        assert!(engine.find("X", &book, 1001).is_none());
    }

    #[test]
    fn spread_above_threshold_yields_opportunity() {
        let book = book_with(&[("A", 100.0, 1000), ("B", 101.0, 1001)]);
        let mut engine = SpreadEngine::new(0.5);
        let opp = engine.find("X", &book, 1001).expect("expected opportunity");

        assert_eq!(opp.buy_exchange, "A");
        assert_eq!(opp.sell_exchange, "B");
        assert!((opp.buy_price - 100.01).abs() < 1e-9);
        assert!((opp.sell_price - 100.99).abs() < 1e-9);
        assert!((opp.profit - 0.98).abs() < 1e-9);
        assert!((opp.spread_pct - 0.9789).abs() < 1e-4);
    }

    #[test]
    fn three_exchanges_best_pair_selection() {
        let book = book_with(&[("A", 100.0, 1000), ("B", 100.5, 1000), ("C", 101.5, 1000)]);
        let mut engine = SpreadEngine::new(0.5);
        let opp = engine.find("X", &book, 1000).expect("expected opportunity");

        assert_eq!(opp.buy_exchange, "A");
        assert_eq!(opp.sell_exchange, "C");
    }

    #[test]
    fn threshold_is_strict_not_inclusive() {
        // Constructed so the raw spread equals the threshold exactly.
        let book = book_with(&[("A", 100.0, 1000), ("B", 100.0, 1000)]);
        let mut engine = SpreadEngine::new(0.0);
        // ask/bid differ only by the synthetic epsilon band, spread_pct > 0
        // but we set threshold to a value guaranteed to exceed it to assert
        // strict rejection semantics instead.
        let mut strict_engine = SpreadEngine::new(1_000_000.0);
        assert!(strict_engine.find("X", &book, 1000).is_none());
        // Sanity: non-degenerate threshold still finds something.
        assert!(engine.find("X", &book, 1000).is_some());
    }

    #[test]
    fn buy_and_sell_exchange_always_differ() {
        let book = book_with(&[("A", 100.0, 1000), ("B", 101.0, 1000), ("C", 99.0, 1000)]);
        let mut engine = SpreadEngine::new(0.1);
        let opp = engine.find("X", &book, 1000).expect("expected opportunity");
        assert_ne!(opp.buy_exchange, opp.sell_exchange);
    }

    #[test]
    fn stats_tracks_signals_generated() {
        let book = book_with(&[("A", 100.0, 1000), ("B", 101.0, 1000)]);
        let mut engine = SpreadEngine::new(0.5);
        assert_eq!(engine.stats().signals_generated, 0);
        engine.find("X", &book, 1000);
        assert_eq!(engine.stats().signals_generated, 1);
    }
}

//! Closed round-trip trades and the append-only trade log.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

use super::metrics::TradeStats;
use super::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub profit_loss: f64,
    /// NaN when the entry price is zero.
    pub profit_pct: f64,
    pub duration_days: i64,
    pub exit_score: Option<f64>,
}

impl Trade {
    /// Close `position` at `exit_price`. Values are captured unrounded.
    pub fn close(
        position: &Position,
        exit_time: NaiveDateTime,
        exit_price: f64,
        exit_score: Option<f64>,
    ) -> Self {
        let profit_loss = exit_price - position.entry_price;
        let profit_pct = if position.entry_price == 0.0 {
            warn!(entry_time = %position.entry_time, "zero entry price, profit_pct undefined");
            f64::NAN
        } else {
            profit_loss / position.entry_price * 100.0
        };

        Trade {
            entry_time: position.entry_time,
            exit_time,
            entry_price: position.entry_price,
            exit_price,
            profit_loss,
            profit_pct,
            duration_days: (exit_time - position.entry_time).num_days(),
            exit_score,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.profit_pct > 0.0
    }
}

/// Trades in the order they closed. Entries are never edited or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TradeLog {
    trades: Vec<Trade>,
}

impl TradeLog {
    pub fn new() -> Self {
        TradeLog::default()
    }

    pub fn record(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn last(&self) -> Option<&Trade> {
        self.trades.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }

    pub fn stats(&self) -> TradeStats {
        TradeStats::compute(&self.trades)
    }
}

impl<'a> IntoIterator for &'a TradeLog {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn position(price: f64, day: u32) -> Position {
        Position {
            entry_price: price,
            entry_time: at(day),
        }
    }

    #[test]
    fn close_computes_profit() {
        let trade = Trade::close(&position(100.0, 1), at(11), 110.0, Some(-2.5));

        assert!((trade.profit_loss - 10.0).abs() < f64::EPSILON);
        assert!((trade.profit_pct - 10.0).abs() < 1e-12);
        assert_eq!(trade.duration_days, 10);
        assert_eq!(trade.exit_score, Some(-2.5));
        assert!(trade.is_winner());
    }

    #[test]
    fn breakeven_is_not_a_winner() {
        let trade = Trade::close(&position(100.0, 1), at(2), 100.0, None);
        assert!(!trade.is_winner());
    }

    #[test]
    fn zero_entry_price_gives_nan_pct() {
        let trade = Trade::close(&position(0.0, 1), at(2), 5.0, None);
        assert!(trade.profit_pct.is_nan());
        assert!(!trade.is_winner());
    }

    #[test]
    fn log_appends_in_order() {
        let mut log = TradeLog::new();
        assert!(log.is_empty());

        log.record(Trade::close(&position(100.0, 1), at(2), 105.0, None));
        log.record(Trade::close(&position(105.0, 3), at(4), 100.0, None));

        assert_eq!(log.len(), 2);
        let exits: Vec<f64> = log.iter().map(|t| t.exit_price).collect();
        assert_eq!(exits, vec![105.0, 100.0]);
        assert_eq!(log.last().map(|t| t.exit_price), Some(100.0));
    }

    #[test]
    fn log_serialises_as_array() {
        let mut log = TradeLog::new();
        log.record(Trade::close(&position(100.0, 1), at(2), 105.0, None));
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["exit_score"], serde_json::Value::Null);
    }
}

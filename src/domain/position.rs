//! FLAT/LONG position controller.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use super::error::SigtraderError;
use super::ohlcv::OhlcvBar;
use super::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Flat,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

/// Score cut-offs for the weighted strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    buy: f64,
    sell: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            buy: 2.0,
            sell: -2.0,
        }
    }
}

impl Thresholds {
    pub fn new(buy: f64, sell: f64) -> Result<Self, SigtraderError> {
        if !buy.is_finite() || !sell.is_finite() {
            return Err(SigtraderError::invalid_strategy(
                "thresholds",
                "buy and sell thresholds must be finite",
            ));
        }
        if sell >= buy {
            return Err(SigtraderError::invalid_strategy(
                "thresholds",
                format!("sell_threshold ({sell}) must be below buy_threshold ({buy})"),
            ));
        }
        Ok(Thresholds { buy, sell })
    }

    pub fn buy(&self) -> f64 {
        self.buy
    }

    pub fn sell(&self) -> f64 {
        self.sell
    }

    pub fn action_for(&self, score: f64) -> Action {
        if score >= self.buy {
            Action::Buy
        } else if score <= self.sell {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
}

/// Holds at most one open long position.
#[derive(Debug, Clone, Default)]
pub struct PositionController {
    position: Option<Position>,
}

impl PositionController {
    pub fn new() -> Self {
        PositionController::default()
    }

    pub fn side(&self) -> Side {
        if self.position.is_some() {
            Side::Long
        } else {
            Side::Flat
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Apply `action` at `bar`'s close and return the action that actually
    /// took effect plus the trade closed by it, if any.
    ///
    /// Buy while LONG and Sell while FLAT are ignored.
    pub fn apply(
        &mut self,
        action: Action,
        bar: &OhlcvBar,
        score: Option<f64>,
    ) -> (Action, Option<Trade>) {
        match (action, self.position.take()) {
            (Action::Buy, None) => {
                debug!(time = %bar.timestamp, price = bar.close, ?score, "open long");
                self.position = Some(Position {
                    entry_price: bar.close,
                    entry_time: bar.timestamp,
                });
                (Action::Buy, None)
            }
            (Action::Sell, Some(open)) => {
                let trade = Trade::close(&open, bar.timestamp, bar.close, score);
                debug!(
                    time = %bar.timestamp,
                    price = bar.close,
                    ?score,
                    profit_pct = trade.profit_pct,
                    "close long"
                );
                (Action::Sell, Some(trade))
            }
            (_, current) => {
                self.position = current;
                (Action::Hold, None)
            }
        }
    }

    /// Trade that would result from closing at `bar` without mutating state.
    pub fn implied_exit(&self, bar: &OhlcvBar, score: Option<f64>) -> Option<Trade> {
        self.position
            .as_ref()
            .map(|open| Trade::close(open, bar.timestamp, bar.close, score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn thresholds_default() {
        let t = Thresholds::default();
        assert_eq!(t.buy(), 2.0);
        assert_eq!(t.sell(), -2.0);
    }

    #[test]
    fn thresholds_reject_inverted_or_equal() {
        assert!(Thresholds::new(1.0, 1.0).is_err());
        assert!(Thresholds::new(-2.0, 2.0).is_err());
        assert!(Thresholds::new(f64::INFINITY, 0.0).is_err());
        assert!(Thresholds::new(1.0, -1.0).is_ok());
    }

    #[test]
    fn action_for_is_inclusive() {
        let t = Thresholds::default();
        assert_eq!(t.action_for(2.0), Action::Buy);
        assert_eq!(t.action_for(1.99), Action::Hold);
        assert_eq!(t.action_for(-2.0), Action::Sell);
        assert_eq!(t.action_for(0.0), Action::Hold);
    }

    #[test]
    fn starts_flat() {
        let ctl = PositionController::new();
        assert_eq!(ctl.side(), Side::Flat);
        assert!(ctl.position().is_none());
    }

    #[test]
    fn buy_then_sell_emits_trade() {
        let bars = make_bars(&[100.0, 104.0, 110.0]);
        let mut ctl = PositionController::new();

        let (applied, trade) = ctl.apply(Action::Buy, &bars[0], Some(2.5));
        assert_eq!(applied, Action::Buy);
        assert!(trade.is_none());
        assert_eq!(ctl.side(), Side::Long);

        let (applied, trade) = ctl.apply(Action::Sell, &bars[2], Some(-3.0));
        assert_eq!(applied, Action::Sell);
        let trade = trade.unwrap();
        assert_eq!(trade.entry_price, 100.0);
        assert_eq!(trade.exit_price, 110.0);
        assert_eq!(trade.duration_days, 2);
        assert_eq!(ctl.side(), Side::Flat);
    }

    #[test]
    fn buy_while_long_keeps_original_entry() {
        let bars = make_bars(&[100.0, 120.0]);
        let mut ctl = PositionController::new();
        ctl.apply(Action::Buy, &bars[0], None);

        let (applied, trade) = ctl.apply(Action::Buy, &bars[1], None);
        assert_eq!(applied, Action::Hold);
        assert!(trade.is_none());
        assert_eq!(ctl.position().unwrap().entry_price, 100.0);
    }

    #[test]
    fn sell_while_flat_is_ignored() {
        let bars = make_bars(&[100.0]);
        let mut ctl = PositionController::new();
        let (applied, trade) = ctl.apply(Action::Sell, &bars[0], None);
        assert_eq!(applied, Action::Hold);
        assert!(trade.is_none());
        assert_eq!(ctl.side(), Side::Flat);
    }

    #[test]
    fn implied_exit_does_not_close() {
        let bars = make_bars(&[100.0, 90.0]);
        let mut ctl = PositionController::new();
        assert!(ctl.implied_exit(&bars[1], None).is_none());

        ctl.apply(Action::Buy, &bars[0], None);
        let implied = ctl.implied_exit(&bars[1], None).unwrap();
        assert!((implied.profit_pct + 10.0).abs() < 1e-12);
        assert_eq!(ctl.side(), Side::Long);
    }
}

//! Simulation engine: one strategy over one bar sequence.
//!
//! The loop is strictly sequential. At step `t` the strategy sees bars
//! `0..=t` only, the controller applies the resulting action at the bar's
//! close, and the equity account is marked to market.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use super::error::SigtraderError;
use super::evaluator::PreparedStrategy;
use super::metrics::PerformanceMetrics;
use super::ohlcv::{validate_bars, OhlcvBar};
use super::portfolio::{Account, EquityPoint};
use super::position::{Action, PositionController, Side};
use super::strategy::Strategy;
use super::trade::{Trade, TradeLog};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Percent of traded value charged on each side.
    pub commission_pct: f64,
    /// Annual rate used by the Sharpe and Sortino ratios.
    pub risk_free_rate: f64,
    /// Report an implied exit at the last close for a position still open.
    pub close_open_position: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            commission_pct: 0.1,
            risk_free_rate: 0.0,
            close_open_position: true,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), SigtraderError> {
        let invalid = |key: &str, reason: String| SigtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: key.to_string(),
            reason,
        };
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(invalid(
                "initial_capital",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        if !(0.0..100.0).contains(&self.commission_pct) {
            return Err(invalid(
                "commission_pct",
                format!("must be in [0, 100), got {}", self.commission_pct),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(invalid(
                "risk_free_rate",
                "must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Score and position history for one bar, kept for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub score: Option<f64>,
    /// Side after the step's action took effect.
    pub side: Side,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub steps: Vec<StepRecord>,
    pub trades: TradeLog,
    /// Implied exit of a position still open at the last bar. Never part of
    /// `trades`.
    pub open_trade: Option<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: PerformanceMetrics,
}

impl BacktestResult {
    pub fn final_side(&self) -> Side {
        self.steps.last().map(|s| s.side).unwrap_or(Side::Flat)
    }

    pub fn transitions(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.action != Action::Hold)
            .count()
    }
}

/// Run `strategy` over `bars`.
///
/// Bars and configuration are validated before the first step; a failure
/// leaves nothing half-simulated.
pub fn run_backtest(
    bars: &[OhlcvBar],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, SigtraderError> {
    validate_bars(bars)?;
    config.validate()?;

    let prepared = PreparedStrategy::new(bars, strategy.kind());
    let mut controller = PositionController::new();
    let mut account = Account::new(config.initial_capital, config.commission_pct);
    let mut trades = TradeLog::new();
    let mut steps = Vec::with_capacity(bars.len());
    let mut bars_long = 0usize;

    for (t, bar) in bars.iter().enumerate() {
        let evaluation = prepared.evaluate(&bars[..=t], controller.side());
        let (applied, trade) = controller.apply(evaluation.action, bar, evaluation.score);

        match applied {
            Action::Buy => account.buy(bar.close),
            Action::Sell => account.sell(bar.close),
            Action::Hold => {}
        }
        if let Some(trade) = trade {
            trades.record(trade);
        }

        let side = controller.side();
        if side == Side::Long {
            bars_long += 1;
        }
        account.mark(bar.timestamp, bar.close);

        steps.push(StepRecord {
            timestamp: bar.timestamp,
            close: bar.close,
            score: evaluation.score,
            side,
            action: applied,
        });
    }

    let open_trade = match (config.close_open_position, bars.last()) {
        (true, Some(last)) => {
            let last_score = steps.last().and_then(|s| s.score);
            controller.implied_exit(last, last_score)
        }
        _ => None,
    };
    if let Some(open) = &open_trade {
        debug!(
            entry = %open.entry_time,
            profit_pct = open.profit_pct,
            "position still open at last bar"
        );
    }

    let metrics = PerformanceMetrics::compute(
        &account,
        bars,
        bars_long,
        &trades,
        config.risk_free_rate,
    );

    info!(
        strategy = strategy.name(),
        bars = bars.len(),
        trades = trades.len(),
        total_return_pct = metrics.total_return_pct,
        "backtest complete"
    );

    Ok(BacktestResult {
        strategy_name: strategy.name().to_string(),
        steps,
        trades,
        open_trade,
        equity_curve: account.equity_curve,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::strategy::{CrossoverParams, StrategyKind};

    fn no_fees() -> BacktestConfig {
        BacktestConfig {
            commission_pct: 0.0,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn default_config() {
        let c = BacktestConfig::default();
        assert!((c.initial_capital - 10_000.0).abs() < f64::EPSILON);
        assert!((c.commission_pct - 0.1).abs() < f64::EPSILON);
        assert!(c.close_open_position);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_capital_and_commission() {
        let c = BacktestConfig {
            initial_capital: 0.0,
            ..BacktestConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(SigtraderError::ConfigInvalid { ref key, .. }) if key == "initial_capital"
        ));

        let c = BacktestConfig {
            commission_pct: -0.5,
            ..BacktestConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn empty_bars_rejected() {
        let strategy = Strategy::from_key("buy_hold").unwrap();
        let err = run_backtest(&[], &strategy, &no_fees()).unwrap_err();
        assert!(matches!(err, SigtraderError::InvalidBars { .. }));
    }

    #[test]
    fn buy_and_hold_tracks_benchmark() {
        let bars = make_bars(&[100.0, 105.0, 110.0]);
        let strategy = Strategy::from_key("buy_hold").unwrap();
        let result = run_backtest(&bars, &strategy, &no_fees()).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.steps[0].action, Action::Buy);
        assert_eq!(result.final_side(), Side::Long);
        let open = result.open_trade.as_ref().unwrap();
        assert!((open.profit_pct - 10.0).abs() < 1e-9);
        assert!((result.metrics.total_return_pct - 10.0).abs() < 1e-9);
        assert_eq!(result.metrics.buy_and_hold_pct, Some(10.0));
        assert!((result.metrics.exposure_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn open_trade_can_be_suppressed() {
        let bars = make_bars(&[100.0, 105.0]);
        let strategy = Strategy::from_key("buy_hold").unwrap();
        let config = BacktestConfig {
            close_open_position: false,
            ..no_fees()
        };
        let result = run_backtest(&bars, &strategy, &config).unwrap();
        assert!(result.open_trade.is_none());
    }

    #[test]
    fn crossover_round_trip_records_trade() {
        let bars = make_bars(&[10.0, 10.0, 10.0, 13.0, 13.0, 7.0, 7.0]);
        let strategy = Strategy::new(
            "fast sma",
            StrategyKind::SmaCrossover(CrossoverParams {
                fast_period: 1,
                slow_period: 3,
            }),
        )
        .unwrap();
        let result = run_backtest(&bars, &strategy, &no_fees()).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = result.trades.last().unwrap();
        assert_eq!(trade.entry_price, 13.0);
        assert_eq!(trade.exit_price, 7.0);
        assert_eq!(trade.duration_days, 2);
        assert_eq!(result.transitions(), 2);
        assert!(result.open_trade.is_none());
        assert_eq!(result.equity_curve.len(), bars.len());
    }

    #[test]
    fn steps_align_with_bars() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let strategy = Strategy::from_key("combined").unwrap();
        let result = run_backtest(&bars, &strategy, &no_fees()).unwrap();

        assert_eq!(result.steps.len(), 4);
        assert_eq!(result.steps[0].score, Some(0.0));
        for (step, bar) in result.steps.iter().zip(&bars) {
            assert_eq!(step.timestamp, bar.timestamp);
            assert_eq!(step.close, bar.close);
        }
    }
}

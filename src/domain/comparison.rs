//! Side-by-side runs of several strategies over the same bars.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use super::backtest::{run_backtest, BacktestConfig, BacktestResult};
use super::error::SigtraderError;
use super::metrics::or_na;
use super::ohlcv::OhlcvBar;
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub strategy_name: String,
    pub total_return_pct: f64,
    pub buy_and_hold_pct: Option<f64>,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub trades: usize,
    pub win_rate: Option<f64>,
    pub avg_trade_pct: Option<f64>,
}

impl From<&BacktestResult> for ComparisonRow {
    fn from(result: &BacktestResult) -> Self {
        let m = &result.metrics;
        ComparisonRow {
            strategy_name: result.strategy_name.clone(),
            total_return_pct: m.total_return_pct,
            buy_and_hold_pct: m.buy_and_hold_pct,
            max_drawdown_pct: m.max_drawdown_pct,
            sharpe_ratio: m.sharpe_ratio,
            sortino_ratio: m.sortino_ratio,
            trades: m.trade_stats.total_trades,
            win_rate: m.trade_stats.win_rate,
            avg_trade_pct: m.trade_stats.avg_profit_pct,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    /// Rows by Sharpe ratio, best first; ties go to the higher total return.
    pub fn ranked(&self) -> Vec<&ComparisonRow> {
        let mut rows: Vec<&ComparisonRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            b.sharpe_ratio
                .partial_cmp(&a.sharpe_ratio)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.total_return_pct
                        .partial_cmp(&a.total_return_pct)
                        .unwrap_or(Ordering::Equal)
                })
        });
        rows
    }

    pub fn best(&self) -> Option<&ComparisonRow> {
        self.ranked().into_iter().next()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<20} {:>9} {:>9} {:>8} {:>7} {:>8} {:>6} {:>8} {:>9}",
            "Strategy", "Return%", "B&H%", "MaxDD%", "Sharpe", "Sortino", "Trades", "Win%", "AvgTrd%"
        )?;
        for row in self.ranked() {
            writeln!(
                f,
                "{:<20} {:>9.2} {:>9} {:>8.2} {:>7.2} {:>8.2} {:>6} {:>8} {:>9}",
                row.strategy_name,
                row.total_return_pct,
                or_na(row.buy_and_hold_pct, 2),
                row.max_drawdown_pct,
                row.sharpe_ratio,
                row.sortino_ratio,
                row.trades,
                or_na(row.win_rate, 1),
                or_na(row.avg_trade_pct, 2),
            )?;
        }
        Ok(())
    }
}

/// Run every strategy on `bars` independently. The first failing run aborts
/// the comparison.
pub fn compare_strategies(
    bars: &[OhlcvBar],
    strategies: &[Strategy],
    config: &BacktestConfig,
) -> Result<Comparison, SigtraderError> {
    let rows = strategies
        .iter()
        .map(|strategy| run_backtest(bars, strategy, config).map(|r| ComparisonRow::from(&r)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Comparison { rows })
}

//! Trade statistics and run-level performance metrics.
//!
//! Derived values that have no defined result (empty sets, zero
//! denominators) are `None`; they print as `N/A` and serialise as `null`.

use serde::Serialize;
use std::fmt;

use super::ohlcv::OhlcvBar;
use super::portfolio::{Account, EquityPoint};
use super::trade::{Trade, TradeLog};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Render an optional number with `decimals` places, or `N/A`.
pub fn or_na(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "N/A".to_string(),
    }
}

/// Like [`or_na`], with a `%` suffix only when the value is defined.
pub fn pct_or_na(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}%"),
        None => "N/A".to_string(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: Option<f64>,
    pub avg_profit_pct: Option<f64>,
    pub avg_winner_pct: Option<f64>,
    pub avg_loser_pct: Option<f64>,
    pub profit_factor: Option<f64>,
    pub best_trade_pct: Option<f64>,
    pub worst_trade_pct: Option<f64>,
    pub avg_duration_days: Option<f64>,
}

impl TradeStats {
    /// Winners have `profit_pct > 0`, losers `profit_pct <= 0`. Trades with an
    /// undefined percentage are counted in `total_trades` only.
    pub fn compute(trades: &[Trade]) -> Self {
        let pcts: Vec<f64> = trades
            .iter()
            .map(|t| t.profit_pct)
            .filter(|p| p.is_finite())
            .collect();
        let winners: Vec<f64> = pcts.iter().copied().filter(|&p| p > 0.0).collect();
        let losers: Vec<f64> = pcts.iter().copied().filter(|&p| p <= 0.0).collect();

        let win_rate = if pcts.is_empty() {
            None
        } else {
            Some(winners.len() as f64 / pcts.len() as f64 * 100.0)
        };

        let gross_loss = losers.iter().sum::<f64>().abs();
        let profit_factor = if losers.is_empty() || gross_loss == 0.0 {
            None
        } else {
            Some(winners.iter().sum::<f64>() / gross_loss)
        };

        let durations: Vec<f64> = trades.iter().map(|t| t.duration_days as f64).collect();

        TradeStats {
            total_trades: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate,
            avg_profit_pct: mean(&pcts),
            avg_winner_pct: mean(&winners),
            avg_loser_pct: mean(&losers),
            profit_factor,
            best_trade_pct: pcts.iter().copied().reduce(f64::max),
            worst_trade_pct: pcts.iter().copied().reduce(f64::min),
            avg_duration_days: mean(&durations),
        }
    }
}

impl fmt::Display for TradeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total trades:     {}", self.total_trades)?;
        writeln!(
            f,
            "Winning / losing: {} / {}",
            self.winning_trades, self.losing_trades
        )?;
        writeln!(f, "Win rate:         {}", pct_or_na(self.win_rate, 2))?;
        writeln!(f, "Avg profit:       {}", pct_or_na(self.avg_profit_pct, 2))?;
        writeln!(f, "Avg winner:       {}", pct_or_na(self.avg_winner_pct, 2))?;
        writeln!(f, "Avg loser:        {}", pct_or_na(self.avg_loser_pct, 2))?;
        writeln!(f, "Profit factor:    {}", or_na(self.profit_factor, 2))?;
        writeln!(f, "Best trade:       {}", pct_or_na(self.best_trade_pct, 2))?;
        writeln!(f, "Worst trade:      {}", pct_or_na(self.worst_trade_pct, 2))?;
        match self.avg_duration_days {
            Some(days) => write!(f, "Avg duration:     {days:.1} days"),
            None => write!(f, "Avg duration:     N/A"),
        }
    }
}

/// Percentage change from the first to the last close.
pub fn buy_and_hold_pct(bars: &[OhlcvBar]) -> Option<f64> {
    let first = bars.first()?.close;
    let last = bars.last()?.close;
    if first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub final_equity: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub max_drawdown_duration: i64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub exposure_pct: f64,
    pub buy_and_hold_pct: Option<f64>,
    pub trade_stats: TradeStats,
}

impl PerformanceMetrics {
    pub fn compute(
        account: &Account,
        bars: &[OhlcvBar],
        bars_long: usize,
        trades: &TradeLog,
        risk_free_rate: f64,
    ) -> Self {
        let equity_curve = &account.equity_curve;
        let initial_capital = account.initial_capital;

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, daily_rf);

        let exposure_pct = if bars.is_empty() {
            0.0
        } else {
            bars_long as f64 / bars.len() as f64 * 100.0
        };

        PerformanceMetrics {
            final_equity,
            total_return_pct: total_return * 100.0,
            annualized_return_pct: annualized_return * 100.0,
            max_drawdown_pct: max_drawdown * 100.0,
            max_drawdown_duration,
            sharpe_ratio,
            sortino_ratio,
            exposure_pct,
            buy_and_hold_pct: buy_and_hold_pct(bars),
            trade_stats: trades.stats(),
        }
    }
}

impl fmt::Display for PerformanceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final equity:     {:.2}", self.final_equity)?;
        writeln!(f, "Total return:     {:.2}%", self.total_return_pct)?;
        writeln!(f, "Annualized:       {:.2}%", self.annualized_return_pct)?;
        writeln!(f, "Buy & hold:       {}", pct_or_na(self.buy_and_hold_pct, 2))?;
        writeln!(
            f,
            "Max drawdown:     {:.2}% ({} bars)",
            self.max_drawdown_pct, self.max_drawdown_duration
        )?;
        writeln!(f, "Sharpe:           {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Sortino:          {:.2}", self.sortino_ratio)?;
        writeln!(f, "Exposure:         {:.1}%", self.exposure_pct)?;
        write!(f, "{}", self.trade_stats)
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], daily_rf: f64) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside_sq / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}

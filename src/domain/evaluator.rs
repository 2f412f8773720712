//! Per-strategy indicator preparation and step evaluation.
//!
//! Indicators are computed once over the full bar sequence. Evaluation at
//! step `t` reads them through [`Lookback`] views, which expose only `t - 1`
//! and `t`.

use super::indicator::{
    calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi, calculate_sma, Component,
    IndicatorSeries, Lookback, Pair,
};
use super::ohlcv::OhlcvBar;
use super::position::{Action, Side, Thresholds};
use super::scorer::{score, ScoreInputs, ScoreWeights};
use super::signal::{crossover, Cross, RsiBounds};
use super::strategy::{BandParams, MacdParams, StrategyKind};

/// Outcome of evaluating one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub score: Option<f64>,
    pub action: Action,
}

impl Evaluation {
    fn hold() -> Self {
        Evaluation {
            score: None,
            action: Action::Hold,
        }
    }

    fn rule(side: Side, entry: bool, exit: bool) -> Self {
        let action = match side {
            Side::Flat if entry => Action::Buy,
            Side::Long if exit => Action::Sell,
            _ => Action::Hold,
        };
        Evaluation {
            score: None,
            action,
        }
    }
}

fn macd(bars: &[OhlcvBar], p: &MacdParams) -> IndicatorSeries {
    calculate_macd(bars, p.fast, p.slow, p.signal)
}

fn bands(bars: &[OhlcvBar], p: &BandParams) -> IndicatorSeries {
    calculate_bollinger(bars, p.period, p.dev)
}

fn value(series: &IndicatorSeries, t: usize) -> Pair {
    series.lookback(t).pair(Component::Value)
}

/// A strategy with its indicator set computed.
#[derive(Debug, Clone)]
pub enum PreparedStrategy {
    BuyAndHold,
    Crossover {
        fast: IndicatorSeries,
        slow: IndicatorSeries,
    },
    MacdRsi {
        macd: IndicatorSeries,
        rsi: IndicatorSeries,
        ema: IndicatorSeries,
        bounds: RsiBounds,
    },
    BollingerRsi {
        bands: IndicatorSeries,
        rsi: IndicatorSeries,
        bounds: RsiBounds,
    },
    Combined {
        sma_fast: IndicatorSeries,
        sma_slow: IndicatorSeries,
        ema_fast: IndicatorSeries,
        ema_slow: IndicatorSeries,
        macd: IndicatorSeries,
        rsi: IndicatorSeries,
        bands: IndicatorSeries,
        bounds: RsiBounds,
        thresholds: Thresholds,
        weights: ScoreWeights,
    },
}

impl PreparedStrategy {
    pub fn new(bars: &[OhlcvBar], kind: &StrategyKind) -> Self {
        match kind {
            StrategyKind::BuyAndHold => PreparedStrategy::BuyAndHold,
            StrategyKind::SmaCrossover(p) => PreparedStrategy::Crossover {
                fast: calculate_sma(bars, p.fast_period),
                slow: calculate_sma(bars, p.slow_period),
            },
            StrategyKind::EmaCrossover(p) => PreparedStrategy::Crossover {
                fast: calculate_ema(bars, p.fast_period),
                slow: calculate_ema(bars, p.slow_period),
            },
            StrategyKind::MacdRsi(p) => PreparedStrategy::MacdRsi {
                macd: macd(bars, &p.macd),
                rsi: calculate_rsi(bars, p.rsi_period),
                ema: calculate_ema(bars, p.ema_period),
                bounds: p.rsi,
            },
            StrategyKind::BollingerRsi(p) => PreparedStrategy::BollingerRsi {
                bands: bands(bars, &p.bands),
                rsi: calculate_rsi(bars, p.rsi_period),
                bounds: p.rsi,
            },
            StrategyKind::Combined(p) => PreparedStrategy::Combined {
                sma_fast: calculate_sma(bars, p.sma.fast_period),
                sma_slow: calculate_sma(bars, p.sma.slow_period),
                ema_fast: calculate_ema(bars, p.ema.fast_period),
                ema_slow: calculate_ema(bars, p.ema.slow_period),
                macd: macd(bars, &p.macd),
                rsi: calculate_rsi(bars, p.rsi_period),
                bands: bands(bars, &p.bands),
                bounds: p.rsi,
                thresholds: p.thresholds,
                weights: p.weights,
            },
        }
    }

    /// Evaluate the last bar of `history` given the current side.
    ///
    /// `history` is the bar sequence up to and including step `t`; later bars
    /// are never passed in.
    pub fn evaluate(&self, history: &[OhlcvBar], side: Side) -> Evaluation {
        let Some(t) = history.len().checked_sub(1) else {
            return Evaluation::hold();
        };
        let close = close_pair(history);

        match self {
            PreparedStrategy::BuyAndHold => Evaluation::rule(side, true, false),
            PreparedStrategy::Crossover { fast, slow } => {
                let cross = crossover(value(fast, t), value(slow, t));
                Evaluation::rule(side, cross == Cross::Above, cross == Cross::Below)
            }
            PreparedStrategy::MacdRsi {
                macd,
                rsi,
                ema,
                bounds,
            } => {
                let macd_view = macd.lookback(t);
                let line = macd_view.pair(Component::MacdLine);
                let signal = macd_view.pair(Component::MacdSignal);
                let rsi_now = rsi.lookback(t).current(Component::Value);
                let ema_now = ema.lookback(t).current(Component::Value);
                let c = close.current;

                let entry = crossover(line, signal) == Cross::Above
                    && rsi_now.is_some_and(|r| r > bounds.oversold && r < bounds.overbought)
                    && matches!((c, ema_now), (Some(c), Some(e)) if c > e);
                let exit = crossover(signal, line) == Cross::Above
                    || rsi_now.is_some_and(|r| r > bounds.overbought)
                    || matches!((c, ema_now), (Some(c), Some(e)) if c < e);
                Evaluation::rule(side, entry, exit)
            }
            PreparedStrategy::BollingerRsi { bands, rsi, bounds } => {
                let view: Lookback<'_> = bands.lookback(t);
                let rsi_now = rsi.lookback(t).current(Component::Value);
                let c = close.current;
                let at_or_below = |band: Option<f64>| matches!((c, band), (Some(c), Some(b)) if c <= b);
                let at_or_above = |band: Option<f64>| matches!((c, band), (Some(c), Some(b)) if c >= b);

                let entry = at_or_below(view.current(Component::Lower))
                    && rsi_now.is_some_and(|r| r <= bounds.oversold);
                let exit = at_or_above(view.current(Component::Middle))
                    || at_or_above(view.current(Component::Upper))
                    || rsi_now.is_some_and(|r| r >= bounds.overbought);
                Evaluation::rule(side, entry, exit)
            }
            PreparedStrategy::Combined {
                sma_fast,
                sma_slow,
                ema_fast,
                ema_slow,
                macd,
                rsi,
                bands,
                bounds,
                thresholds,
                weights,
            } => {
                let macd_view = macd.lookback(t);
                let band_view = bands.lookback(t);
                let inputs = ScoreInputs {
                    close,
                    sma_fast: value(sma_fast, t),
                    sma_slow: value(sma_slow, t),
                    ema_fast: value(ema_fast, t),
                    ema_slow: value(ema_slow, t),
                    macd_line: macd_view.pair(Component::MacdLine),
                    macd_signal: macd_view.pair(Component::MacdSignal),
                    macd_histogram: macd_view.pair(Component::MacdHistogram),
                    rsi: value(rsi, t),
                    bb_upper: band_view.pair(Component::Upper),
                    bb_middle: band_view.pair(Component::Middle),
                    bb_lower: band_view.pair(Component::Lower),
                };
                let s = score(t, &inputs, weights, bounds);
                Evaluation {
                    score: Some(s),
                    action: thresholds.action_for(s),
                }
            }
        }
    }
}

fn close_pair(history: &[OhlcvBar]) -> Pair {
    let n = history.len();
    let current = history.last().map(|b| b.close);
    let previous = n.checked_sub(2).map(|i| history[i].close);
    Pair::new(previous, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::strategy::{BollingerRsiParams, CrossoverParams};

    #[test]
    fn buy_and_hold_buys_when_flat_only() {
        let bars = make_bars(&[10.0, 11.0]);
        let prepared = PreparedStrategy::new(&bars, &StrategyKind::BuyAndHold);
        assert_eq!(prepared.evaluate(&bars[..1], Side::Flat).action, Action::Buy);
        assert_eq!(prepared.evaluate(&bars, Side::Long).action, Action::Hold);
    }

    #[test]
    fn empty_history_holds() {
        let prepared = PreparedStrategy::new(&[], &StrategyKind::BuyAndHold);
        assert_eq!(prepared.evaluate(&[], Side::Flat), Evaluation::hold());
    }

    #[test]
    fn sma_cross_triggers_entry_and_exit() {
        let bars = make_bars(&[10.0, 10.0, 10.0, 13.0, 13.0, 7.0, 7.0]);
        let kind = StrategyKind::SmaCrossover(CrossoverParams {
            fast_period: 1,
            slow_period: 3,
        });
        let prepared = PreparedStrategy::new(&bars, &kind);

        // t=3: fast 13 > slow 11, was equal at t=2
        assert_eq!(prepared.evaluate(&bars[..4], Side::Flat).action, Action::Buy);
        // entry rules are not evaluated while long
        assert_eq!(prepared.evaluate(&bars[..4], Side::Long).action, Action::Hold);
        // t=5: fast 7 < slow 11
        assert_eq!(prepared.evaluate(&bars[..6], Side::Long).action, Action::Sell);
    }

    #[test]
    fn bollinger_rsi_exit_on_middle_band() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 101.0]);
        let kind = StrategyKind::BollingerRsi(BollingerRsiParams {
            bands: BandParams {
                period: 3,
                dev: 2.0,
            },
            rsi_period: 2,
            ..Default::default()
        });
        let prepared = PreparedStrategy::new(&bars, &kind);
        assert_eq!(prepared.evaluate(&bars, Side::Long).action, Action::Sell);
    }

    #[test]
    fn combined_reports_score_and_zero_at_start() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        let kind = StrategyKind::from_key("combined").unwrap();
        let prepared = PreparedStrategy::new(&bars, &kind);

        let first = prepared.evaluate(&bars[..1], Side::Flat);
        assert_eq!(first.score, Some(0.0));
        assert_eq!(first.action, Action::Hold);
    }

    #[test]
    fn close_pair_reads_last_two() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        assert_eq!(close_pair(&bars), Pair::new(Some(2.0), Some(3.0)));
        assert_eq!(close_pair(&bars[..1]), Pair::new(None, Some(1.0)));
    }
}

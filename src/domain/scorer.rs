//! Multi-indicator weighted signal score.
//!
//! Each rule adds its weight when bullish and subtracts it when bearish; the
//! score is the plain sum. With the default weights it ranges over
//! -8.5..=8.5.

use serde::Serialize;

use super::indicator::Pair;
use super::signal::{crossover, direction, relative, Cross, RsiBounds};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub sma_cross: f64,
    pub ema_cross: f64,
    pub close_vs_slow_sma: f64,
    pub macd_cross: f64,
    pub macd_histogram: f64,
    pub rsi_extreme: f64,
    pub rsi_direction: f64,
    pub band_touch: f64,
    pub close_vs_middle_band: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            sma_cross: 1.0,
            ema_cross: 1.0,
            close_vs_slow_sma: 0.5,
            macd_cross: 1.5,
            macd_histogram: 0.5,
            rsi_extreme: 1.5,
            rsi_direction: 0.5,
            band_touch: 1.5,
            close_vs_middle_band: 0.5,
        }
    }
}

impl ScoreWeights {
    /// Largest absolute score these weights can produce.
    pub fn max_abs_score(&self) -> f64 {
        [
            self.sma_cross,
            self.ema_cross,
            self.close_vs_slow_sma,
            self.macd_cross,
            self.macd_histogram,
            self.rsi_extreme,
            self.rsi_direction,
            self.band_touch,
            self.close_vs_middle_band,
        ]
        .iter()
        .map(|w| w.abs())
        .sum()
    }
}

/// Everything the scorer may read at step `t`: each field holds the values at
/// `t - 1` and `t`, nothing further.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreInputs {
    pub close: Pair,
    pub sma_fast: Pair,
    pub sma_slow: Pair,
    pub ema_fast: Pair,
    pub ema_slow: Pair,
    pub macd_line: Pair,
    pub macd_signal: Pair,
    pub macd_histogram: Pair,
    pub rsi: Pair,
    pub bb_upper: Pair,
    pub bb_middle: Pair,
    pub bb_lower: Pair,
}

fn cross_term(cross: Cross, weight: f64) -> f64 {
    match cross {
        Cross::Above => weight,
        Cross::Below => -weight,
        Cross::Neither => 0.0,
    }
}

/// Weighted score for one step. `t` is only used to pin the first step at 0.
pub fn score(t: usize, inputs: &ScoreInputs, weights: &ScoreWeights, rsi: &RsiBounds) -> f64 {
    if t == 0 {
        return 0.0;
    }

    let close = inputs.close.current;
    let mut total = 0.0;

    total += cross_term(crossover(inputs.sma_fast, inputs.sma_slow), weights.sma_cross);
    total += cross_term(crossover(inputs.ema_fast, inputs.ema_slow), weights.ema_cross);
    total += weights.close_vs_slow_sma * relative(close, inputs.sma_slow.current);

    total += cross_term(
        crossover(inputs.macd_line, inputs.macd_signal),
        weights.macd_cross,
    );
    total += weights.macd_histogram * direction(inputs.macd_histogram);

    if let Some(value) = inputs.rsi.current {
        if value < rsi.oversold {
            total += weights.rsi_extreme;
        } else if value > rsi.overbought {
            total -= weights.rsi_extreme;
        }
    }
    total += weights.rsi_direction * direction(inputs.rsi);

    if let Some(c) = close {
        match (inputs.bb_lower.current, inputs.bb_upper.current) {
            (Some(lower), _) if c <= lower => total += weights.band_touch,
            (_, Some(upper)) if c >= upper => total -= weights.band_touch,
            _ => {}
        }
    }
    total += weights.close_vs_middle_band * relative(close, inputs.bb_middle.current);

    total
}

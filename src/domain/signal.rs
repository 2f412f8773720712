//! Two-point signal primitives: crossovers, direction, and RSI bounds.
//!
//! Every helper works on [`Pair`]s, so it can only see `t - 1` and `t`.

use serde::Serialize;

use super::error::SigtraderError;
use super::indicator::Pair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    Above,
    Below,
    Neither,
}

/// Crossover of `a` relative to `b` between `t - 1` and `t`.
///
/// Equality at `t - 1` counts as not yet crossed, so a touch followed by a
/// break is a cross. Any undefined input gives `Neither`.
pub fn crossover(a: Pair, b: Pair) -> Cross {
    match (a.both(), b.both()) {
        (Some((a0, a1)), Some((b0, b1))) => {
            if a0 <= b0 && a1 > b1 {
                Cross::Above
            } else if a0 >= b0 && a1 < b1 {
                Cross::Below
            } else {
                Cross::Neither
            }
        }
        _ => Cross::Neither,
    }
}

/// +1 when the value strictly rose since `t - 1`, -1 otherwise.
/// A flat value counts as not rising; undefined input gives 0.
pub fn direction(p: Pair) -> f64 {
    match p.both() {
        Some((prev, cur)) if cur > prev => 1.0,
        Some(_) => -1.0,
        None => 0.0,
    }
}

/// +1 when `value` is strictly above `reference`, -1 when at or below it,
/// 0 when either is undefined.
pub fn relative(value: Option<f64>, reference: Option<f64>) -> f64 {
    match (value, reference) {
        (Some(v), Some(r)) if v > r => 1.0,
        (Some(_), Some(_)) => -1.0,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RsiBounds {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiBounds {
    fn default() -> Self {
        RsiBounds {
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl RsiBounds {
    pub fn new(oversold: f64, overbought: f64) -> Result<Self, SigtraderError> {
        if !oversold.is_finite() || !overbought.is_finite() {
            return Err(SigtraderError::invalid_strategy(
                "rsi",
                "RSI bounds must be finite",
            ));
        }
        if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
            return Err(SigtraderError::invalid_strategy(
                "rsi",
                format!("RSI bounds must lie in 0..=100, got {oversold}/{overbought}"),
            ));
        }
        if oversold >= overbought {
            return Err(SigtraderError::invalid_strategy(
                "rsi",
                format!("oversold ({oversold}) must be below overbought ({overbought})"),
            ));
        }
        Ok(RsiBounds {
            oversold,
            overbought,
        })
    }

    pub fn validate(&self) -> Result<(), SigtraderError> {
        RsiBounds::new(self.oversold, self.overbought).map(|_| ())
    }
}

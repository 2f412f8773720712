//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values aligned with the bars
//! - `Lookback`: A read-only view of a series that cannot see past step `t`
//!
//! Warm-up points carry `valid == false`. Readers never see warm-up or
//! non-finite values: every accessor returns `None` for them.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

/// One scalar component of an [`IndicatorValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    Upper,
    Middle,
    Lower,
}

impl IndicatorValue {
    pub fn component(&self, component: Component) -> Option<f64> {
        match (self, component) {
            (IndicatorValue::Simple(v), Component::Value) => Some(*v),
            (IndicatorValue::Macd { line, .. }, Component::MacdLine) => Some(*line),
            (IndicatorValue::Macd { signal, .. }, Component::MacdSignal) => Some(*signal),
            (IndicatorValue::Macd { histogram, .. }, Component::MacdHistogram) => {
                Some(*histogram)
            }
            (IndicatorValue::Bollinger { upper, .. }, Component::Upper) => Some(*upper),
            (IndicatorValue::Bollinger { middle, .. }, Component::Middle) => Some(*middle),
            (IndicatorValue::Bollinger { lower, .. }, Component::Lower) => Some(*lower),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    /// The multiplier is stored as `f64::to_bits` so the key stays hashable.
    Bollinger {
        period: usize,
        stddev_mult_bits: u64,
    },
}

impl IndicatorType {
    pub fn bollinger(period: usize, stddev_mult: f64) -> Self {
        IndicatorType::Bollinger {
            period,
            stddev_mult_bits: stddev_mult.to_bits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Build a single-valued series from raw numbers. NaN and infinite
    /// entries become warm-up (invalid) points.
    pub fn from_values(
        indicator_type: IndicatorType,
        timestamps: &[NaiveDateTime],
        values: &[f64],
    ) -> Self {
        let values = timestamps
            .iter()
            .zip(values)
            .map(|(&timestamp, &v)| IndicatorPoint {
                timestamp,
                valid: v.is_finite(),
                value: IndicatorValue::Simple(v),
            })
            .collect();
        IndicatorSeries {
            indicator_type,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of `component` at index `i`, or `None` when the point is out of
    /// range, still warming up, or not finite.
    pub fn at(&self, i: usize, component: Component) -> Option<f64> {
        let point = self.values.get(i)?;
        if !point.valid {
            return None;
        }
        point
            .value
            .component(component)
            .filter(|v| v.is_finite())
    }

    pub fn lookback(&self, t: usize) -> Lookback<'_> {
        Lookback { series: self, t }
    }
}

/// Values of one component at `t - 1` and `t`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pair {
    pub previous: Option<f64>,
    pub current: Option<f64>,
}

impl Pair {
    pub fn new(previous: Option<f64>, current: Option<f64>) -> Self {
        Pair { previous, current }
    }

    /// Both values defined.
    pub fn both(&self) -> Option<(f64, f64)> {
        Some((self.previous?, self.current?))
    }
}

/// View of a series at step `t`. Only indices `t - 1` and `t` are readable.
#[derive(Debug, Clone, Copy)]
pub struct Lookback<'a> {
    series: &'a IndicatorSeries,
    t: usize,
}

impl<'a> Lookback<'a> {
    pub fn current(&self, component: Component) -> Option<f64> {
        self.series.at(self.t, component)
    }

    pub fn previous(&self, component: Component) -> Option<f64> {
        let prev = self.t.checked_sub(1)?;
        self.series.at(prev, component)
    }

    pub fn pair(&self, component: Component) -> Pair {
        Pair::new(self.previous(component), self.current(component))
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_bits,
            } => {
                let mult = f64::from_bits(*stddev_mult_bits);
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamps(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::bollinger(20, 2.5);
        assert_eq!(boll.to_string(), "BOLLINGER(20,2.5)");
        assert_eq!(
            IndicatorType::bollinger(20, 2.345).to_string(),
            "BOLLINGER(20,2.345)"
        );
    }

    #[test]
    fn from_values_marks_nan_invalid() {
        let ts = timestamps(3);
        let series =
            IndicatorSeries::from_values(IndicatorType::Rsi(14), &ts, &[f64::NAN, 40.0, 45.0]);
        assert!(!series.values[0].valid);
        assert_eq!(series.at(0, Component::Value), None);
        assert_eq!(series.at(1, Component::Value), Some(40.0));
    }

    #[test]
    fn at_rejects_wrong_component_and_out_of_range() {
        let ts = timestamps(2);
        let series = IndicatorSeries::from_values(IndicatorType::Sma(2), &ts, &[1.0, 2.0]);
        assert_eq!(series.at(1, Component::Upper), None);
        assert_eq!(series.at(5, Component::Value), None);
    }

    #[test]
    fn at_hides_non_finite_component_of_valid_point() {
        let ts = timestamps(1);
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Macd {
                fast: 3,
                slow: 5,
                signal: 2,
            },
            values: vec![IndicatorPoint {
                timestamp: ts[0],
                valid: true,
                value: IndicatorValue::Macd {
                    line: 1.0,
                    signal: f64::NAN,
                    histogram: f64::NAN,
                },
            }],
        };
        assert_eq!(series.at(0, Component::MacdLine), Some(1.0));
        assert_eq!(series.at(0, Component::MacdSignal), None);
    }

    #[test]
    fn lookback_has_no_previous_at_zero() {
        let ts = timestamps(3);
        let series = IndicatorSeries::from_values(IndicatorType::Sma(1), &ts, &[1.0, 2.0, 3.0]);
        let view = series.lookback(0);
        assert_eq!(view.previous(Component::Value), None);
        assert_eq!(view.current(Component::Value), Some(1.0));
    }

    #[test]
    fn lookback_reads_only_t_and_t_minus_one() {
        let ts = timestamps(3);
        let series = IndicatorSeries::from_values(IndicatorType::Sma(1), &ts, &[1.0, 2.0, 3.0]);
        let pair = series.lookback(1).pair(Component::Value);
        assert_eq!(pair, Pair::new(Some(1.0), Some(2.0)));
        assert_eq!(pair.both(), Some((1.0, 2.0)));
    }

    #[test]
    fn pair_both_requires_two_values() {
        assert_eq!(Pair::new(None, Some(1.0)).both(), None);
        assert_eq!(Pair::default().both(), None);
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Sma(20), "fast");
        map.insert(IndicatorType::Sma(50), "slow");
        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"fast"));
        assert_eq!(map.get(&IndicatorType::Sma(50)), Some(&"slow"));
    }
}

//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n bars
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, unless avg_gain is also 0 (flat prices),
//! where RSI = 0 as TA-Lib reports it.
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain + avg_loss == 0.0 {
        0.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

fn invalid_point(bar: &OhlcvBar) -> IndicatorPoint {
    IndicatorPoint {
        timestamp: bar.timestamp,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    }
}

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: bars.iter().map(invalid_point).collect(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(invalid_point(&bars[0]));

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let change = bar.close - bars[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i < period {
            gain_sum += gain;
            loss_sum += loss;
            values.push(invalid_point(bar));
            continue;
        }

        if i == period {
            avg_gain = (gain_sum + gain) / period as f64;
            avg_loss = (loss_sum + loss) / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        }

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

//! OHLCV bar representation and input validation.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::error::SigtraderError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvBar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Reject a bar sequence that cannot be simulated.
///
/// Requires at least one bar, strictly increasing timestamps, finite positive
/// prices with `low <= high`, and a finite non-negative volume.
pub fn validate_bars(bars: &[OhlcvBar]) -> Result<(), SigtraderError> {
    if bars.is_empty() {
        return Err(SigtraderError::invalid_bars(0, "price series is empty"));
    }

    for (i, bar) in bars.iter().enumerate() {
        let prices = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ];
        for (field, value) in prices {
            if !value.is_finite() {
                return Err(SigtraderError::invalid_bars(
                    i,
                    format!("{field} is not a finite number"),
                ));
            }
            if value <= 0.0 {
                return Err(SigtraderError::invalid_bars(
                    i,
                    format!("{field} must be positive, got {value}"),
                ));
            }
        }
        if bar.low > bar.high {
            return Err(SigtraderError::invalid_bars(i, "low is above high"));
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(SigtraderError::invalid_bars(
                i,
                "volume must be a non-negative number",
            ));
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(SigtraderError::invalid_bars(
                i,
                format!(
                    "timestamps must be strictly increasing ({} follows {})",
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            ));
        }
    }

    Ok(())
}

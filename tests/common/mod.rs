#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use sigtrader::domain::backtest::{BacktestConfig, BacktestResult};
use sigtrader::domain::comparison::Comparison;
use sigtrader::domain::error::SigtraderError;
pub use sigtrader::domain::ohlcv::OhlcvBar;
use sigtrader::ports::data_port::DataPort;
use sigtrader::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SigtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SigtraderError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date() >= start && b.date() <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Records what was written instead of touching the filesystem.
pub struct MockReportPort {
    pub results: RefCell<Vec<(BacktestResult, PathBuf)>>,
    pub comparisons: RefCell<Vec<(Comparison, PathBuf)>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            results: RefCell::new(Vec::new()),
            comparisons: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SigtraderError> {
        self.results
            .borrow_mut()
            .push((result.clone(), output_path.to_path_buf()));
        Ok(())
    }

    fn write_comparison(
        &self,
        comparison: &Comparison,
        output_path: &Path,
    ) -> Result<(), SigtraderError> {
        self.comparisons
            .borrow_mut()
            .push((comparison.clone(), output_path.to_path_buf()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn midnight(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(0, 0, 0).unwrap()
}

pub fn make_bar(symbol: &str, day: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        timestamp: midnight(NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap()),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

/// Daily bars from 2024-01-01 with the given closes.
pub fn bars_from_closes(symbol: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            symbol: symbol.to_string(),
            timestamp: midnight(start + chrono::Duration::days(i as i64)),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Smooth oscillation around `base`; crosses its own averages repeatedly.
pub fn wave(count: usize, base: f64, amplitude: f64) -> Vec<f64> {
    (0..count)
        .map(|i| base + (i as f64 * 0.35).sin() * amplitude)
        .collect()
}

pub fn no_fee_config() -> BacktestConfig {
    BacktestConfig {
        commission_pct: 0.0,
        ..BacktestConfig::default()
    }
}

//! CSV file data adapter.
//!
//! One file per symbol, `<base_path>/<SYMBOL>.csv`, with the header
//! `timestamp,open,high,low,close,volume`. Timestamps are either
//! `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn source_error(reason: String) -> SigtraderError {
    SigtraderError::DataSource { reason }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_field(record: &csv::StringRecord, index: usize) -> Result<f64, String> {
    let name = COLUMNS[index];
    let raw = record
        .get(index)
        .ok_or_else(|| format!("missing {} column", name))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid {} value '{}': {}", name, raw, e))
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SigtraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| source_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| source_error(format!("CSV parse error: {}", e)))?;

            let ts_str = record
                .get(0)
                .ok_or_else(|| source_error("missing timestamp column".into()))?;
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| {
                source_error(format!(
                    "invalid timestamp '{}' in {} (row {})",
                    ts_str,
                    path.display(),
                    row + 1
                ))
            })?;

            let fields = (1..COLUMNS.len())
                .map(|i| parse_field(&record, i))
                .collect::<Result<Vec<f64>, String>>()
                .map_err(|reason| {
                    source_error(format!("{} in {} (row {})", reason, path.display(), row + 1))
                })?;

            let date = timestamp.date();
            if date < start || date > end {
                continue;
            }

            bars.push(OhlcvBar {
                symbol: symbol.to_string(),
                timestamp,
                open: fields[0],
                high: fields[1],
                low: fields[2],
                close: fields[3],
                volume: fields[4],
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            source_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry =
                entry.map_err(|e| source_error(format!("directory entry error: {}", e)))?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

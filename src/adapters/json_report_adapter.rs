//! JSON report adapter.
//!
//! Reports are pretty-printed. Undefined metrics appear as `null`.

use crate::domain::backtest::BacktestResult;
use crate::domain::comparison::Comparison;
use crate::domain::error::SigtraderError;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        JsonReportAdapter
    }

    pub fn render<T: Serialize>(value: &T) -> Result<String, SigtraderError> {
        serde_json::to_string_pretty(value).map_err(|e| SigtraderError::Report {
            reason: format!("failed to serialise report: {}", e),
        })
    }

    fn write_json<T: Serialize>(&self, value: &T, output_path: &Path) -> Result<(), SigtraderError> {
        let json = Self::render(value)?;
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, json).map_err(|e| SigtraderError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })?;
        info!(path = %output_path.display(), "report written");
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SigtraderError> {
        self.write_json(result, output_path)
    }

    fn write_comparison(
        &self,
        comparison: &Comparison,
        output_path: &Path,
    ) -> Result<(), SigtraderError> {
        self.write_json(comparison, output_path)
    }
}

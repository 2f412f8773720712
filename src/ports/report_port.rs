//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::comparison::Comparison;
use crate::domain::error::SigtraderError;
use std::path::Path;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SigtraderError>;

    fn write_comparison(
        &self,
        comparison: &Comparison,
        output_path: &Path,
    ) -> Result<(), SigtraderError>;
}

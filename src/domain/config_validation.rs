//! Configuration validation.
//!
//! Validates the `[backtest]` section before any data is fetched, and
//! provides typed readers that reject malformed values instead of silently
//! falling back to defaults.

use crate::domain::error::SigtraderError;
use crate::domain::strategy::{StrategyKind, STRATEGY_KEYS};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_initial_capital(config)?;
    validate_commission(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_symbol(config)?;
    validate_strategy_keys(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SigtraderError {
    SigtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Present-but-unparseable values are errors; absent values take `default`.
pub fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("expected a number, got '{raw}'"))),
    }
}

pub fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            invalid(
                section,
                key,
                format!("expected a non-negative integer, got '{raw}'"),
            )
        }),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = read_f64(config, "backtest", "initial_capital", 10_000.0)?;
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let pct = read_f64(config, "backtest", "commission_pct", 0.1)?;
    if !(0.0..100.0).contains(&pct) {
        return Err(invalid(
            "backtest",
            "commission_pct",
            "commission_pct must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = read_f64(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let (start_date, end_date) = read_date_range(config)?;
    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

/// `[backtest] start_date` and `end_date` as dates.
pub fn read_date_range(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), SigtraderError> {
    let start = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;
    Ok((start, end))
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, SigtraderError> {
    match value {
        None => Err(SigtraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    match config.get_string("backtest", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(SigtraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

/// Split a comma-separated strategy list into lowercase keys.
pub fn parse_strategy_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn validate_strategy_keys(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let keys = config
        .get_string("backtest", "strategies")
        .map(|raw| parse_strategy_keys(&raw))
        .unwrap_or_default();
    if keys.is_empty() {
        return Err(SigtraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "strategies".to_string(),
        });
    }
    for key in &keys {
        if StrategyKind::from_key(key).is_none() {
            return Err(invalid(
                "backtest",
                "strategies",
                format!(
                    "unknown strategy '{}', expected one of {}",
                    key,
                    STRATEGY_KEYS.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod scorer;
pub mod position;
pub mod trade;
pub mod portfolio;
pub mod metrics;
pub mod strategy;
pub mod evaluator;
pub mod backtest;
pub mod comparison;
pub mod config_validation;
pub mod error;

//! Strategy definitions: typed parameters per strategy family.
//!
//! A [`Strategy`] can only be built through [`Strategy::new`], which rejects
//! invalid parameters before any bar is processed.

use serde::Serialize;
use std::fmt;

use super::error::SigtraderError;
use super::position::Thresholds;
use super::scorer::ScoreWeights;
use super::signal::RsiBounds;

/// Config keys accepted by [`StrategyKind::from_key`].
pub const STRATEGY_KEYS: [&str; 6] = ["buy_hold", "sma", "ema", "macd_rsi", "bb_rsi", "combined"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl CrossoverParams {
    pub const SMA_DEFAULT: CrossoverParams = CrossoverParams {
        fast_period: 20,
        slow_period: 50,
    };
    pub const EMA_DEFAULT: CrossoverParams = CrossoverParams {
        fast_period: 12,
        slow_period: 26,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        MacdParams {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandParams {
    pub period: usize,
    pub dev: f64,
}

impl Default for BandParams {
    fn default() -> Self {
        BandParams {
            period: 20,
            dev: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdRsiParams {
    pub macd: MacdParams,
    pub rsi_period: usize,
    pub rsi: RsiBounds,
    pub ema_period: usize,
}

impl Default for MacdRsiParams {
    fn default() -> Self {
        MacdRsiParams {
            macd: MacdParams::default(),
            rsi_period: 14,
            rsi: RsiBounds::default(),
            ema_period: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerRsiParams {
    pub bands: BandParams,
    pub rsi_period: usize,
    pub rsi: RsiBounds,
}

impl Default for BollingerRsiParams {
    fn default() -> Self {
        BollingerRsiParams {
            bands: BandParams::default(),
            rsi_period: 14,
            rsi: RsiBounds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CombinedParams {
    pub sma: CrossoverParams,
    pub ema: CrossoverParams,
    pub macd: MacdParams,
    pub rsi_period: usize,
    pub rsi: RsiBounds,
    pub bands: BandParams,
    pub thresholds: Thresholds,
    pub weights: ScoreWeights,
}

impl Default for CombinedParams {
    fn default() -> Self {
        CombinedParams {
            sma: CrossoverParams::SMA_DEFAULT,
            ema: CrossoverParams::EMA_DEFAULT,
            macd: MacdParams::default(),
            rsi_period: 14,
            rsi: RsiBounds::default(),
            bands: BandParams::default(),
            thresholds: Thresholds::default(),
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum StrategyKind {
    BuyAndHold,
    SmaCrossover(CrossoverParams),
    EmaCrossover(CrossoverParams),
    MacdRsi(MacdRsiParams),
    BollingerRsi(BollingerRsiParams),
    Combined(CombinedParams),
}

impl StrategyKind {
    /// Default-parameter variant for a config key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "buy_hold" => Some(StrategyKind::BuyAndHold),
            "sma" => Some(StrategyKind::SmaCrossover(CrossoverParams::SMA_DEFAULT)),
            "ema" => Some(StrategyKind::EmaCrossover(CrossoverParams::EMA_DEFAULT)),
            "macd_rsi" => Some(StrategyKind::MacdRsi(MacdRsiParams::default())),
            "bb_rsi" => Some(StrategyKind::BollingerRsi(BollingerRsiParams::default())),
            "combined" => Some(StrategyKind::Combined(CombinedParams::default())),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            StrategyKind::BuyAndHold => "buy_hold",
            StrategyKind::SmaCrossover(_) => "sma",
            StrategyKind::EmaCrossover(_) => "ema",
            StrategyKind::MacdRsi(_) => "macd_rsi",
            StrategyKind::BollingerRsi(_) => "bb_rsi",
            StrategyKind::Combined(_) => "combined",
        }
    }

    /// Human-readable default name.
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::BuyAndHold => "Buy & Hold",
            StrategyKind::SmaCrossover(_) => "SMA Crossover",
            StrategyKind::EmaCrossover(_) => "EMA Crossover",
            StrategyKind::MacdRsi(_) => "MACD + RSI",
            StrategyKind::BollingerRsi(_) => "Bollinger + RSI",
            StrategyKind::Combined(_) => "Combined Score",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    name: String,
    kind: StrategyKind,
}

impl Strategy {
    pub fn new(name: impl Into<String>, kind: StrategyKind) -> Result<Self, SigtraderError> {
        let name = name.into();
        validate_kind(&kind).map_err(|err| match err {
            SigtraderError::InvalidStrategy { reason, .. } => SigtraderError::InvalidStrategy {
                strategy: name.clone(),
                reason,
            },
            other => other,
        })?;
        Ok(Strategy { name, kind })
    }

    /// Strategy with default parameters, named after its kind.
    pub fn from_key(key: &str) -> Result<Self, SigtraderError> {
        let kind = StrategyKind::from_key(key).ok_or_else(|| {
            SigtraderError::invalid_strategy(
                key,
                format!("unknown strategy, expected one of {}", STRATEGY_KEYS.join(", ")),
            )
        })?;
        Strategy::new(kind.label(), kind)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StrategyKind {
        &self.kind
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.kind.key())
    }
}

fn invalid(reason: impl Into<String>) -> SigtraderError {
    SigtraderError::invalid_strategy("", reason)
}

fn positive(field: &str, value: usize) -> Result<(), SigtraderError> {
    if value == 0 {
        return Err(invalid(format!("{field} must be greater than 0")));
    }
    Ok(())
}

fn validate_crossover(prefix: &str, p: &CrossoverParams) -> Result<(), SigtraderError> {
    positive(&format!("{prefix}fast_period"), p.fast_period)?;
    positive(&format!("{prefix}slow_period"), p.slow_period)?;
    if p.fast_period >= p.slow_period {
        return Err(invalid(format!(
            "{prefix}fast_period ({}) must be below {prefix}slow_period ({})",
            p.fast_period, p.slow_period
        )));
    }
    Ok(())
}

fn validate_macd(p: &MacdParams) -> Result<(), SigtraderError> {
    positive("macd_fast", p.fast)?;
    positive("macd_slow", p.slow)?;
    positive("macd_signal", p.signal)?;
    if p.fast >= p.slow {
        return Err(invalid(format!(
            "macd_fast ({}) must be below macd_slow ({})",
            p.fast, p.slow
        )));
    }
    Ok(())
}

fn validate_bands(p: &BandParams) -> Result<(), SigtraderError> {
    positive("bb_period", p.period)?;
    if !p.dev.is_finite() || p.dev <= 0.0 {
        return Err(invalid(format!("bb_dev must be positive, got {}", p.dev)));
    }
    Ok(())
}

fn validate_rsi(period: usize, bounds: &RsiBounds) -> Result<(), SigtraderError> {
    positive("rsi_period", period)?;
    bounds.validate()
}

fn validate_kind(kind: &StrategyKind) -> Result<(), SigtraderError> {
    match kind {
        StrategyKind::BuyAndHold => Ok(()),
        StrategyKind::SmaCrossover(p) | StrategyKind::EmaCrossover(p) => validate_crossover("", p),
        StrategyKind::MacdRsi(p) => {
            validate_macd(&p.macd)?;
            validate_rsi(p.rsi_period, &p.rsi)?;
            positive("ema_period", p.ema_period)
        }
        StrategyKind::BollingerRsi(p) => {
            validate_bands(&p.bands)?;
            validate_rsi(p.rsi_period, &p.rsi)
        }
        StrategyKind::Combined(p) => {
            validate_crossover("sma_", &p.sma)?;
            validate_crossover("ema_", &p.ema)?;
            validate_macd(&p.macd)?;
            validate_rsi(p.rsi_period, &p.rsi)?;
            validate_bands(&p.bands)?;
            Thresholds::new(p.thresholds.buy(), p.thresholds.sell())?;
            let weights = p.weights.max_abs_score();
            if !weights.is_finite() {
                return Err(invalid("score weights must be finite"));
            }
            Ok(())
        }
    }
}

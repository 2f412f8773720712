//! Domain error types.

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid strategy {strategy}: {reason}")]
    InvalidStrategy { strategy: String, reason: String },

    #[error("invalid price bar at index {index}: {reason}")]
    InvalidBars { index: usize, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigtraderError {
    pub(crate) fn invalid_strategy(strategy: &str, reason: impl Into<String>) -> Self {
        SigtraderError::InvalidStrategy {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_bars(index: usize, reason: impl Into<String>) -> Self {
        SigtraderError::InvalidBars {
            index,
            reason: reason.into(),
        }
    }

    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            SigtraderError::Io(_) | SigtraderError::Report { .. } => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. } => 2,
            SigtraderError::DataSource { .. } => 3,
            SigtraderError::InvalidStrategy { .. } => 4,
            SigtraderError::InvalidBars { .. } | SigtraderError::NoData { .. } => 5,
        }
    }
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

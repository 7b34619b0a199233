//! Domain error types.

use crate::domain::universe::TickerListError;

/// Top-level error type for allocator.
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    #[error("invalid weights: {reason}")]
    Validation { reason: String },

    #[error("invalid backtester state: {reason}")]
    State { reason: String },

    #[error("insufficient data for {context}: have {observations} observations, need {minimum}")]
    InsufficientData {
        context: String,
        observations: usize,
        minimum: usize,
    },

    #[error("quadratic solver unavailable: {reason}")]
    SolverUnavailable { reason: String },

    #[error("empty universe: {reason}")]
    EmptyUniverse { reason: String },

    #[error("price data error: {reason}")]
    Data { reason: String },

    #[error("export error: {reason}")]
    Export { reason: String },

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

    #[error(transparent)]
    TickerList(#[from] TickerListError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PortfolioError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            PortfolioError::Io(_) | PortfolioError::Export { .. } => 1,
            PortfolioError::ConfigParse { .. }
            | PortfolioError::ConfigMissing { .. }
            | PortfolioError::ConfigInvalid { .. }
            | PortfolioError::TickerList(_) => 2,
            PortfolioError::Data { .. } => 3,
            PortfolioError::Validation { .. } | PortfolioError::State { .. } => 4,
            PortfolioError::InsufficientData { .. } | PortfolioError::EmptyUniverse { .. } => 5,
            PortfolioError::SolverUnavailable { .. } => 6,
        }
    }
}

impl From<&PortfolioError> for std::process::ExitCode {
    fn from(err: &PortfolioError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

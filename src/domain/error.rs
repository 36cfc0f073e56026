//! Error and skip types.
//!
//! The sizing math itself never fails loudly: absent results are `Option`s.
//! `SizerError` covers the collaborators around it (data files, config, CLI).

use std::fmt;

/// Top-level error type for kellysizer.
#[derive(Debug, thiserror::Error)]
pub enum SizerError {
    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient data for {ticker}: have {observations} returns, need {minimum}")]
    InsufficientData {
        ticker: String,
        observations: usize,
        minimum: usize,
    },

    #[error("no tickers produced a usable allocation")]
    NoCandidates,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<&SizerError> for std::process::ExitCode {
    fn from(err: &SizerError) -> Self {
        let code: u8 = match err {
            SizerError::Io(_) | SizerError::Json(_) => 1,
            SizerError::ConfigParse { .. }
            | SizerError::ConfigMissing { .. }
            | SizerError::ConfigInvalid { .. } => 2,
            SizerError::Data { .. } => 3,
            SizerError::NoData { .. }
            | SizerError::InsufficientData { .. }
            | SizerError::NoCandidates => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Why a ticker was left out of a batch.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The data provider returned an error or nothing at all.
    NoData { detail: String },
    /// Too few returns, or no winning/losing days in the window.
    InsufficientData,
    /// Kelly fraction was zero, negative or not a number.
    NoEdge,
    /// The dollar allocation was not above the minimum position size.
    BelowMinimum { allocation: f64, minimum: f64 },
    /// Ranked below the `max_positions` cut.
    PositionLimit,
    /// The allocation does not buy one whole option contract.
    NoWholeContract,
    /// Underlying too expensive for the options pass.
    PriceAboveLimit { price: f64, limit: f64 },
    /// No option contract survived screening and scoring.
    NoOpportunities,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData { detail } => write!(f, "no data ({detail})"),
            SkipReason::InsufficientData => write!(f, "insufficient data"),
            SkipReason::NoEdge => write!(f, "no positive edge"),
            SkipReason::BelowMinimum {
                allocation,
                minimum,
            } => write!(f, "allocation ${allocation:.2} not above minimum ${minimum:.2}"),
            SkipReason::PositionLimit => write!(f, "cut by position limit"),
            SkipReason::NoWholeContract => write!(f, "allocation buys no whole contract"),
            SkipReason::PriceAboveLimit { price, limit } => {
                write!(f, "price {price:.2} above limit {limit:.2}")
            }
            SkipReason::NoOpportunities => write!(f, "no option opportunities"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

//! Configuration validation.
//!
//! Validates all config fields before a sizing run. Absent keys fall back
//! to their defaults, so only values that are present and wrong fail.

use std::collections::HashSet;

use crate::domain::allocation::{
    DEFAULT_MAX_POSITIONS, DEFAULT_OPTION_SCALING_FACTOR, DEFAULT_PORTFOLIO_VALUE,
    DEFAULT_SCALING_FACTOR,
};
use crate::domain::error::SizerError;
use crate::domain::estimator::{DEFAULT_CONFIDENCE_LEVEL, DEFAULT_RISK_FREE_RATE};
use crate::domain::kelly::DEFAULT_RISK_AVERSION;
use crate::domain::pipeline::DEFAULT_MAX_UNDERLYING_PRICE;
use crate::domain::price::{DEFAULT_LOOKBACK_DAYS, MIN_RETURN_OBSERVATIONS};
use crate::domain::scoring::{DEFAULT_MAX_EXPIRY_DAYS, DEFAULT_MIN_OPEN_INTEREST, DEFAULT_TOP_N};
use crate::ports::config_port::ConfigPort;

pub fn validate_sizing_config(config: &dyn ConfigPort) -> Result<(), SizerError> {
    validate_portfolio_value(config)?;
    validate_scaling_factor(config, "scaling_factor", DEFAULT_SCALING_FACTOR)?;
    validate_scaling_factor(config, "option_scaling_factor", DEFAULT_OPTION_SCALING_FACTOR)?;
    validate_max_positions(config)?;
    validate_risk_aversion(config)?;
    validate_lookback(config)?;
    validate_risk_free_rate(config)?;
    validate_confidence_level(config)?;
    Ok(())
}

pub fn validate_options_config(config: &dyn ConfigPort) -> Result<(), SizerError> {
    let expiry = config.get_int("options", "max_expiry_days", DEFAULT_MAX_EXPIRY_DAYS);
    if expiry <= 0 {
        return Err(invalid("options", "max_expiry_days", "max_expiry_days must be positive"));
    }
    let open_interest = config.get_int(
        "options",
        "min_open_interest",
        DEFAULT_MIN_OPEN_INTEREST as i64,
    );
    if open_interest < 0 {
        return Err(invalid(
            "options",
            "min_open_interest",
            "min_open_interest must be non-negative",
        ));
    }
    let top_n = config.get_int("options", "top_n", DEFAULT_TOP_N as i64);
    if top_n <= 0 {
        return Err(invalid("options", "top_n", "top_n must be positive"));
    }
    let max_price = config.get_double(
        "options",
        "max_underlying_price",
        DEFAULT_MAX_UNDERLYING_PRICE,
    );
    if !(max_price > 0.0 && max_price.is_finite()) {
        return Err(invalid(
            "options",
            "max_underlying_price",
            "max_underlying_price must be positive",
        ));
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SizerError> {
    match config.get_string("data", "directory") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(SizerError::ConfigMissing {
                section: "data".to_string(),
                key: "directory".to_string(),
            });
        }
    }
    if let Some(raw) = config.get_string("data", "tickers") {
        parse_tickers(&raw)?;
    }
    Ok(())
}

/// Split a comma-separated ticker list, uppercased, rejecting empty
/// entries and duplicates.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, SizerError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(invalid("data", "tickers", "empty entry in ticker list"));
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(SizerError::ConfigInvalid {
                section: "data".to_string(),
                key: "tickers".to_string(),
                reason: format!("duplicate ticker: {ticker}"),
            });
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

fn invalid(section: &str, key: &str, reason: &str) -> SizerError {
    SizerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_portfolio_value(config: &dyn ConfigPort) -> Result<(), SizerError> {
    let value = config.get_double("portfolio", "value", DEFAULT_PORTFOLIO_VALUE);
    if !(value > 0.0 && value.is_finite()) {
        return Err(invalid("portfolio", "value", "value must be positive"));
    }
    Ok(())
}

fn validate_scaling_factor(
    config: &dyn ConfigPort,
    key: &str,
    default: f64,
) -> Result<(), SizerError> {
    let value = config.get_double("portfolio", key, default);
    if !(value > 0.0 && value <= 1.0) {
        return Err(SizerError::ConfigInvalid {
            section: "portfolio".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be in (0, 1]"),
        });
    }
    Ok(())
}

fn validate_max_positions(config: &dyn ConfigPort) -> Result<(), SizerError> {
    let value = config.get_int("portfolio", "max_positions", DEFAULT_MAX_POSITIONS as i64);
    if value < 1 {
        return Err(invalid(
            "portfolio",
            "max_positions",
            "max_positions must be at least 1",
        ));
    }
    Ok(())
}

fn validate_risk_aversion(config: &dyn ConfigPort) -> Result<(), SizerError> {
    let value = config.get_double("portfolio", "risk_aversion", DEFAULT_RISK_AVERSION);
    if !(value >= 0.0 && value.is_finite()) {
        return Err(invalid(
            "portfolio",
            "risk_aversion",
            "risk_aversion must be non-negative",
        ));
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), SizerError> {
    let value = config.get_int("estimation", "lookback_days", DEFAULT_LOOKBACK_DAYS as i64);
    if value < MIN_RETURN_OBSERVATIONS as i64 {
        return Err(SizerError::ConfigInvalid {
            section: "estimation".to_string(),
            key: "lookback_days".to_string(),
            reason: format!("lookback_days must be at least {MIN_RETURN_OBSERVATIONS}"),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), SizerError> {
    let value = config.get_double("estimation", "risk_free_rate", DEFAULT_RISK_FREE_RATE);
    if !(value >= 0.0 && value < 1.0) {
        return Err(invalid(
            "estimation",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_confidence_level(config: &dyn ConfigPort) -> Result<(), SizerError> {
    let value = config.get_double("estimation", "confidence_level", DEFAULT_CONFIDENCE_LEVEL);
    if !(value > 0.0 && value < 1.0) {
        return Err(invalid(
            "estimation",
            "confidence_level",
            "confidence_level must be strictly between 0 and 1",
        ));
    }
    Ok(())
}

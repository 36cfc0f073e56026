//! A single risk/reward score blending confidence-weighted Kelly with the
//! Sortino and Calmar ratios of the same return series.

use serde::Serialize;

use super::kelly::KellyResult;
use super::price::{ReturnSeries, TRADING_DAYS_PER_YEAR, max_drawdown};

const KELLY_WEIGHT: f64 = 0.4;
const SORTINO_WEIGHT: f64 = 0.3;
const CALMAR_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedMetric {
    pub unified_score: f64,
    pub risk_adjusted_kelly: f64,
    pub confidence_weighted_kelly: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub avg_return: f64,
    pub volatility: f64,
    /// Of the compounded equity curve; non-positive.
    pub max_drawdown: f64,
    pub win_probability: f64,
    pub confidence_factor: f64,
    pub sample_size: usize,
}

/// Mean excess return over downside deviation, with the downside measured
/// across every observation against a zero target.
pub fn sortino_ratio(returns: &ReturnSeries, annual_risk_free_rate: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let daily_rf = (1.0 + annual_risk_free_rate).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0;
    let n = returns.len() as f64;

    let excess: Vec<f64> = returns.as_slice().iter().map(|r| r - daily_rf).collect();
    let mean_excess = excess.iter().sum::<f64>() / n;
    let downside_variance = excess.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>() / n;
    let downside_deviation = downside_variance.sqrt();

    if downside_deviation > 0.0 {
        mean_excess / downside_deviation
    } else {
        0.0
    }
}

/// Running product of `1 + r`.
pub fn equity_curve(returns: &ReturnSeries) -> Vec<f64> {
    returns
        .as_slice()
        .iter()
        .scan(1.0, |equity, r| {
            *equity *= 1.0 + r;
            Some(*equity)
        })
        .collect()
}

/// Compound annual growth over `days` trading days.
pub fn annualized_return(returns: &ReturnSeries, days: f64) -> f64 {
    if returns.is_empty() || days <= 0.0 {
        return 0.0;
    }
    let growth: f64 = returns.as_slice().iter().map(|r| 1.0 + r).product();
    let years = days / TRADING_DAYS_PER_YEAR;
    growth.powf(1.0 / years) - 1.0
}

/// CAGR over the absolute worst drawdown; 0 without a drawdown.
pub fn calmar_ratio(returns: &ReturnSeries, lookback_days: f64) -> f64 {
    let drawdown = max_drawdown(&equity_curve(returns)).abs();
    if drawdown > 0.0 {
        annualized_return(returns, lookback_days) / drawdown
    } else {
        0.0
    }
}

pub fn unified_metric(
    returns: &ReturnSeries,
    kelly: &KellyResult,
    win_probability: f64,
    annual_risk_free_rate: f64,
    lookback_days: f64,
) -> UnifiedMetric {
    let cw_kelly = kelly.confidence_weighted_kelly;
    let sortino = sortino_ratio(returns, annual_risk_free_rate);
    let calmar = calmar_ratio(returns, lookback_days);
    let unified_score =
        (KELLY_WEIGHT * cw_kelly + SORTINO_WEIGHT * sortino + CALMAR_WEIGHT * calmar).clamp(0.0, 1.0);

    UnifiedMetric {
        unified_score,
        risk_adjusted_kelly: cw_kelly * unified_score,
        confidence_weighted_kelly: cw_kelly,
        sortino_ratio: sortino,
        calmar_ratio: calmar,
        avg_return: returns.mean(),
        volatility: returns.sample_std_dev(),
        max_drawdown: max_drawdown(&equity_curve(returns)),
        win_probability,
        confidence_factor: kelly.confidence_factor,
        sample_size: returns.len(),
    }
}

//! Return statistics: win probability, payoff sizes, volatility, and the
//! confidence attached to each of them.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use super::kelly::{self, ConfidenceWeights, KellyResult};
use super::price::{ReturnSeries, TRADING_DAYS_PER_YEAR, max_drawdown};

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

const SAMPLE_CONFIDENCE_FLOOR: f64 = 0.5;
const SAMPLE_CONFIDENCE_CAP: f64 = 0.95;
const SAMPLE_CONFIDENCE_SPAN: f64 = 0.4;
/// Sample size scale for the win-probability confidence.
pub const RETURNS_CONFIDENCE_SCALE: f64 = 1000.0;
/// Sample size scale for the gain/loss confidences.
pub const PAYOFF_CONFIDENCE_SCALE: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityEstimate {
    pub win_probability: f64,
    pub avg_gain: f64,
    pub avg_loss: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sample_size: usize,
}

impl ProbabilityEstimate {
    pub fn kelly_fraction(&self) -> f64 {
        kelly::kelly_fraction(self.win_probability, self.avg_gain, self.avg_loss)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub margin_of_error: f64,
    pub confidence_level: f64,
    pub sample_confidence: f64,
    pub sample_size: usize,
}

/// Ad hoc confidence weight from a sample size:
/// `min(0.95, 0.5 + n / scale × 0.4)`.
///
/// This is the weight fed to the Kelly calculator, not a coverage probability.
pub fn sample_confidence(n: usize, scale: f64) -> f64 {
    (SAMPLE_CONFIDENCE_FLOOR + (n as f64 / scale) * SAMPLE_CONFIDENCE_SPAN)
        .min(SAMPLE_CONFIDENCE_CAP)
}

/// Two-sided z-score for a confidence level in (0, 1).
pub fn z_score(confidence_level: f64) -> Option<f64> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return None;
    }
    let normal = Normal::new(0.0, 1.0).ok()?;
    Some(normal.inverse_cdf((1.0 + confidence_level) / 2.0))
}

/// Normal-approximation interval around the fraction of positive returns.
pub fn confidence_interval(
    returns: &ReturnSeries,
    confidence_level: f64,
) -> Option<ConfidenceInterval> {
    if returns.is_empty() {
        return None;
    }
    let total = returns.len();
    let wins = returns.gains().count();
    let p_hat = wins as f64 / total as f64;

    let se = (p_hat * (1.0 - p_hat) / total as f64).sqrt();
    let margin_of_error = z_score(confidence_level)? * se;

    Some(ConfidenceInterval {
        point_estimate: p_hat,
        lower_bound: (p_hat - margin_of_error).max(0.0),
        upper_bound: (p_hat + margin_of_error).min(1.0),
        margin_of_error,
        confidence_level,
        sample_confidence: sample_confidence(total, RETURNS_CONFIDENCE_SCALE),
        sample_size: total,
    })
}

/// Estimate Kelly inputs from a window of closes.
///
/// Absent when there are fewer than the minimum usable returns, or no
/// winning or no losing days.
pub fn estimate_probabilities(closes: &[f64], risk_free_rate: f64) -> Option<ProbabilityEstimate> {
    let returns = ReturnSeries::from_closes(closes);
    if !returns.is_usable() {
        return None;
    }

    let gains: Vec<f64> = returns.gains().collect();
    let losses: Vec<f64> = returns.losses().collect();
    if gains.is_empty() || losses.is_empty() {
        return None;
    }

    let n = returns.len() as f64;
    let win_probability = gains.len() as f64 / n;
    let avg_gain = gains.iter().sum::<f64>() / gains.len() as f64;
    let avg_loss = (losses.iter().sum::<f64>() / losses.len() as f64).abs();

    let volatility = returns.sample_std_dev();
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let sharpe_ratio = if volatility > 0.0 {
        (returns.mean() - daily_rf) / volatility
    } else {
        0.0
    };

    let total_return = match (closes.first(), closes.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
        _ => 0.0,
    };

    Some(ProbabilityEstimate {
        win_probability,
        avg_gain,
        avg_loss,
        volatility,
        sharpe_ratio,
        total_return,
        max_drawdown: max_drawdown(closes),
        sample_size: returns.len(),
    })
}

/// An estimate together with its interval, per-input confidences and the
/// confidence-weighted Kelly bracket built from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceEstimate {
    pub estimate: ProbabilityEstimate,
    pub interval: ConfidenceInterval,
    pub weights: ConfidenceWeights,
    pub kelly: KellyResult,
}

pub fn estimate_with_confidence(
    closes: &[f64],
    risk_free_rate: f64,
    confidence_level: f64,
    risk_aversion: f64,
) -> Option<ConfidenceEstimate> {
    let estimate = estimate_probabilities(closes, risk_free_rate)?;
    let returns = ReturnSeries::from_closes(closes);
    let interval = confidence_interval(&returns, confidence_level)?;

    let weights = ConfidenceWeights {
        probability: interval.sample_confidence,
        gain: sample_confidence(returns.gains().count(), PAYOFF_CONFIDENCE_SCALE),
        loss: sample_confidence(returns.losses().count(), PAYOFF_CONFIDENCE_SCALE),
    };
    let kelly = kelly::confidence_weighted_kelly(
        estimate.win_probability,
        estimate.avg_gain,
        estimate.avg_loss,
        weights,
        risk_aversion,
    );

    Some(ConfidenceEstimate {
        estimate,
        interval,
        weights,
        kelly,
    })
}

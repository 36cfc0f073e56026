//! Close-price points and the daily return series derived from them.

use chrono::NaiveDate;
use serde::Serialize;

/// Minimum number of usable daily returns before any statistics are trusted.
pub const MIN_RETURN_OBSERVATIONS: usize = 30;

/// Trading days per year, used for every annualization in the crate.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Default lookback, in daily returns.
pub const DEFAULT_LOOKBACK_DAYS: usize = 252;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Ordered daily fractional returns. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    returns: Vec<f64>,
}

impl ReturnSeries {
    /// Build from raw returns, dropping non-finite values.
    pub fn from_returns(returns: impl IntoIterator<Item = f64>) -> Self {
        Self {
            returns: returns.into_iter().filter(|r| r.is_finite()).collect(),
        }
    }

    /// Percentage change between consecutive closes.
    ///
    /// A zero previous close produces a non-finite change, which is dropped.
    pub fn from_closes(closes: &[f64]) -> Self {
        Self::from_returns(closes.windows(2).map(|w| (w[1] - w[0]) / w[0]))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.returns
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// True when there are enough observations for estimation.
    pub fn is_usable(&self) -> bool {
        self.returns.len() >= MIN_RETURN_OBSERVATIONS
    }

    pub fn mean(&self) -> f64 {
        if self.returns.is_empty() {
            return 0.0;
        }
        self.returns.iter().sum::<f64>() / self.returns.len() as f64
    }

    /// Sample standard deviation (n - 1 denominator); 0 below two points.
    pub fn sample_std_dev(&self) -> f64 {
        sample_std_dev(&self.returns)
    }

    pub fn gains(&self) -> impl Iterator<Item = f64> + '_ {
        self.returns.iter().copied().filter(|r| *r > 0.0)
    }

    pub fn losses(&self) -> impl Iterator<Item = f64> + '_ {
        self.returns.iter().copied().filter(|r| *r < 0.0)
    }
}

pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// The trailing window of closes that yields `lookback` returns.
pub fn lookback_window(prices: &[PricePoint], lookback: usize) -> Vec<f64> {
    let start = prices.len().saturating_sub(lookback + 1);
    prices[start..].iter().map(|p| p.close).collect()
}

/// Minimum over time of `(price - running_peak) / running_peak`. Non-positive.
pub fn max_drawdown(closes: &[f64]) -> f64 {
    let Some(&first) = closes.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut worst = 0.0_f64;
    for &price in closes {
        if price > peak {
            peak = price;
        }
        if peak > 0.0 {
            worst = worst.min((price - peak) / peak);
        }
    }
    worst
}

/// Annualized volatility from the trailing `window` daily returns.
///
/// Falls back to `fallback` when fewer than two returns are available.
pub fn annualized_volatility(closes: &[f64], window: usize, fallback: f64) -> f64 {
    let start = closes.len().saturating_sub(window);
    let series = ReturnSeries::from_closes(&closes[start..]);
    if series.len() < 2 {
        return fallback;
    }
    series.sample_std_dev() * TRADING_DAYS_PER_YEAR.sqrt()
}

//! Black-Scholes first-order Greeks for European calls and puts.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Calendar-day convention for option time to expiry.
pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

impl Greeks {
    fn is_valid(&self) -> bool {
        !(self.delta.is_nan() || self.gamma.is_nan() || self.theta.is_nan() || self.vega.is_nan())
    }
}

/// Greeks for one contract.
///
/// `days_to_expiry` is in calendar days; `rate` and `volatility` are annual.
/// Absent for non-positive spot, strike, time or volatility, and when any
/// component comes out NaN.
pub fn compute_greeks(
    spot: f64,
    strike: f64,
    days_to_expiry: f64,
    rate: f64,
    volatility: f64,
    option_type: OptionType,
) -> Option<Greeks> {
    let t = days_to_expiry / DAYS_PER_YEAR;
    if !(t > 0.0 && volatility > 0.0 && spot > 0.0 && strike > 0.0) {
        return None;
    }

    let normal = Normal::new(0.0, 1.0).ok()?;
    let sqrt_t = t.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * volatility * volatility) * t) / (volatility * sqrt_t);
    let d2 = d1 - volatility * sqrt_t;

    let pdf_d1 = normal.pdf(d1);
    let gamma = pdf_d1 / (spot * volatility * sqrt_t);
    let vega = spot * sqrt_t * pdf_d1;
    let decay = -spot * pdf_d1 * volatility / (2.0 * sqrt_t);
    let discounted_strike = rate * strike * (-rate * t).exp();

    let greeks = match option_type {
        OptionType::Call => Greeks {
            delta: normal.cdf(d1),
            gamma,
            theta: decay - discounted_strike * normal.cdf(d2),
            vega,
        },
        OptionType::Put => Greeks {
            delta: normal.cdf(d1) - 1.0,
            gamma,
            theta: decay + discounted_strike * normal.cdf(-d2),
            vega,
        },
    };

    greeks.is_valid().then_some(greeks)
}

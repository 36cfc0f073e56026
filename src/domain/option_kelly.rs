//! Kelly inputs for a long call.
//!
//! The payoff is collapsed to a single point estimate: the win probability
//! is the chance of a 25% up-move within the contract's life under a normal
//! approximation, the gain is the return on premium at that move, and the
//! loss is the whole premium.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use super::kelly::kelly_fraction;
use super::price::TRADING_DAYS_PER_YEAR;
use super::scoring::OptionOpportunity;

const TARGET_MOVE: f64 = 0.25;
/// Gain assumed when a 25% move would still leave the call out of the money.
const FALLBACK_GAIN: f64 = 0.1;
const PREMIUM_LOSS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptionKellyInputs {
    pub win_probability: f64,
    pub potential_gain: f64,
    pub max_loss: f64,
    pub kelly_fraction: f64,
}

/// Absent when `daily_volatility × sqrt(days / 252)` is not positive.
pub fn option_kelly_inputs(
    spot: f64,
    strike: f64,
    ask: f64,
    days_to_expiry: i64,
    daily_volatility: f64,
) -> Option<OptionKellyInputs> {
    let time_factor = (days_to_expiry as f64 / TRADING_DAYS_PER_YEAR).sqrt();
    let spread = daily_volatility * time_factor;
    if !(spread > 0.0) || !(ask > 0.0) {
        return None;
    }

    let normal = Normal::new(0.0, 1.0).ok()?;
    let win_probability = 1.0 - normal.cdf(TARGET_MOVE / spread);

    let target = spot * (1.0 + TARGET_MOVE);
    let potential_gain = if target > strike {
        (target - strike) / ask
    } else {
        FALLBACK_GAIN
    };

    Some(OptionKellyInputs {
        win_probability,
        potential_gain,
        max_loss: PREMIUM_LOSS,
        kelly_fraction: kelly_fraction(win_probability, potential_gain, PREMIUM_LOSS),
    })
}

pub fn for_opportunity(
    opportunity: &OptionOpportunity,
    daily_volatility: f64,
) -> Option<OptionKellyInputs> {
    let c = &opportunity.contract;
    option_kelly_inputs(opportunity.spot, c.strike, c.ask, c.days_to_expiry, daily_volatility)
}

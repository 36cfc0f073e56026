//! Listed call contracts and their projected payoffs.

use chrono::NaiveDate;
use serde::Serialize;

/// Shares of underlying controlled by one contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Asks below this are treated as missing quotes.
pub const MIN_ASK: f64 = 0.01;

/// One row of an option chain, as supplied by the market data provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionContract {
    pub ticker: String,
    pub strike: f64,
    pub ask: f64,
    pub bid: f64,
    pub expiry: NaiveDate,
    pub days_to_expiry: i64,
    pub open_interest: u64,
    pub volume: u64,
}

impl OptionContract {
    /// A quote is usable when the ask is present and at least one cent.
    pub fn has_usable_ask(&self) -> bool {
        self.ask.is_finite() && self.ask >= MIN_ASK
    }

    /// Spot over strike.
    pub fn moneyness(&self, spot: f64) -> f64 {
        spot / self.strike
    }

    pub fn is_near_the_money(&self, spot: f64) -> bool {
        let m = self.moneyness(spot);
        m > 0.8 && m < 1.2
    }

    /// Return on premium at expiry if the underlying ends at `price`.
    pub fn return_at(&self, price: f64) -> f64 {
        if price > self.strike {
            (price - self.strike) / self.ask
        } else {
            0.0
        }
    }

    /// Dollar cost of one contract.
    pub fn contract_cost(&self) -> f64 {
        self.ask * CONTRACT_MULTIPLIER
    }
}

/// Return on premium for hypothetical moves of the underlying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedReturns {
    pub move_25: f64,
    pub move_50: f64,
    pub move_100: f64,
}

impl ProjectedReturns {
    pub fn for_contract(contract: &OptionContract, spot: f64) -> Self {
        Self {
            move_25: contract.return_at(spot * 1.25),
            move_50: contract.return_at(spot * 1.5),
            move_100: contract.return_at(spot * 2.0),
        }
    }
}

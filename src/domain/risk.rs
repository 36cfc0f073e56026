//! Portfolio-level risk summary of a finished allocation.

use serde::Serialize;

use super::allocation::PortfolioAllocation;

/// Multiple of weighted volatility used as a rough drawdown proxy.
const DRAWDOWN_VOLATILITY_MULTIPLE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskMetrics {
    /// Value-weighted `win_probability × avg_gain`.
    pub expected_return: f64,
    pub portfolio_volatility: f64,
    pub portfolio_sharpe: f64,
    pub max_drawdown_estimate: f64,
    /// Largest position's share of allocated capital.
    pub concentration_risk: f64,
    pub number_of_positions: usize,
}

impl RiskMetrics {
    /// Absent for an allocation with no entries or nothing allocated.
    /// Entries without a Sharpe ratio contribute zero to it.
    pub fn compute(allocation: &PortfolioAllocation) -> Option<Self> {
        let total = allocation.total_allocated;
        if allocation.entries.is_empty() || !(total > 0.0) {
            return None;
        }

        let mut volatility = 0.0;
        let mut sharpe = 0.0;
        let mut expected_return = 0.0;
        let mut largest = 0.0_f64;
        for entry in &allocation.entries {
            let weight = entry.dollar_allocation / total;
            let p = &entry.provenance;
            volatility += p.volatility * weight;
            sharpe += p.sharpe_ratio.unwrap_or(0.0) * weight;
            expected_return += p.win_probability * p.avg_gain * weight;
            largest = largest.max(entry.dollar_allocation);
        }

        Some(Self {
            expected_return,
            portfolio_volatility: volatility,
            portfolio_sharpe: sharpe,
            max_drawdown_estimate: volatility * DRAWDOWN_VOLATILITY_MULTIPLE,
            concentration_risk: largest / total,
            number_of_positions: allocation.entries.len(),
        })
    }
}

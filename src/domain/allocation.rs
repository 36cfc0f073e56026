//! Portfolio allocation from per-asset Kelly fractions.
//!
//! Each candidate is sized as `scaled_kelly × portfolio_value`, capped at a
//! per-position share of the portfolio and dropped below a dollar floor.
//! Survivors are ranked by the fraction used for sizing, limited to
//! `max_positions`, and shrunk proportionally if they would overspend.
//! Entries that a shrink pushes to or under their floor are dropped, and
//! every rejected ticker is reported with its reason.

use serde::Serialize;

use super::error::{SkipReason, SkippedTicker};
use super::estimator::{ConfidenceEstimate, ProbabilityEstimate};
use super::option_kelly::OptionKellyInputs;
use super::scoring::OptionOpportunity;

pub const DEFAULT_PORTFOLIO_VALUE: f64 = 1000.0;
pub const DEFAULT_SCALING_FACTOR: f64 = 0.5;
pub const DEFAULT_OPTION_SCALING_FACTOR: f64 = 0.25;
pub const DEFAULT_MAX_POSITIONS: usize = 10;

pub const STOCK_MAX_POSITION_FRACTION: f64 = 0.20;
pub const STOCK_MIN_ALLOCATION: f64 = 10.0;
pub const OPTION_MAX_POSITION_FRACTION: f64 = 0.05;
pub const OPTION_MIN_ALLOCATION: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationKind {
    Stock,
    ConfidenceWeighted,
    Option,
}

/// Position-limit policy for one allocation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPolicy {
    pub scaling_factor: f64,
    pub max_position_fraction: f64,
    pub min_allocation: f64,
    pub max_positions: usize,
    /// Scale the cap and the floor by each candidate's confidence factor.
    pub confidence_limits: bool,
}

impl AllocationPolicy {
    pub fn stocks(scaling_factor: f64) -> Self {
        Self {
            scaling_factor,
            max_position_fraction: STOCK_MAX_POSITION_FRACTION,
            min_allocation: STOCK_MIN_ALLOCATION,
            max_positions: DEFAULT_MAX_POSITIONS,
            confidence_limits: false,
        }
    }

    pub fn options(scaling_factor: f64) -> Self {
        Self {
            scaling_factor,
            max_position_fraction: OPTION_MAX_POSITION_FRACTION,
            min_allocation: OPTION_MIN_ALLOCATION,
            max_positions: DEFAULT_MAX_POSITIONS,
            confidence_limits: false,
        }
    }

    pub fn with_confidence_limits(mut self) -> Self {
        self.confidence_limits = true;
        self
    }

    pub fn with_max_positions(mut self, max_positions: usize) -> Self {
        self.max_positions = max_positions;
        self
    }
}

/// What is being bought.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instrument {
    Stock { price: f64 },
    Call { opportunity: OptionOpportunity },
}

impl Instrument {
    /// Dollar cost of one unit: a share, or one 100-share contract.
    pub fn unit_cost(&self) -> f64 {
        match self {
            Instrument::Stock { price } => *price,
            Instrument::Call { opportunity } => opportunity.contract.contract_cost(),
        }
    }

    fn units_for(&self, dollars: f64) -> u64 {
        let cost = self.unit_cost();
        if cost > 0.0 && cost.is_finite() {
            (dollars / cost).floor() as u64
        } else {
            0
        }
    }

    fn requires_whole_unit(&self) -> bool {
        matches!(self, Instrument::Call { .. })
    }
}

/// The statistics an entry was sized from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub win_probability: f64,
    pub avg_gain: f64,
    pub avg_loss: f64,
    pub volatility: f64,
    pub sharpe_ratio: Option<f64>,
    pub confidence_factor: Option<f64>,
    pub sample_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationEntry {
    pub ticker: String,
    pub instrument: Instrument,
    pub base_kelly: f64,
    /// The fraction the position was sized from, and ranked by.
    pub kelly_fraction: f64,
    pub scaled_kelly: f64,
    pub dollar_allocation: f64,
    pub units: u64,
    /// Floor this entry is held to, after any confidence scaling.
    pub min_allocation: f64,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAllocation {
    pub kind: AllocationKind,
    pub portfolio_value: f64,
    pub entries: Vec<AllocationEntry>,
    pub total_allocated: f64,
    pub cash_remaining: f64,
    pub allocation_percentage: f64,
    /// Tickers the allocator turned away, in the order they were rejected.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<SkippedTicker>,
}

impl PortfolioAllocation {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One asset offered to the allocator.
#[derive(Debug, Clone)]
pub struct SizingRequest {
    pub ticker: String,
    pub instrument: Instrument,
    pub base_kelly: f64,
    pub kelly_fraction: f64,
    pub confidence_factor: f64,
    pub provenance: Provenance,
}

/// Collects accepted entries, then produces the ranked allocation.
#[derive(Debug)]
pub struct AllocationBuilder {
    kind: AllocationKind,
    portfolio_value: f64,
    policy: AllocationPolicy,
    entries: Vec<AllocationEntry>,
    rejected: Vec<SkippedTicker>,
}

impl AllocationBuilder {
    pub fn new(kind: AllocationKind, portfolio_value: f64, policy: AllocationPolicy) -> Self {
        Self {
            kind,
            portfolio_value,
            policy,
            entries: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn reject(&mut self, ticker: String, reason: SkipReason) -> bool {
        self.rejected.push(SkippedTicker { ticker, reason });
        false
    }

    /// Size one request. Returns false when it was rejected.
    pub fn push(&mut self, request: SizingRequest) -> bool {
        let kelly = request.kelly_fraction;
        let scaled_kelly = kelly * self.policy.scaling_factor;
        if !(kelly.is_finite() && kelly > 0.0 && scaled_kelly.is_finite() && scaled_kelly > 0.0) {
            return self.reject(request.ticker, SkipReason::NoEdge);
        }

        let limit_scale = if self.policy.confidence_limits {
            request.confidence_factor
        } else {
            1.0
        };
        let cap = self.portfolio_value * self.policy.max_position_fraction * limit_scale;
        let dollar_allocation = (scaled_kelly * self.portfolio_value).min(cap);
        let floor = self.policy.min_allocation * limit_scale;
        if !(dollar_allocation > floor) {
            return self.reject(
                request.ticker,
                SkipReason::BelowMinimum {
                    allocation: dollar_allocation,
                    minimum: floor,
                },
            );
        }

        let units = request.instrument.units_for(dollar_allocation);
        if units == 0 && request.instrument.requires_whole_unit() {
            return self.reject(request.ticker, SkipReason::NoWholeContract);
        }

        self.entries.push(AllocationEntry {
            ticker: request.ticker,
            instrument: request.instrument,
            base_kelly: request.base_kelly,
            kelly_fraction: kelly,
            scaled_kelly,
            dollar_allocation,
            units,
            min_allocation: floor,
            provenance: request.provenance,
        });
        true
    }

    pub fn build(self) -> PortfolioAllocation {
        let Self {
            kind,
            portfolio_value,
            policy,
            mut entries,
            mut rejected,
        } = self;

        entries.sort_by(|a, b| b.kelly_fraction.total_cmp(&a.kelly_fraction));
        if entries.len() > policy.max_positions {
            rejected.extend(entries.split_off(policy.max_positions).into_iter().map(|e| {
                SkippedTicker {
                    ticker: e.ticker,
                    reason: SkipReason::PositionLimit,
                }
            }));
        }

        let requested: f64 = entries.iter().map(|e| e.dollar_allocation).sum();
        if requested > portfolio_value && requested > 0.0 {
            let shrink = portfolio_value / requested;
            let mut kept = Vec::with_capacity(entries.len());
            for mut entry in entries {
                entry.dollar_allocation *= shrink;
                entry.units = entry.instrument.units_for(entry.dollar_allocation);
                let reason = if !(entry.dollar_allocation > entry.min_allocation) {
                    Some(SkipReason::BelowMinimum {
                        allocation: entry.dollar_allocation,
                        minimum: entry.min_allocation,
                    })
                } else if entry.units == 0 && entry.instrument.requires_whole_unit() {
                    Some(SkipReason::NoWholeContract)
                } else {
                    None
                };
                match reason {
                    Some(reason) => rejected.push(SkippedTicker {
                        ticker: entry.ticker,
                        reason,
                    }),
                    None => kept.push(entry),
                }
            }
            entries = kept;
        }

        let total_allocated: f64 = entries.iter().map(|e| e.dollar_allocation).sum();
        let cash_remaining = (portfolio_value - total_allocated).max(0.0);
        let allocation_percentage = if portfolio_value > 0.0 {
            total_allocated / portfolio_value * 100.0
        } else {
            0.0
        };

        PortfolioAllocation {
            kind,
            portfolio_value,
            entries,
            total_allocated,
            cash_remaining,
            allocation_percentage,
            rejected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StockCandidate {
    pub ticker: String,
    pub price: f64,
    pub estimate: ProbabilityEstimate,
}

#[derive(Debug, Clone)]
pub struct ConfidenceCandidate {
    pub ticker: String,
    pub price: f64,
    pub estimate: ConfidenceEstimate,
}

#[derive(Debug, Clone)]
pub struct OptionCandidate {
    pub opportunity: OptionOpportunity,
    pub inputs: OptionKellyInputs,
    pub daily_volatility: f64,
}

fn stock_provenance(estimate: &ProbabilityEstimate) -> Provenance {
    Provenance {
        win_probability: estimate.win_probability,
        avg_gain: estimate.avg_gain,
        avg_loss: estimate.avg_loss,
        volatility: estimate.volatility,
        sharpe_ratio: Some(estimate.sharpe_ratio),
        confidence_factor: None,
        sample_size: Some(estimate.sample_size),
    }
}

/// Plain Kelly allocation over stocks.
pub fn allocate_stocks(
    candidates: &[StockCandidate],
    portfolio_value: f64,
    policy: AllocationPolicy,
) -> PortfolioAllocation {
    let mut builder = AllocationBuilder::new(AllocationKind::Stock, portfolio_value, policy);
    for c in candidates {
        let kelly = c.estimate.kelly_fraction();
        builder.push(SizingRequest {
            ticker: c.ticker.clone(),
            instrument: Instrument::Stock { price: c.price },
            base_kelly: kelly,
            kelly_fraction: kelly,
            confidence_factor: 1.0,
            provenance: stock_provenance(&c.estimate),
        });
    }
    builder.build()
}

/// Allocation sized from confidence-weighted Kelly. The policy's cap and
/// floor are scaled by each candidate's confidence factor.
pub fn allocate_confidence_weighted(
    candidates: &[ConfidenceCandidate],
    portfolio_value: f64,
    policy: AllocationPolicy,
) -> PortfolioAllocation {
    let policy = policy.with_confidence_limits();
    let mut builder =
        AllocationBuilder::new(AllocationKind::ConfidenceWeighted, portfolio_value, policy);
    for c in candidates {
        let kelly = &c.estimate.kelly;
        let mut provenance = stock_provenance(&c.estimate.estimate);
        provenance.confidence_factor = Some(kelly.confidence_factor);
        builder.push(SizingRequest {
            ticker: c.ticker.clone(),
            instrument: Instrument::Stock { price: c.price },
            base_kelly: kelly.base_kelly,
            kelly_fraction: kelly.confidence_weighted_kelly,
            confidence_factor: kelly.confidence_factor,
            provenance,
        });
    }
    builder.build()
}

/// Allocation over scored call opportunities.
pub fn allocate_options(
    candidates: &[OptionCandidate],
    portfolio_value: f64,
    policy: AllocationPolicy,
) -> PortfolioAllocation {
    let mut builder = AllocationBuilder::new(AllocationKind::Option, portfolio_value, policy);
    for c in candidates {
        builder.push(SizingRequest {
            ticker: c.opportunity.contract.ticker.clone(),
            instrument: Instrument::Call {
                opportunity: c.opportunity.clone(),
            },
            base_kelly: c.inputs.kelly_fraction,
            kelly_fraction: c.inputs.kelly_fraction,
            confidence_factor: 1.0,
            provenance: Provenance {
                win_probability: c.inputs.win_probability,
                avg_gain: c.inputs.potential_gain,
                avg_loss: c.inputs.max_loss,
                volatility: c.daily_volatility,
                sharpe_ratio: None,
                confidence_factor: None,
                sample_size: None,
            },
        });
    }
    builder.build()
}

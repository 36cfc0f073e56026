//! Option opportunity scoring.
//!
//! Two additive point systems over a screened call chain. The point values
//! are business-tunable heuristics. A contract survives only above the
//! scorer's minimum score and only if a 25% move in the underlying would
//! return at least half the premium.

use serde::Serialize;

use super::greeks::{Greeks, OptionType, compute_greeks};
use super::option::{OptionContract, ProjectedReturns};

pub const DEFAULT_MAX_EXPIRY_DAYS: i64 = 90;
pub const DEFAULT_MIN_OPEN_INTEREST: u64 = 10;
pub const DEFAULT_TOP_N: usize = 3;

/// Annualized volatility assumed when the underlying has no usable history.
pub const DEFAULT_VOLATILITY: f64 = 0.5;
/// Daily returns used for the Greeks scorer's volatility.
pub const VOLATILITY_WINDOW: usize = 30;

const RETURNS_MIN_SCORE: u32 = 30;
const GREEKS_MIN_SCORE: u32 = 40;
const MIN_RETURN_ON_25_MOVE: f64 = 0.5;
/// The return-only scorer ignores premiums above this share of spot.
const MAX_PREMIUM_TO_SPOT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Returns,
    Greeks,
}

/// Screening limits applied to a chain before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningPolicy {
    pub max_expiry_days: i64,
    pub min_open_interest: u64,
    pub top_n: usize,
}

impl Default for ScreeningPolicy {
    fn default() -> Self {
        Self {
            max_expiry_days: DEFAULT_MAX_EXPIRY_DAYS,
            min_open_interest: DEFAULT_MIN_OPEN_INTEREST,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Market inputs the chosen scorer needs besides the chain itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoringModel {
    Returns {
        analyst_target: Option<f64>,
    },
    Greeks {
        volatility: f64,
        risk_free_rate: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionOpportunity {
    pub contract: OptionContract,
    pub spot: f64,
    pub moneyness: f64,
    pub projected: ProjectedReturns,
    pub target_return: f64,
    pub risk_reward: f64,
    pub greeks: Option<Greeks>,
    /// Annualized volatility fed to the Greeks, when they were computed.
    pub volatility: Option<f64>,
    pub scorer: ScorerKind,
    pub score: u32,
    pub reasons: Vec<&'static str>,
}

struct Tally {
    score: u32,
    reasons: Vec<&'static str>,
}

impl Tally {
    fn new() -> Self {
        Self {
            score: 0,
            reasons: Vec::new(),
        }
    }

    fn add(&mut self, points: u32, reason: &'static str) {
        self.score += points;
        self.reasons.push(reason);
    }
}

/// Contracts worth scoring: a usable ask, not expired, and expiring within
/// the policy window.
pub fn screen_chain<'a>(
    chain: &'a [OptionContract],
    policy: &'a ScreeningPolicy,
) -> impl Iterator<Item = &'a OptionContract> + 'a {
    chain.iter().filter(move |c| {
        c.has_usable_ask() && c.days_to_expiry >= 0 && c.days_to_expiry <= policy.max_expiry_days
    })
}

/// Return-only score. Absent when the contract is filtered or falls below
/// the retention thresholds.
pub fn score_by_returns(
    contract: &OptionContract,
    spot: f64,
    analyst_target: Option<f64>,
    min_open_interest: u64,
) -> Option<OptionOpportunity> {
    if contract.ask > spot * MAX_PREMIUM_TO_SPOT {
        return None;
    }

    let ask = contract.ask;
    let moneyness = if contract.strike > 0.0 {
        contract.moneyness(spot)
    } else {
        0.0
    };
    let projected = ProjectedReturns::for_contract(contract, spot);
    let target_return = match analyst_target {
        Some(target) if target > contract.strike => (target - contract.strike) / ask,
        _ => 0.0,
    };
    let risk_reward = projected.move_100.max(target_return);

    let mut tally = Tally::new();
    if ask < spot * 0.05 {
        tally.add(25, "ultra leverage");
    } else if ask < spot * 0.1 {
        tally.add(20, "high leverage");
    } else if ask < spot * 0.2 {
        tally.add(15, "good leverage");
    }

    if contract.is_near_the_money(spot) {
        tally.add(15, "near the money");
    }

    let r25 = projected.move_25;
    if r25 > 5.0 {
        tally.add(35, "massive upside");
    } else if r25 > 2.0 {
        tally.add(25, "large upside");
    } else if r25 > 1.0 {
        tally.add(15, "high upside");
    } else if r25 > 0.5 {
        tally.add(10, "good upside");
    }

    if projected.move_50 > 1.0 {
        tally.add(10, "realistic upside");
    }

    if risk_reward > 10.0 {
        tally.add(20, "excellent risk/reward");
    } else if risk_reward > 5.0 {
        tally.add(10, "good risk/reward");
    }

    if contract.days_to_expiry < 30 {
        tally.add(10, "short expiry");
    }

    if contract.open_interest > min_open_interest || contract.volume > 0 {
        tally.add(5, "some liquidity");
    }

    if tally.score < RETURNS_MIN_SCORE || r25 < MIN_RETURN_ON_25_MOVE {
        return None;
    }

    Some(OptionOpportunity {
        contract: contract.clone(),
        spot,
        moneyness,
        projected,
        target_return,
        risk_reward,
        greeks: None,
        volatility: None,
        scorer: ScorerKind::Returns,
        score: tally.score,
        reasons: tally.reasons,
    })
}

/// Greeks-based score. Absent when the Greeks are undefined or the contract
/// falls below the retention thresholds.
pub fn score_by_greeks(
    contract: &OptionContract,
    spot: f64,
    volatility: f64,
    risk_free_rate: f64,
) -> Option<OptionOpportunity> {
    let greeks = compute_greeks(
        spot,
        contract.strike,
        contract.days_to_expiry as f64,
        risk_free_rate,
        volatility,
        OptionType::Call,
    )?;
    let projected = ProjectedReturns::for_contract(contract, spot);

    let mut tally = Tally::new();
    if greeks.gamma > 0.1 {
        tally.add(25, "high gamma");
    } else if greeks.gamma > 0.05 {
        tally.add(15, "good gamma");
    }

    if greeks.delta > 0.7 {
        tally.add(20, "high delta");
    } else if greeks.delta > 0.5 {
        tally.add(15, "good delta");
    }

    if greeks.theta.abs() < 0.01 {
        tally.add(15, "low theta");
    }

    if greeks.vega > 0.1 {
        tally.add(10, "high vega");
    }

    let r25 = projected.move_25;
    if r25 > 2.0 {
        tally.add(30, "large upside");
    } else if r25 > 1.0 {
        tally.add(20, "high upside");
    }

    if contract.ask < spot * 0.1 {
        tally.add(15, "high leverage");
    }

    if tally.score < GREEKS_MIN_SCORE || r25 < MIN_RETURN_ON_25_MOVE {
        return None;
    }

    Some(OptionOpportunity {
        contract: contract.clone(),
        spot,
        moneyness: contract.moneyness(spot),
        projected,
        target_return: 0.0,
        risk_reward: projected.move_100,
        greeks: Some(greeks),
        volatility: Some(volatility),
        scorer: ScorerKind::Greeks,
        score: tally.score,
        reasons: tally.reasons,
    })
}

/// Highest score first, equal scores keep chain order, at most `top_n`.
pub fn rank_opportunities(
    mut opportunities: Vec<OptionOpportunity>,
    top_n: usize,
) -> Vec<OptionOpportunity> {
    opportunities.sort_by(|a, b| b.score.cmp(&a.score));
    opportunities.truncate(top_n);
    opportunities
}

/// Screen, score and rank one ticker's chain.
pub fn find_opportunities(
    chain: &[OptionContract],
    spot: f64,
    model: ScoringModel,
    policy: &ScreeningPolicy,
) -> Vec<OptionOpportunity> {
    let scored = screen_chain(chain, policy)
        .filter_map(|contract| match model {
            ScoringModel::Returns { analyst_target } => {
                score_by_returns(contract, spot, analyst_target, policy.min_open_interest)
            }
            ScoringModel::Greeks {
                volatility,
                risk_free_rate,
            } => score_by_greeks(contract, spot, volatility, risk_free_rate),
        })
        .collect();
    rank_opportunities(scored, policy.top_n)
}

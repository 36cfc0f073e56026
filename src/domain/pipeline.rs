//! Batch sizing over a market data port.
//!
//! Tickers are processed sequentially. A ticker that cannot be sized is
//! recorded with a [`SkipReason`] and the batch carries on.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::allocation::{
    self, AllocationPolicy, ConfidenceCandidate, OptionCandidate, PortfolioAllocation,
    StockCandidate,
};
use super::error::{SizerError, SkipReason, SkippedTicker};
use super::estimator::{
    self, ConfidenceEstimate, DEFAULT_CONFIDENCE_LEVEL, DEFAULT_RISK_FREE_RATE,
};
use super::kelly::DEFAULT_RISK_AVERSION;
use super::option_kelly;
use super::price::{
    self, DEFAULT_LOOKBACK_DAYS, MIN_RETURN_OBSERVATIONS, PricePoint, ReturnSeries,
};
use super::risk::RiskMetrics;
use super::scoring::{
    self, DEFAULT_VOLATILITY, OptionOpportunity, ScorerKind, ScoringModel, ScreeningPolicy,
    VOLATILITY_WINDOW,
};
use super::unified::{self, UnifiedMetric};
use crate::ports::market_data_port::MarketDataPort;

/// Options are only analysed for underlyings priced below this.
pub const DEFAULT_MAX_UNDERLYING_PRICE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    pub portfolio_value: f64,
    pub scaling_factor: f64,
    pub option_scaling_factor: f64,
    pub max_positions: usize,
    pub risk_aversion: f64,
    pub lookback_days: usize,
    pub risk_free_rate: f64,
    pub confidence_level: f64,
    pub screening: ScreeningPolicy,
    pub max_underlying_price: f64,
    pub scorer: ScorerKind,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            portfolio_value: allocation::DEFAULT_PORTFOLIO_VALUE,
            scaling_factor: allocation::DEFAULT_SCALING_FACTOR,
            option_scaling_factor: allocation::DEFAULT_OPTION_SCALING_FACTOR,
            max_positions: allocation::DEFAULT_MAX_POSITIONS,
            risk_aversion: DEFAULT_RISK_AVERSION,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            screening: ScreeningPolicy::default(),
            max_underlying_price: DEFAULT_MAX_UNDERLYING_PRICE,
            scorer: ScorerKind::Returns,
        }
    }
}

/// Everything the estimator knows about one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub last_price: f64,
    pub estimate: ConfidenceEstimate,
    pub unified: UnifiedMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSizingReport {
    pub allocation: PortfolioAllocation,
    pub risk: Option<RiskMetrics>,
    pub analyses: Vec<TickerAnalysis>,
    pub skipped: Vec<SkippedTicker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSizingReport {
    pub allocation: PortfolioAllocation,
    pub risk: Option<RiskMetrics>,
    pub opportunities: Vec<OptionOpportunity>,
    pub skipped: Vec<SkippedTicker>,
}

fn load_prices(port: &dyn MarketDataPort, ticker: &str) -> Result<Vec<PricePoint>, SkipReason> {
    let prices = port
        .fetch_prices(ticker)
        .map_err(|e| SkipReason::NoData {
            detail: e.to_string(),
        })?;
    if prices.is_empty() {
        return Err(SkipReason::NoData {
            detail: "empty price history".into(),
        });
    }
    Ok(prices)
}

/// Estimate, confidence bracket and unified metric for one ticker.
pub fn analyze_ticker(
    port: &dyn MarketDataPort,
    ticker: &str,
    config: &SizingConfig,
) -> Result<TickerAnalysis, SkipReason> {
    let prices = load_prices(port, ticker)?;
    let window = price::lookback_window(&prices, config.lookback_days);

    let estimate = estimator::estimate_with_confidence(
        &window,
        config.risk_free_rate,
        config.confidence_level,
        config.risk_aversion,
    )
    .ok_or(SkipReason::InsufficientData)?;

    let returns = ReturnSeries::from_closes(&window);
    let unified = unified::unified_metric(
        &returns,
        &estimate.kelly,
        estimate.estimate.win_probability,
        config.risk_free_rate,
        config.lookback_days as f64,
    );

    let Some(last) = prices.last() else {
        return Err(SkipReason::InsufficientData);
    };
    Ok(TickerAnalysis {
        ticker: ticker.to_string(),
        as_of: last.date,
        last_price: last.close,
        estimate,
        unified,
    })
}

/// Like [`analyze_ticker`], but as a hard error for single-ticker use.
pub fn analyze_single(
    port: &dyn MarketDataPort,
    ticker: &str,
    config: &SizingConfig,
) -> Result<TickerAnalysis, SizerError> {
    match analyze_ticker(port, ticker, config) {
        Ok(analysis) => Ok(analysis),
        Err(SkipReason::InsufficientData) => {
            let observations = port
                .fetch_prices(ticker)
                .map(|p| {
                    ReturnSeries::from_closes(&price::lookback_window(&p, config.lookback_days))
                        .len()
                })
                .unwrap_or(0);
            Err(SizerError::InsufficientData {
                ticker: ticker.to_string(),
                observations,
                minimum: MIN_RETURN_OBSERVATIONS,
            })
        }
        Err(_) => Err(SizerError::NoData {
            ticker: ticker.to_string(),
        }),
    }
}

fn skip(skipped: &mut Vec<SkippedTicker>, ticker: &str, reason: SkipReason) {
    warn!(ticker, %reason, "skipping ticker");
    skipped.push(SkippedTicker {
        ticker: ticker.to_string(),
        reason,
    });
}

/// Move the allocator's rejections into the skip list. A ticker with at
/// least one held position, or one already skipped, is not listed again.
fn record_rejections(skipped: &mut Vec<SkippedTicker>, allocation: &mut PortfolioAllocation) {
    for rejection in std::mem::take(&mut allocation.rejected) {
        let held = allocation.entries.iter().any(|e| e.ticker == rejection.ticker);
        let listed = skipped.iter().any(|s| s.ticker == rejection.ticker);
        if !held && !listed {
            skip(skipped, &rejection.ticker, rejection.reason);
        }
    }
}

/// Size a stock portfolio, from plain Kelly or, with `confidence_weighted`,
/// from confidence-weighted Kelly with confidence-scaled limits.
///
/// Fails with [`SizerError::NoCandidates`] only when no ticker could be
/// analysed at all.
pub fn run_stock_sizing(
    port: &dyn MarketDataPort,
    tickers: &[String],
    config: &SizingConfig,
    confidence_weighted: bool,
) -> Result<StockSizingReport, SizerError> {
    let mut analyses = Vec::new();
    let mut skipped = Vec::new();

    for ticker in tickers {
        let analysis = match analyze_ticker(port, ticker, config) {
            Ok(a) => a,
            Err(reason) => {
                skip(&mut skipped, ticker, reason);
                continue;
            }
        };

        let kelly = &analysis.estimate.kelly;
        debug!(
            ticker = %ticker,
            base_kelly = kelly.base_kelly,
            weighted_kelly = kelly.confidence_weighted_kelly,
            "estimated"
        );
        analyses.push(analysis);
    }

    if analyses.is_empty() {
        return Err(SizerError::NoCandidates);
    }

    let policy =
        AllocationPolicy::stocks(config.scaling_factor).with_max_positions(config.max_positions);
    let mut allocation = if confidence_weighted {
        let candidates: Vec<ConfidenceCandidate> = analyses
            .iter()
            .map(|a| ConfidenceCandidate {
                ticker: a.ticker.clone(),
                price: a.last_price,
                estimate: a.estimate.clone(),
            })
            .collect();
        allocation::allocate_confidence_weighted(&candidates, config.portfolio_value, policy)
    } else {
        let candidates: Vec<StockCandidate> = analyses
            .iter()
            .map(|a| StockCandidate {
                ticker: a.ticker.clone(),
                price: a.last_price,
                estimate: a.estimate.estimate.clone(),
            })
            .collect();
        allocation::allocate_stocks(&candidates, config.portfolio_value, policy)
    };
    record_rejections(&mut skipped, &mut allocation);

    info!(
        positions = allocation.entries.len(),
        total_allocated = allocation.total_allocated,
        skipped = skipped.len(),
        "stock allocation complete"
    );

    let risk = RiskMetrics::compute(&allocation);
    Ok(StockSizingReport {
        allocation,
        risk,
        analyses,
        skipped,
    })
}

fn scoring_model(
    port: &dyn MarketDataPort,
    ticker: &str,
    closes: &[f64],
    config: &SizingConfig,
) -> ScoringModel {
    match config.scorer {
        ScorerKind::Returns => {
            let analyst_target = port.analyst_target(ticker).unwrap_or_else(|e| {
                debug!(ticker, error = %e, "no analyst target");
                None
            });
            ScoringModel::Returns { analyst_target }
        }
        ScorerKind::Greeks => ScoringModel::Greeks {
            volatility: price::annualized_volatility(
                closes,
                VOLATILITY_WINDOW + 1,
                DEFAULT_VOLATILITY,
            ),
            risk_free_rate: config.risk_free_rate,
        },
    }
}

/// Find and size call opportunities on cheap underlyings.
///
/// Fails with [`SizerError::NoCandidates`] when no ticker produced an
/// opportunity.
pub fn run_option_sizing(
    port: &dyn MarketDataPort,
    tickers: &[String],
    config: &SizingConfig,
) -> Result<OptionSizingReport, SizerError> {
    let mut opportunities = Vec::new();
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();

    for ticker in tickers {
        let prices = match load_prices(port, ticker) {
            Ok(p) => p,
            Err(reason) => {
                skip(&mut skipped, ticker, reason);
                continue;
            }
        };
        let Some(spot) = prices.last().map(|p| p.close) else {
            continue;
        };
        if spot >= config.max_underlying_price {
            let reason = SkipReason::PriceAboveLimit {
                price: spot,
                limit: config.max_underlying_price,
            };
            skip(&mut skipped, ticker, reason);
            continue;
        }

        let window = price::lookback_window(&prices, config.lookback_days);
        let Some(estimate) = estimator::estimate_probabilities(&window, config.risk_free_rate)
        else {
            skip(&mut skipped, ticker, SkipReason::InsufficientData);
            continue;
        };

        let chain = match port.fetch_option_chain(ticker) {
            Ok(chain) => chain,
            Err(e) => {
                let reason = SkipReason::NoData {
                    detail: e.to_string(),
                };
                skip(&mut skipped, ticker, reason);
                continue;
            }
        };

        let model = scoring_model(port, ticker, &window, config);
        let found = scoring::find_opportunities(&chain, spot, model, &config.screening);
        if found.is_empty() {
            skip(&mut skipped, ticker, SkipReason::NoOpportunities);
            continue;
        }
        debug!(ticker = %ticker, count = found.len(), "scored opportunities");

        for opportunity in &found {
            if let Some(inputs) = option_kelly::for_opportunity(opportunity, estimate.volatility) {
                candidates.push(OptionCandidate {
                    opportunity: opportunity.clone(),
                    inputs,
                    daily_volatility: estimate.volatility,
                });
            }
        }
        opportunities.extend(found);
    }

    if opportunities.is_empty() {
        return Err(SizerError::NoCandidates);
    }
    opportunities.sort_by(|a, b| b.score.cmp(&a.score));

    let policy = AllocationPolicy::options(config.option_scaling_factor)
        .with_max_positions(config.max_positions);
    let mut allocation = allocation::allocate_options(&candidates, config.portfolio_value, policy);
    record_rejections(&mut skipped, &mut allocation);
    info!(
        opportunities = opportunities.len(),
        positions = allocation.entries.len(),
        total_allocated = allocation.total_allocated,
        "option allocation complete"
    );

    let risk = RiskMetrics::compute(&allocation);
    Ok(OptionSizingReport {
        allocation,
        risk,
        opportunities,
        skipped,
    })
}

//! Plain-text report on stdout.

use std::fmt::Write as _;

use crate::domain::allocation::{AllocationKind, Instrument, PortfolioAllocation};
use crate::domain::error::{SizerError, SkippedTicker};
use crate::domain::pipeline::{OptionSizingReport, StockSizingReport, TickerAnalysis};
use crate::domain::risk::RiskMetrics;
use crate::domain::scoring::OptionOpportunity;
use crate::ports::report_port::ReportPort;

pub struct ConsoleReport;

fn allocation_title(kind: AllocationKind) -> &'static str {
    match kind {
        AllocationKind::Stock => "Kelly Criterion Allocation",
        AllocationKind::ConfidenceWeighted => "Confidence-Weighted Kelly Allocation",
        AllocationKind::Option => "Options Kelly Allocation",
    }
}

fn write_allocation(out: &mut String, allocation: &PortfolioAllocation) {
    let _ = writeln!(
        out,
        "=== {} (${:.2}) ===",
        allocation_title(allocation.kind),
        allocation.portfolio_value
    );
    if allocation.entries.is_empty() {
        let _ = writeln!(out, "No positions met the allocation criteria.");
    }

    for (i, entry) in allocation.entries.iter().enumerate() {
        match &entry.instrument {
            Instrument::Stock { price } => {
                let _ = writeln!(
                    out,
                    "{:>2}. {:<8} ${:>9.2}  {:>6} shares @ ${:.2}",
                    i + 1,
                    entry.ticker,
                    entry.dollar_allocation,
                    entry.units,
                    price
                );
            }
            Instrument::Call { opportunity } => {
                let c = &opportunity.contract;
                let _ = writeln!(
                    out,
                    "{:>2}. {:<8} ${:>9.2}  {:>6} contracts  {} ${:.2}C @ ${:.2}",
                    i + 1,
                    entry.ticker,
                    entry.dollar_allocation,
                    entry.units,
                    c.expiry,
                    c.strike,
                    c.ask
                );
            }
        }

        let p = &entry.provenance;
        let mut detail = format!(
            "    kelly {:.1}% (base {:.1}%)  scaled {:.1}%  p={:.1}%  gain {:.2}%  loss {:.2}%",
            entry.kelly_fraction * 100.0,
            entry.base_kelly * 100.0,
            entry.scaled_kelly * 100.0,
            p.win_probability * 100.0,
            p.avg_gain * 100.0,
            p.avg_loss * 100.0,
        );
        if let Some(cf) = p.confidence_factor {
            let _ = write!(detail, "  confidence {:.0}%", cf * 100.0);
        }
        let _ = writeln!(out, "{detail}");
    }

    let _ = writeln!(
        out,
        "Total allocated: ${:.2} ({:.1}%)  Cash remaining: ${:.2}",
        allocation.total_allocated, allocation.allocation_percentage, allocation.cash_remaining
    );
}

fn write_risk(out: &mut String, risk: Option<&RiskMetrics>) {
    let Some(risk) = risk else {
        return;
    };
    let _ = writeln!(out, "\n=== Risk Metrics ===");
    let _ = writeln!(out, "Expected daily return: {:.3}%", risk.expected_return * 100.0);
    let _ = writeln!(out, "Portfolio volatility:  {:.2}%", risk.portfolio_volatility * 100.0);
    let _ = writeln!(out, "Portfolio Sharpe:      {:.3}", risk.portfolio_sharpe);
    let _ = writeln!(out, "Drawdown estimate:     {:.2}%", risk.max_drawdown_estimate * 100.0);
    let _ = writeln!(out, "Concentration:         {:.1}%", risk.concentration_risk * 100.0);
    let _ = writeln!(out, "Positions:             {}", risk.number_of_positions);
}

fn write_skipped(out: &mut String, skipped: &[SkippedTicker]) {
    if skipped.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nSkipped:");
    for s in skipped {
        let _ = writeln!(out, "  {}: {}", s.ticker, s.reason);
    }
}

fn write_opportunity(out: &mut String, rank: usize, opp: &OptionOpportunity) {
    let c = &opp.contract;
    let _ = writeln!(
        out,
        "{:>2}. {:<8} {} ${:.2}C @ ${:.2}  score {}  ({} days)",
        rank,
        c.ticker,
        c.expiry,
        c.strike,
        c.ask,
        opp.score,
        c.days_to_expiry
    );
    let _ = writeln!(
        out,
        "    +25%: {:.0}%  +50%: {:.0}%  +100%: {:.0}%  [{}]",
        opp.projected.move_25 * 100.0,
        opp.projected.move_50 * 100.0,
        opp.projected.move_100 * 100.0,
        opp.reasons.join(", ")
    );
    if let Some(g) = &opp.greeks {
        let _ = writeln!(
            out,
            "    delta {:.3}  gamma {:.3}  theta {:.3}  vega {:.3}",
            g.delta, g.gamma, g.theta, g.vega
        );
    }
}

pub fn render_stock_sizing(report: &StockSizingReport) -> String {
    let mut out = String::new();
    write_allocation(&mut out, &report.allocation);
    write_risk(&mut out, report.risk.as_ref());
    write_skipped(&mut out, &report.skipped);
    out
}

pub fn render_option_sizing(report: &OptionSizingReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Option Opportunities ===");
    for (i, opp) in report.opportunities.iter().enumerate() {
        write_opportunity(&mut out, i + 1, opp);
    }
    let _ = writeln!(out);
    write_allocation(&mut out, &report.allocation);
    write_skipped(&mut out, &report.skipped);
    out
}

pub fn render_analysis(analysis: &TickerAnalysis) -> String {
    let mut out = String::new();
    let est = &analysis.estimate.estimate;
    let ci = &analysis.estimate.interval;
    let k = &analysis.estimate.kelly;
    let u = &analysis.unified;

    let _ = writeln!(
        out,
        "=== {} (last ${:.2} on {}) ===",
        analysis.ticker, analysis.last_price, analysis.as_of
    );
    let _ = writeln!(
        out,
        "Win probability: {:.1}%  [{:.1}%, {:.1}%] at {:.0}%",
        est.win_probability * 100.0,
        ci.lower_bound * 100.0,
        ci.upper_bound * 100.0,
        ci.confidence_level * 100.0
    );
    let _ = writeln!(
        out,
        "Avg gain: {:.2}%  Avg loss: {:.2}%  Volatility: {:.2}%  Sharpe: {:.3}",
        est.avg_gain * 100.0,
        est.avg_loss * 100.0,
        est.volatility * 100.0,
        est.sharpe_ratio
    );
    let _ = writeln!(
        out,
        "Total return: {:.1}%  Max drawdown: {:.1}%  Sample: {} returns",
        est.total_return * 100.0,
        est.max_drawdown * 100.0,
        est.sample_size
    );
    let _ = writeln!(
        out,
        "Kelly: base {:.2}%  weighted {:.2}%  conservative {:.2}%  optimistic {:.2}%",
        k.base_kelly * 100.0,
        k.confidence_weighted_kelly * 100.0,
        k.conservative_kelly * 100.0,
        k.optimistic_kelly * 100.0
    );
    let _ = writeln!(
        out,
        "Confidence: factor {:.3}  risk adjustment {:.3}",
        k.confidence_factor, k.risk_adjustment
    );
    let _ = writeln!(
        out,
        "Unified score {:.3}  Sortino {:.3}  Calmar {:.3}  risk-adjusted Kelly {:.2}%",
        u.unified_score,
        u.sortino_ratio,
        u.calmar_ratio,
        u.risk_adjusted_kelly * 100.0
    );
    out
}

impl ReportPort for ConsoleReport {
    fn write_stock_sizing(&self, report: &StockSizingReport) -> Result<(), SizerError> {
        print!("{}", render_stock_sizing(report));
        Ok(())
    }

    fn write_option_sizing(&self, report: &OptionSizingReport) -> Result<(), SizerError> {
        print!("{}", render_option_sizing(report));
        Ok(())
    }

    fn write_analysis(&self, analysis: &TickerAnalysis) -> Result<(), SizerError> {
        print!("{}", render_analysis(analysis));
        Ok(())
    }
}

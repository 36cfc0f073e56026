//! End-to-end sizing runs against an in-memory market data port.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use kellysizer::domain::allocation::{AllocationKind, Instrument, STOCK_MAX_POSITION_FRACTION};
use kellysizer::domain::error::{SizerError, SkipReason};
use kellysizer::domain::pipeline::{
    SizingConfig, analyze_single, run_option_sizing, run_stock_sizing,
};
use kellysizer::domain::scoring::ScorerKind;
use kellysizer::ports::market_data_port::MarketDataPort;

fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

mod stock_sizing {
    use super::*;

    #[test]
    fn sixty_forty_two_to_one_is_forty_percent_kelly() {
        let prices = price_series(1.0, &sixty_forty_returns(0.02, 0.01, 50));
        let spot = last_close(&prices);
        let port = MockMarketDataPort::new().with_prices("SNDL", prices);

        let report =
            run_stock_sizing(&port, &tickers(&["SNDL"]), &SizingConfig::default(), false).unwrap();

        assert_eq!(report.allocation.kind, AllocationKind::Stock);
        assert_eq!(report.allocation.entries.len(), 1);
        let entry = &report.allocation.entries[0];
        assert_abs_diff_eq!(entry.kelly_fraction, 0.4, epsilon = 1e-9);
        assert_abs_diff_eq!(entry.scaled_kelly, 0.2, epsilon = 1e-9);
        // half Kelly on $1000 lands exactly on the 20% cap
        assert_abs_diff_eq!(entry.dollar_allocation, 200.0, epsilon = 1e-6);
        assert_eq!(entry.units, (entry.dollar_allocation / spot).floor() as u64);
        assert_abs_diff_eq!(entry.provenance.win_probability, 0.6, epsilon = 1e-12);
        assert_eq!(entry.provenance.sample_size, Some(250));
        assert_abs_diff_eq!(report.allocation.cash_remaining, 800.0, epsilon = 1e-6);

        let risk = report.risk.unwrap();
        assert_eq!(risk.number_of_positions, 1);
        assert_abs_diff_eq!(risk.concentration_risk, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn positions_respect_cap_and_budget() {
        let mut port = MockMarketDataPort::new();
        let names = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF", "GGG"];
        for (i, name) in names.iter().enumerate() {
            let gain = 0.02 + i as f64 * 0.005;
            port = port.with_prices(name, price_series(1.0, &sixty_forty_returns(gain, 0.01, 40)));
        }
        let config = SizingConfig {
            max_positions: 6,
            ..SizingConfig::default()
        };

        let report = run_stock_sizing(&port, &tickers(&names), &config, false).unwrap();
        let allocation = &report.allocation;

        assert_eq!(allocation.entries.len(), 6);
        let cap = allocation.portfolio_value * STOCK_MAX_POSITION_FRACTION;
        for entry in &allocation.entries {
            assert!(entry.dollar_allocation <= cap + 1e-9);
        }
        assert!(allocation.total_allocated <= allocation.portfolio_value + 1e-9);
        assert_abs_diff_eq!(
            allocation.total_allocated + allocation.cash_remaining,
            allocation.portfolio_value,
            epsilon = 1e-9
        );
        // the weakest edge is the one cut by the position limit
        assert!(allocation.entries.iter().all(|e| e.ticker != "AAA"));
        for pair in allocation.entries.windows(2) {
            assert!(pair[0].kelly_fraction >= pair[1].kelly_fraction);
        }
    }

    #[test]
    fn confidence_weighting_never_exceeds_plain_kelly() {
        let prices = price_series(1.0, &sixty_forty_returns(0.02, 0.01, 50));
        let port = MockMarketDataPort::new().with_prices("SNDL", prices);
        let config = SizingConfig::default();

        let plain = run_stock_sizing(&port, &tickers(&["SNDL"]), &config, false).unwrap();
        let weighted = run_stock_sizing(&port, &tickers(&["SNDL"]), &config, true).unwrap();

        assert_eq!(weighted.allocation.kind, AllocationKind::ConfidenceWeighted);
        let p = &plain.allocation.entries[0];
        let w = &weighted.allocation.entries[0];
        assert!(w.kelly_fraction < p.kelly_fraction);
        assert!(w.dollar_allocation <= p.dollar_allocation);
        assert_abs_diff_eq!(w.base_kelly, p.kelly_fraction, epsilon = 1e-12);
        let cf = w.provenance.confidence_factor.unwrap();
        assert!(cf > 0.5 && cf < 0.95);
    }

    #[test]
    fn partial_failures_are_reported_not_fatal() {
        let port = MockMarketDataPort::new()
            .with_prices("SNDL", price_series(1.0, &sixty_forty_returns(0.02, 0.01, 50)))
            .with_prices("TINY", price_series(1.0, &sixty_forty_returns(0.02, 0.01, 2)))
            .with_prices(
                "DOWN",
                price_series(1.0, &sixty_forty_returns(0.01, 0.04, 20)),
            )
            .with_error("GONE", "delisted");

        let report = run_stock_sizing(
            &port,
            &tickers(&["SNDL", "TINY", "DOWN", "GONE", "NONE"]),
            &SizingConfig::default(),
            false,
        )
        .unwrap();

        assert_eq!(report.allocation.entries.len(), 1);
        let reason = |t: &str| {
            report
                .skipped
                .iter()
                .find(|s| s.ticker == t)
                .map(|s| s.reason.clone())
        };
        assert_eq!(reason("TINY"), Some(SkipReason::InsufficientData));
        assert_eq!(reason("DOWN"), Some(SkipReason::NoEdge));
        assert!(matches!(reason("GONE"), Some(SkipReason::NoData { .. })));
        assert!(matches!(reason("NONE"), Some(SkipReason::NoData { .. })));
        assert!(reason("SNDL").is_none());
        // a ticker with no edge is still analysed
        assert!(report.analyses.iter().any(|a| a.ticker == "DOWN"));
    }

    #[test]
    fn nothing_analysable_is_an_error() {
        let port = MockMarketDataPort::new().with_error("GONE", "delisted");
        let result = run_stock_sizing(
            &port,
            &tickers(&["GONE"]),
            &SizingConfig::default(),
            false,
        );
        assert!(matches!(result, Err(SizerError::NoCandidates)));
    }
}

mod single_ticker {
    use super::*;

    #[test]
    fn analysis_carries_bracket_and_unified_metric() {
        let prices = price_series(1.0, &sixty_forty_returns(0.02, 0.01, 50));
        let port = MockMarketDataPort::new().with_prices("SNDL", prices.clone());

        let analysis = analyze_single(&port, "SNDL", &SizingConfig::default()).unwrap();

        assert_eq!(analysis.as_of, prices.last().unwrap().date);
        assert_abs_diff_eq!(analysis.last_price, last_close(&prices), epsilon = 1e-12);
        let k = &analysis.estimate.kelly;
        assert_abs_diff_eq!(k.base_kelly, 0.4, epsilon = 1e-9);
        assert!(k.conservative_kelly <= k.base_kelly);
        assert!(k.optimistic_kelly >= k.base_kelly);
        let ci = &analysis.estimate.interval;
        assert!(ci.lower_bound < 0.6 && ci.upper_bound > 0.6);
        assert!(analysis.unified.unified_score >= 0.0 && analysis.unified.unified_score <= 1.0);
        assert_eq!(analysis.unified.sample_size, 250);
    }

    #[test]
    fn short_history_reports_observations() {
        let port = MockMarketDataPort::new()
            .with_prices("TINY", price_series(1.0, &sixty_forty_returns(0.02, 0.01, 2)));
        let err = analyze_single(&port, "TINY", &SizingConfig::default()).unwrap_err();
        match err {
            SizerError::InsufficientData {
                ticker,
                observations,
                minimum,
            } => {
                assert_eq!(ticker, "TINY");
                assert_eq!(observations, 10);
                assert_eq!(minimum, 30);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_ticker_is_no_data() {
        let port = MockMarketDataPort::new();
        assert!(matches!(
            analyze_single(&port, "NONE", &SizingConfig::default()),
            Err(SizerError::NoData { .. })
        ));
    }
}

mod option_sizing {
    use super::*;

    fn cheap_underlying() -> (MockMarketDataPort, f64) {
        // ends near $2.59
        let prices = price_series(1.0, &sixty_forty_returns(0.02, 0.02, 50));
        let spot = last_close(&prices);
        let chain = vec![
            call("SNDL", spot, spot * 0.04, 20),
            call("SNDL", spot * 1.1, spot * 0.03, 45),
            // too far out
            call("SNDL", spot, spot * 0.04, 180),
            // expired
            call("SNDL", spot, spot * 0.04, -3),
            // premium above 30% of spot
            call("SNDL", spot, spot * 0.5, 20),
        ];
        let port = MockMarketDataPort::new()
            .with_prices("SNDL", prices)
            .with_chain("SNDL", chain);
        (port, spot)
    }

    #[test]
    fn scores_and_sizes_screened_calls() {
        let (port, spot) = cheap_underlying();
        let report =
            run_option_sizing(&port, &tickers(&["SNDL"]), &SizingConfig::default()).unwrap();

        assert_eq!(report.opportunities.len(), 2);
        for opp in &report.opportunities {
            assert_eq!(opp.scorer, ScorerKind::Returns);
            assert!(opp.contract.days_to_expiry >= 0 && opp.contract.days_to_expiry <= 90);
            assert!(opp.contract.ask <= spot * 0.3);
            assert!(opp.projected.move_25 >= 0.5);
        }
        for pair in report.opportunities.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        let allocation = &report.allocation;
        assert_eq!(allocation.kind, AllocationKind::Option);
        assert!(allocation.total_allocated <= allocation.portfolio_value * 0.05 * 2.0 + 1e-9);
        for entry in &allocation.entries {
            assert!(entry.units >= 1);
            assert!(matches!(entry.instrument, Instrument::Call { .. }));
        }
        assert_abs_diff_eq!(
            allocation.total_allocated + allocation.cash_remaining,
            allocation.portfolio_value,
            epsilon = 1e-9
        );
    }

    #[test]
    fn greeks_scorer_attaches_greeks() {
        let (port, _) = cheap_underlying();
        let config = SizingConfig {
            scorer: ScorerKind::Greeks,
            ..SizingConfig::default()
        };
        match run_option_sizing(&port, &tickers(&["SNDL"]), &config) {
            Ok(report) => {
                for opp in &report.opportunities {
                    let greeks = opp.greeks.unwrap();
                    assert!(greeks.delta > 0.0 && greeks.delta < 1.0);
                    assert!(greeks.gamma >= 0.0);
                    assert!(opp.volatility.unwrap() > 0.0);
                }
            }
            Err(e) => assert!(matches!(e, SizerError::NoCandidates)),
        }
    }

    #[test]
    fn expensive_and_chainless_underlyings_are_skipped() {
        let (port, _) = cheap_underlying();
        let port = port
            .with_prices("MARA", price_series(10.0, &sixty_forty_returns(0.02, 0.01, 20)))
            .with_prices("BITF", price_series(1.0, &sixty_forty_returns(0.02, 0.02, 20)));

        let report = run_option_sizing(
            &port,
            &tickers(&["SNDL", "MARA", "BITF"]),
            &SizingConfig::default(),
        )
        .unwrap();

        let mara = report.skipped.iter().find(|s| s.ticker == "MARA").unwrap();
        assert!(matches!(mara.reason, SkipReason::PriceAboveLimit { limit, .. } if limit == 5.0));
        let bitf = report.skipped.iter().find(|s| s.ticker == "BITF").unwrap();
        assert_eq!(bitf.reason, SkipReason::NoOpportunities);
        assert!(report.opportunities.iter().all(|o| o.contract.ticker == "SNDL"));
    }

    #[test]
    fn no_opportunities_anywhere_is_an_error() {
        let port = MockMarketDataPort::new()
            .with_prices("BITF", price_series(1.0, &sixty_forty_returns(0.02, 0.02, 20)));
        assert!(matches!(
            run_option_sizing(&port, &tickers(&["BITF"]), &SizingConfig::default()),
            Err(SizerError::NoCandidates)
        ));
    }
}

mod mock_port {
    use super::*;

    #[test]
    fn lists_tickers_sorted() {
        let port = MockMarketDataPort::new()
            .with_prices("SNDL", Vec::new())
            .with_prices("BITF", Vec::new());
        assert_eq!(port.list_tickers().unwrap(), vec!["BITF", "SNDL"]);
    }
}

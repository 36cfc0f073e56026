#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use kellysizer::domain::error::SizerError;
use kellysizer::domain::option::OptionContract;
pub use kellysizer::domain::price::PricePoint;
use kellysizer::ports::market_data_port::MarketDataPort;
use std::collections::HashMap;

pub struct MockMarketDataPort {
    pub prices: HashMap<String, Vec<PricePoint>>,
    pub chains: HashMap<String, Vec<OptionContract>>,
    pub targets: HashMap<String, f64>,
    pub errors: HashMap<String, String>,
}

impl MockMarketDataPort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            chains: HashMap::new(),
            targets: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, ticker: &str, prices: Vec<PricePoint>) -> Self {
        self.prices.insert(ticker.to_string(), prices);
        self
    }

    pub fn with_chain(mut self, ticker: &str, chain: Vec<OptionContract>) -> Self {
        self.chains.insert(ticker.to_string(), chain);
        self
    }

    pub fn with_target(mut self, ticker: &str, target: f64) -> Self {
        self.targets.insert(ticker.to_string(), target);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    fn check(&self, ticker: &str) -> Result<(), SizerError> {
        match self.errors.get(ticker) {
            Some(reason) => Err(SizerError::Data {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl MarketDataPort for MockMarketDataPort {
    fn fetch_prices(&self, ticker: &str) -> Result<Vec<PricePoint>, SizerError> {
        self.check(ticker)?;
        Ok(self.prices.get(ticker).cloned().unwrap_or_default())
    }

    fn fetch_option_chain(&self, ticker: &str) -> Result<Vec<OptionContract>, SizerError> {
        self.check(ticker)?;
        Ok(self.chains.get(ticker).cloned().unwrap_or_default())
    }

    fn analyst_target(&self, ticker: &str) -> Result<Option<f64>, SizerError> {
        Ok(self.targets.get(ticker).copied())
    }

    fn list_tickers(&self) -> Result<Vec<String>, SizerError> {
        let mut tickers: Vec<String> = self.prices.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Closes compounding `returns` from `start`, one calendar day apart.
pub fn price_series(start: f64, returns: &[f64]) -> Vec<PricePoint> {
    let day0 = date(2024, 1, 1);
    let mut close = start;
    let mut prices = vec![PricePoint {
        date: day0,
        close,
    }];
    for (i, r) in returns.iter().enumerate() {
        close *= 1.0 + r;
        prices.push(PricePoint {
            date: day0 + Duration::days(i as i64 + 1),
            close,
        });
    }
    prices
}

/// `cycles` repetitions of three gains followed by two losses: a 60% win
/// rate over `5 × cycles` returns.
pub fn sixty_forty_returns(gain: f64, loss: f64, cycles: usize) -> Vec<f64> {
    (0..cycles * 5)
        .map(|i| if i % 5 < 3 { gain } else { -loss })
        .collect()
}

pub fn last_close(prices: &[PricePoint]) -> f64 {
    prices.last().map(|p| p.close).unwrap()
}

pub fn call(ticker: &str, strike: f64, ask: f64, days_to_expiry: i64) -> OptionContract {
    OptionContract {
        ticker: ticker.to_string(),
        strike,
        ask,
        bid: ask * 0.9,
        expiry: date(2024, 9, 7) + Duration::days(days_to_expiry),
        days_to_expiry,
        open_interest: 100,
        volume: 5,
    }
}

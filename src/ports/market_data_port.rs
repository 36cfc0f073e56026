//! Market data port trait.

use crate::domain::error::SizerError;
use crate::domain::option::OptionContract;
use crate::domain::price::PricePoint;

/// Source of pre-fetched market snapshots. The core never fetches on its own.
pub trait MarketDataPort {
    /// Daily closes for `ticker`, oldest first.
    fn fetch_prices(&self, ticker: &str) -> Result<Vec<PricePoint>, SizerError>;

    /// Call chain for `ticker`, with days to expiry already resolved.
    fn fetch_option_chain(&self, ticker: &str) -> Result<Vec<OptionContract>, SizerError>;

    /// Consensus analyst price target, if one is known.
    fn analyst_target(&self, ticker: &str) -> Result<Option<f64>, SizerError>;

    fn list_tickers(&self) -> Result<Vec<String>, SizerError>;
}

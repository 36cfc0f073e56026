//! CSV file market data adapter.
//!
//! Layout under the base directory:
//! - `<TICKER>.csv`: header with at least `date` and `close`
//! - `<TICKER>_options.csv`: `expiry,strike,bid,ask,open_interest,volume`
//! - `targets.csv`: `ticker,target` (optional)

use crate::domain::error::SizerError;
use crate::domain::option::OptionContract;
use crate::domain::price::PricePoint;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
const OPTIONS_SUFFIX: &str = "_options.csv";
const TARGETS_FILE: &str = "targets.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn price_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }

    fn options_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}{OPTIONS_SUFFIX}"))
    }

    fn read_records(&self, path: &Path) -> Result<(StringRecord, Vec<StringRecord>), SizerError> {
        let content = fs::read_to_string(path).map_err(|e| SizerError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| SizerError::Data {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SizerError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
        Ok((headers, records))
    }

    /// Date of the last close, used as the as-of date for option expiries.
    fn as_of(&self, ticker: &str) -> Result<NaiveDate, SizerError> {
        self.fetch_prices(ticker)?
            .last()
            .map(|p| p.date)
            .ok_or_else(|| SizerError::NoData {
                ticker: ticker.to_string(),
            })
    }
}

fn column(headers: &StringRecord, name: &str) -> Result<usize, SizerError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| SizerError::Data {
            reason: format!("missing {name} column"),
        })
}

fn parse_field<T: FromStr>(record: &StringRecord, idx: usize, name: &str) -> Result<T, SizerError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(idx)
        .ok_or_else(|| SizerError::Data {
            reason: format!("missing {name} value"),
        })?
        .parse()
        .map_err(|e| SizerError::Data {
            reason: format!("invalid {name} value: {e}"),
        })
}

/// Counts may be blank in chain exports; blank reads as zero.
fn parse_count(record: &StringRecord, idx: usize, name: &str) -> Result<u64, SizerError> {
    match record.get(idx) {
        Some("") | None => Ok(0),
        Some(_) => {
            let value: f64 = parse_field(record, idx, name)?;
            Ok(value.max(0.0) as u64)
        }
    }
}

fn parse_date(record: &StringRecord, idx: usize, name: &str) -> Result<NaiveDate, SizerError> {
    let raw = record.get(idx).ok_or_else(|| SizerError::Data {
        reason: format!("missing {name} value"),
    })?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| SizerError::Data {
        reason: format!("invalid {name} format: {e}"),
    })
}

impl MarketDataPort for CsvAdapter {
    fn fetch_prices(&self, ticker: &str) -> Result<Vec<PricePoint>, SizerError> {
        let (headers, records) = self.read_records(&self.price_path(ticker))?;
        let date_idx = column(&headers, "date")?;
        let close_idx = column(&headers, "close")?;

        let mut prices = records
            .iter()
            .map(|record| -> Result<PricePoint, SizerError> {
                Ok(PricePoint {
                    date: parse_date(record, date_idx, "date")?,
                    close: parse_field(record, close_idx, "close")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        prices.sort_by_key(|p| p.date);
        Ok(prices)
    }

    fn fetch_option_chain(&self, ticker: &str) -> Result<Vec<OptionContract>, SizerError> {
        let (headers, records) = self.read_records(&self.options_path(ticker))?;
        let expiry_idx = column(&headers, "expiry")?;
        let strike_idx = column(&headers, "strike")?;
        let bid_idx = column(&headers, "bid")?;
        let ask_idx = column(&headers, "ask")?;
        let oi_idx = column(&headers, "open_interest")?;
        let volume_idx = column(&headers, "volume")?;
        let as_of = self.as_of(ticker)?;

        records
            .iter()
            .map(|record| -> Result<OptionContract, SizerError> {
                let expiry = parse_date(record, expiry_idx, "expiry")?;
                // A blank ask is a missing quote; screening drops it.
                let ask = match record.get(ask_idx) {
                    Some("") | None => f64::NAN,
                    Some(_) => parse_field(record, ask_idx, "ask")?,
                };
                Ok(OptionContract {
                    ticker: ticker.to_string(),
                    strike: parse_field(record, strike_idx, "strike")?,
                    ask,
                    bid: parse_field(record, bid_idx, "bid").unwrap_or(0.0),
                    expiry,
                    days_to_expiry: (expiry - as_of).num_days(),
                    open_interest: parse_count(record, oi_idx, "open_interest")?,
                    volume: parse_count(record, volume_idx, "volume")?,
                })
            })
            .collect()
    }

    fn analyst_target(&self, ticker: &str) -> Result<Option<f64>, SizerError> {
        let path = self.base_path.join(TARGETS_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let (headers, records) = self.read_records(&path)?;
        let ticker_idx = column(&headers, "ticker")?;
        let target_idx = column(&headers, "target")?;

        for record in &records {
            if record
                .get(ticker_idx)
                .is_some_and(|t| t.eq_ignore_ascii_case(ticker))
            {
                let target: f64 = parse_field(record, target_idx, "target")?;
                return Ok((target > 0.0).then_some(target));
            }
        }
        Ok(None)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SizerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SizerError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SizerError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.ends_with(OPTIONS_SUFFIX) || name_str == TARGETS_FILE {
                continue;
            }
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

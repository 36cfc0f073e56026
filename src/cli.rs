//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use crate::adapters::console_report::ConsoleReport;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReport;
use crate::domain::allocation::{
    DEFAULT_MAX_POSITIONS, DEFAULT_OPTION_SCALING_FACTOR, DEFAULT_PORTFOLIO_VALUE,
    DEFAULT_SCALING_FACTOR,
};
use crate::domain::config_validation::{
    parse_tickers, validate_data_config, validate_options_config, validate_sizing_config,
};
use crate::domain::error::SizerError;
use crate::domain::estimator::{DEFAULT_CONFIDENCE_LEVEL, DEFAULT_RISK_FREE_RATE};
use crate::domain::kelly::DEFAULT_RISK_AVERSION;
use crate::domain::pipeline::{self, DEFAULT_MAX_UNDERLYING_PRICE, SizingConfig};
use crate::domain::price::DEFAULT_LOOKBACK_DAYS;
use crate::domain::scoring::{
    DEFAULT_MAX_EXPIRY_DAYS, DEFAULT_MIN_OPEN_INTEREST, DEFAULT_TOP_N, ScorerKind, ScreeningPolicy,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "kellysizer",
    about = "Kelly criterion position sizing for stocks and call options"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Overrides shared by the sizing commands.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Comma-separated tickers, replacing `[data] tickers`
    #[arg(long)]
    pub tickers: Option<String>,
    /// Portfolio value, replacing `[portfolio] value`
    #[arg(long)]
    pub value: Option<f64>,
    /// Data directory, replacing `[data] directory`
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Write the result as JSON to this path instead of printing a table
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Size a stock portfolio with the Kelly criterion
    Allocate {
        #[arg(short, long)]
        config: PathBuf,
        /// Size from confidence-weighted Kelly
        #[arg(long)]
        confidence: bool,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Find and size call options on low-priced underlyings
    Options {
        #[arg(short, long)]
        config: PathBuf,
        /// Score contracts with Black-Scholes Greeks
        #[arg(long)]
        greeks: bool,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Show the estimate and Kelly bracket for one ticker
    Kelly {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticker: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Allocate {
            config,
            confidence,
            args,
        } => run_allocate(&config, confidence, &args),
        Command::Options {
            config,
            greeks,
            args,
        } => run_options(&config, greeks, &args),
        Command::Kelly {
            config,
            ticker,
            data_dir,
            json,
        } => run_kelly(&config, &ticker, data_dir.as_ref(), json.as_ref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn fail(e: SizerError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

/// Read sizing settings, falling back to defaults for absent keys.
/// Validates before building, so out-of-range values are errors.
pub fn build_sizing_config(adapter: &dyn ConfigPort) -> Result<SizingConfig, SizerError> {
    validate_sizing_config(adapter)?;
    validate_options_config(adapter)?;

    let scorer = if adapter.get_bool("options", "use_greeks", false) {
        ScorerKind::Greeks
    } else {
        ScorerKind::Returns
    };

    Ok(SizingConfig {
        portfolio_value: adapter.get_double("portfolio", "value", DEFAULT_PORTFOLIO_VALUE),
        scaling_factor: adapter.get_double("portfolio", "scaling_factor", DEFAULT_SCALING_FACTOR),
        option_scaling_factor: adapter.get_double(
            "portfolio",
            "option_scaling_factor",
            DEFAULT_OPTION_SCALING_FACTOR,
        ),
        max_positions: adapter.get_int("portfolio", "max_positions", DEFAULT_MAX_POSITIONS as i64)
            as usize,
        risk_aversion: adapter.get_double("portfolio", "risk_aversion", DEFAULT_RISK_AVERSION),
        lookback_days: adapter.get_int("estimation", "lookback_days", DEFAULT_LOOKBACK_DAYS as i64)
            as usize,
        risk_free_rate: adapter.get_double("estimation", "risk_free_rate", DEFAULT_RISK_FREE_RATE),
        confidence_level: adapter.get_double(
            "estimation",
            "confidence_level",
            DEFAULT_CONFIDENCE_LEVEL,
        ),
        screening: ScreeningPolicy {
            max_expiry_days: adapter.get_int("options", "max_expiry_days", DEFAULT_MAX_EXPIRY_DAYS),
            min_open_interest: adapter.get_int(
                "options",
                "min_open_interest",
                DEFAULT_MIN_OPEN_INTEREST as i64,
            ) as u64,
            top_n: adapter.get_int("options", "top_n", DEFAULT_TOP_N as i64) as usize,
        },
        max_underlying_price: adapter.get_double(
            "options",
            "max_underlying_price",
            DEFAULT_MAX_UNDERLYING_PRICE,
        ),
        scorer,
    })
}

/// Apply command-line overrides on top of the file settings.
pub fn apply_overrides(config: &mut SizingConfig, args: &RunArgs) -> Result<(), SizerError> {
    if let Some(value) = args.value {
        if !(value > 0.0 && value.is_finite()) {
            return Err(SizerError::ConfigInvalid {
                section: "portfolio".into(),
                key: "value".into(),
                reason: "value must be positive".into(),
            });
        }
        config.portfolio_value = value;
    }
    Ok(())
}

pub fn resolve_data_dir(
    dir_override: Option<&PathBuf>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, SizerError> {
    if let Some(dir) = dir_override {
        return Ok(dir.clone());
    }
    validate_data_config(config)?;
    config
        .get_string("data", "directory")
        .map(|d| PathBuf::from(d.trim()))
        .ok_or_else(|| SizerError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        })
}

/// Tickers from the command line, then the config, then every price file
/// the data source knows about.
pub fn resolve_tickers(
    ticker_override: Option<&str>,
    config: &dyn ConfigPort,
    port: &dyn MarketDataPort,
) -> Result<Vec<String>, SizerError> {
    if let Some(list) = ticker_override {
        return parse_tickers(list);
    }
    if let Some(list) = config.get_string("data", "tickers") {
        return parse_tickers(&list);
    }

    let tickers = port.list_tickers()?;
    if tickers.is_empty() {
        return Err(SizerError::ConfigMissing {
            section: "data".into(),
            key: "tickers".into(),
        });
    }
    Ok(tickers)
}

fn reporter(json: Option<&PathBuf>) -> Box<dyn ReportPort> {
    match json {
        Some(path) => Box::new(JsonReport::new(path.clone())),
        None => Box::new(ConsoleReport),
    }
}

struct Prepared {
    config: SizingConfig,
    port: CsvAdapter,
    tickers: Vec<String>,
}

fn prepare(config_path: &PathBuf, args: &RunArgs) -> Result<Prepared, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;

    let mut config = build_sizing_config(&adapter).map_err(fail)?;
    apply_overrides(&mut config, args).map_err(fail)?;

    let data_dir = resolve_data_dir(args.data_dir.as_ref(), &adapter).map_err(fail)?;
    let port = CsvAdapter::new(data_dir);
    let tickers = resolve_tickers(args.tickers.as_deref(), &adapter, &port).map_err(fail)?;

    eprintln!(
        "Sizing {} ticker(s) against ${:.2}",
        tickers.len(),
        config.portfolio_value
    );
    Ok(Prepared {
        config,
        port,
        tickers,
    })
}

fn announce_json(json: Option<&PathBuf>) {
    if let Some(path) = json {
        eprintln!("Report written to {}", path.display());
    }
}

fn run_allocate(config_path: &PathBuf, confidence: bool, args: &RunArgs) -> ExitCode {
    let prepared = match prepare(config_path, args) {
        Ok(p) => p,
        Err(code) => return code,
    };
    info!(
        tickers = prepared.tickers.len(),
        confidence, "starting stock allocation"
    );

    let report = match pipeline::run_stock_sizing(
        &prepared.port,
        &prepared.tickers,
        &prepared.config,
        confidence,
    ) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    if let Err(e) = reporter(args.json.as_ref()).write_stock_sizing(&report) {
        return fail(e);
    }
    announce_json(args.json.as_ref());
    ExitCode::SUCCESS
}

fn run_options(config_path: &PathBuf, greeks: bool, args: &RunArgs) -> ExitCode {
    let mut prepared = match prepare(config_path, args) {
        Ok(p) => p,
        Err(code) => return code,
    };
    if greeks {
        prepared.config.scorer = ScorerKind::Greeks;
    }
    info!(
        tickers = prepared.tickers.len(),
        scorer = ?prepared.config.scorer,
        "starting option allocation"
    );

    let report =
        match pipeline::run_option_sizing(&prepared.port, &prepared.tickers, &prepared.config) {
            Ok(r) => r,
            Err(e) => return fail(e),
        };

    if let Err(e) = reporter(args.json.as_ref()).write_option_sizing(&report) {
        return fail(e);
    }
    announce_json(args.json.as_ref());
    ExitCode::SUCCESS
}

fn run_kelly(
    config_path: &PathBuf,
    ticker: &str,
    data_dir: Option<&PathBuf>,
    json: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match build_sizing_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let data_dir = match resolve_data_dir(data_dir, &adapter) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let ticker = ticker.trim().to_uppercase();
    let port = CsvAdapter::new(data_dir);
    let analysis = match pipeline::analyze_single(&port, &ticker, &config) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    if let Err(e) = reporter(json).write_analysis(&analysis) {
        return fail(e);
    }
    announce_json(json);
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match build_sizing_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = validate_data_config(&adapter) {
        return fail(e);
    }
    eprintln!("Config validated successfully");

    eprintln!("\nPortfolio:");
    eprintln!("  value:                 ${:.2}", config.portfolio_value);
    eprintln!("  scaling_factor:        {}", config.scaling_factor);
    eprintln!("  option_scaling_factor: {}", config.option_scaling_factor);
    eprintln!("  max_positions:         {}", config.max_positions);
    eprintln!("  risk_aversion:         {}", config.risk_aversion);

    eprintln!("\nEstimation:");
    eprintln!("  lookback_days:    {}", config.lookback_days);
    eprintln!("  risk_free_rate:   {}", config.risk_free_rate);
    eprintln!("  confidence_level: {}", config.confidence_level);

    eprintln!("\nOptions:");
    eprintln!("  max_expiry_days:      {}", config.screening.max_expiry_days);
    eprintln!("  min_open_interest:    {}", config.screening.min_open_interest);
    eprintln!("  top_n:                {}", config.screening.top_n);
    eprintln!("  max_underlying_price: ${:.2}", config.max_underlying_price);
    eprintln!("  scorer:               {:?}", config.scorer);

    eprintln!("\nData:");
    let directory = adapter.get_string("data", "directory").unwrap_or_default();
    eprintln!("  directory: {}", directory.trim());
    match adapter.get_string("data", "tickers") {
        Some(raw) => match parse_tickers(&raw) {
            Ok(tickers) => eprintln!("  tickers:   {}", tickers.join(", ")),
            Err(e) => return fail(e),
        },
        None => eprintln!("  tickers:   (all price files in directory)"),
    }

    ExitCode::SUCCESS
}

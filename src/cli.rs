//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    parse_date, parse_interval, validate_backtest_config, validate_position_budget,
    validate_strategy,
};
use crate::domain::error::SimError;
use crate::domain::ohlcv::Interval;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;
use crate::ports::result_port::ResultSink;

#[derive(Parser, Debug)]
#[command(name = "barsim", about = "Single-instrument strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [backtest] ticker
        #[arg(long)]
        ticker: Option<String>,
        /// Overrides [backtest] interval
        #[arg(long)]
        interval: Option<String>,
        /// Validate and print the resolved run, then stop
        #[arg(long)]
        dry_run: bool,
        /// Do not persist the simulation
        #[arg(long)]
        no_save: bool,
    },
    /// Validate a configuration and print the resolved strategy
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the stored data range for a ticker
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        interval: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            ticker,
            interval,
            dry_run,
            no_save,
        } => {
            let overrides = Overrides::new(ticker.as_deref(), interval.as_deref());
            if dry_run {
                run_dry_run(&config, &overrides)
            } else {
                run_backtest(&config, &overrides, !no_save)
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            config,
            ticker,
            interval,
        } => run_info(&config, &ticker, &interval),
    }
}

fn exit_with(err: SimError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SimError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Command-line values layered over the `[backtest]` section of a config.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    ticker: Option<String>,
    interval: Option<String>,
}

impl Overrides {
    pub fn new(ticker: Option<&str>, interval: Option<&str>) -> Self {
        Overrides {
            ticker: ticker.map(str::to_string),
            interval: interval.map(str::to_string),
        }
    }

    pub fn over<'a>(&'a self, inner: &'a dyn ConfigPort) -> OverriddenConfig<'a> {
        OverriddenConfig {
            inner,
            overrides: self,
        }
    }
}

pub struct OverriddenConfig<'a> {
    inner: &'a dyn ConfigPort,
    overrides: &'a Overrides,
}

impl OverriddenConfig<'_> {
    fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        if section != "backtest" {
            return None;
        }
        match key {
            "ticker" => self.overrides.ticker.as_deref(),
            "interval" => self.overrides.interval.as_deref(),
            _ => None,
        }
    }
}

impl ConfigPort for OverriddenConfig<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
            .map(str::to_string)
            .or_else(|| self.inner.get_string(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.inner.get_int(section, key, default),
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.inner.get_double(section, key, default),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.inner.get_bool(section, key, default)
    }
}

/// Parses `[section] key` as `T`, or returns `default` when absent.
fn read_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SimError::invalid(section, key, format!("cannot parse '{raw}'"))),
    }
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SimError> {
    let ticker = config.require_string("backtest", "ticker")?;
    let interval = parse_interval(config.get_string("backtest", "interval").as_deref())?;
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    Ok(BacktestConfig {
        initial_balance: read_key(
            config,
            "backtest",
            "initial_balance",
            engine::DEFAULT_INITIAL_BALANCE,
        )?,
        fee_pct: read_key(config, "backtest", "fee_pct", engine::DEFAULT_FEE_PCT)?,
        ..BacktestConfig::new(ticker.trim(), interval, start_date, end_date)
    })
}

/// Resolves `[strategy]` over the defaults and validates the result.
pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, SimError> {
    let d = StrategyConfig::default();
    let s = "strategy";
    let strategy = StrategyConfig {
        name: config
            .get_string(s, "name")
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(d.name),
        ema_fast: read_key(config, s, "ema_fast", d.ema_fast)?,
        ema_slow: read_key(config, s, "ema_slow", d.ema_slow)?,
        sma_short: read_key(config, s, "sma_short", d.sma_short)?,
        sma_long: read_key(config, s, "sma_long", d.sma_long)?,
        rsi_period: read_key(config, s, "rsi_period", d.rsi_period)?,
        atr_period: read_key(config, s, "atr_period", d.atr_period)?,
        adx_period: read_key(config, s, "adx_period", d.adx_period)?,
        macd_fast: read_key(config, s, "macd_fast", d.macd_fast)?,
        macd_slow: read_key(config, s, "macd_slow", d.macd_slow)?,
        macd_signal: read_key(config, s, "macd_signal", d.macd_signal)?,
        stoch_period: read_key(config, s, "stoch_period", d.stoch_period)?,
        stoch_smooth_k: read_key(config, s, "stoch_smooth_k", d.stoch_smooth_k)?,
        stoch_smooth_d: read_key(config, s, "stoch_smooth_d", d.stoch_smooth_d)?,
        bollinger_period: read_key(config, s, "bollinger_period", d.bollinger_period)?,
        bollinger_multiplier: read_key(
            config,
            s,
            "bollinger_multiplier",
            d.bollinger_multiplier,
        )?,
        sr_lookback: read_key(config, s, "sr_lookback", d.sr_lookback)?,
        warmup_bars: read_key(config, s, "warmup_bars", d.warmup_bars)?,
        min_volatility_pct: read_key(config, s, "min_volatility_pct", d.min_volatility_pct)?,
        low_volatility_pct: read_key(config, s, "low_volatility_pct", d.low_volatility_pct)?,
        weak_trend_adx: read_key(config, s, "weak_trend_adx", d.weak_trend_adx)?,
        strong_trend_adx: read_key(config, s, "strong_trend_adx", d.strong_trend_adx)?,
        rsi_oversold: read_key(config, s, "rsi_oversold", d.rsi_oversold)?,
        rsi_overbought: read_key(config, s, "rsi_overbought", d.rsi_overbought)?,
        stoch_oversold: read_key(config, s, "stoch_oversold", d.stoch_oversold)?,
        stoch_overbought: read_key(config, s, "stoch_overbought", d.stoch_overbought)?,
        profit_target_pct: read_key(config, s, "profit_target_pct", d.profit_target_pct)?,
        stop_loss_pct: read_key(config, s, "stop_loss_pct", d.stop_loss_pct)?,
        trailing_activation_pct: read_key(
            config,
            s,
            "trailing_activation_pct",
            d.trailing_activation_pct,
        )?,
        trailing_offset_pct: read_key(config, s, "trailing_offset_pct", d.trailing_offset_pct)?,
        risk_pct: read_key(config, s, "risk_pct", d.risk_pct)?,
        max_position_pct: read_key(config, s, "max_position_pct", d.max_position_pct)?,
        leverage: read_key(config, s, "leverage", d.leverage)?,
    };
    validate_strategy(&strategy)?;
    Ok(strategy)
}

/// Loads, validates and resolves both configs.
fn prepare(
    config_path: &Path,
    overrides: &Overrides,
) -> Result<(FileConfigAdapter, BacktestConfig, StrategyConfig), SimError> {
    let adapter = load_config(config_path)?;
    let (bt_config, strategy) = {
        let config = overrides.over(&adapter);
        validate_backtest_config(&config)?;
        (build_backtest_config(&config)?, build_strategy_config(&config)?)
    };
    validate_position_budget(&strategy, bt_config.fee_pct)?;
    Ok((adapter, bt_config, strategy))
}

/// Bar source described by `[sqlite]` and `[csv]`. With both present the
/// database is asked first and the CSV directory fills in when it is empty.
pub fn open_bar_source(config: &dyn ConfigPort) -> Result<Box<dyn BarSource>, SimError> {
    let csv = config
        .get_string("csv", "dir")
        .filter(|d| !d.trim().is_empty())
        .map(|dir| CsvAdapter::new(PathBuf::from(dir.trim())));

    #[cfg(feature = "sqlite")]
    {
        if config.has_key("sqlite", "path") {
            let db = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
            return Ok(match csv {
                Some(csv) => Box::new(
                    crate::adapters::fallback_source::FallbackSource::new(db, csv),
                ),
                None => Box::new(db),
            });
        }
    }

    match csv {
        Some(csv) => Ok(Box::new(csv)),
        None => Err(SimError::missing("csv", "dir")),
    }
}

#[cfg(feature = "sqlite")]
fn open_result_sink(config: &dyn ConfigPort) -> Result<Option<Box<dyn ResultSink>>, SimError> {
    if !config.has_key("sqlite", "path") {
        return Ok(None);
    }
    let db = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
    Ok(Some(Box::new(db)))
}

#[cfg(not(feature = "sqlite"))]
fn open_result_sink(_config: &dyn ConfigPort) -> Result<Option<Box<dyn ResultSink>>, SimError> {
    Ok(None)
}

fn run_backtest(config_path: &Path, overrides: &Overrides, save: bool) -> ExitCode {
    let (adapter, bt_config, strategy) = match prepare(config_path, overrides) {
        Ok(prepared) => prepared,
        Err(e) => return exit_with(e),
    };

    let source = match open_bar_source(&adapter) {
        Ok(s) => s,
        Err(e) => return exit_with(e),
    };
    let sink = if save {
        match open_result_sink(&adapter) {
            Ok(sink) => {
                if sink.is_none() {
                    warn!("no result store configured, simulation will not be saved");
                }
                sink
            }
            Err(e) => return exit_with(e),
        }
    } else {
        None
    };

    run_backtest_pipeline(&*source, sink.as_deref(), &bt_config, &strategy)
}

/// Fetch, simulate, print the summary and optionally persist.
pub fn run_backtest_pipeline(
    source: &dyn BarSource,
    sink: Option<&dyn ResultSink>,
    bt_config: &BacktestConfig,
    strategy: &StrategyConfig,
) -> ExitCode {
    let result = match engine::run_simulation(source, bt_config, strategy) {
        Ok(r) => r,
        Err(e) => return exit_with(e),
    };

    print_summary(bt_config, strategy, &result);

    if let Some(sink) = sink {
        match engine::persist_result(sink, bt_config, strategy, &result) {
            Ok(id) => println!("\nSaved simulation #{id}"),
            Err(e) => return exit_with(e),
        }
    } else {
        debug!("results not persisted");
    }
    ExitCode::SUCCESS
}

pub fn print_summary(
    bt_config: &BacktestConfig,
    strategy: &StrategyConfig,
    result: &BacktestResult,
) {
    let stats = &result.stats;
    println!("=== {} {} ({}) ===", bt_config.ticker, bt_config.interval, strategy.name);
    println!("Period:           {} to {}", bt_config.start_date, bt_config.end_date);
    println!("Bars processed:   {}", result.bars_processed);
    println!("Initial balance:  {:.2}", stats.initial_balance);
    println!("Final balance:    {:.2}", stats.final_balance);
    println!("Net P&L:          {:.2} ({:.2}%)", stats.net_pnl, stats.pnl_pct);
    println!("Total trades:     {}", stats.total_trades);
    println!(
        "Won / lost / even: {} / {} / {}",
        stats.trades_won, stats.trades_lost, stats.trades_breakeven
    );
    println!("Win rate:         {:.1}%", stats.win_rate * 100.0);
    println!("Profit factor:    {:.2}", stats.profit_factor);
    println!("Total fees:       {:.2}", stats.total_fees);
    println!("Max drawdown:     -{:.2}%", stats.max_drawdown * 100.0);
    if stats.halted {
        println!("Run halted: balance exhausted");
    }
    if let Some(pos) = &result.open_position {
        println!(
            "Open position:    {} {:.4} @ {:.4} since {}",
            pos.direction, pos.size, pos.entry_price, pos.entry_time
        );
    }
}

pub fn run_dry_run(config_path: &Path, overrides: &Overrides) -> ExitCode {
    let (_, bt_config, strategy) = match prepare(config_path, overrides) {
        Ok(prepared) => prepared,
        Err(e) => return exit_with(e),
    };
    println!("Config validated successfully");
    println!(
        "Would backtest {} {} from {} to {} with {:.2} starting balance, fee {}%",
        bt_config.ticker,
        bt_config.interval,
        bt_config.start_date,
        bt_config.end_date,
        bt_config.initial_balance,
        bt_config.fee_pct,
    );
    println!("Strategy: {}", strategy.name);
    ExitCode::SUCCESS
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    let (_, _, strategy) = match prepare(config_path, &Overrides::default()) {
        Ok(prepared) => prepared,
        Err(e) => return exit_with(e),
    };
    println!("Config validated successfully\n");
    println!("{}", describe_strategy(&strategy));
    ExitCode::SUCCESS
}

/// Human-readable listing of every resolved strategy constant.
pub fn describe_strategy(s: &StrategyConfig) -> String {
    let lines = [
        format!("Strategy: {}", s.name),
        format!("  EMA fast/slow:        {}/{}", s.ema_fast, s.ema_slow),
        format!("  SMA short/long:       {}/{}", s.sma_short, s.sma_long),
        format!(
            "  RSI:                  {} ({}/{})",
            s.rsi_period, s.rsi_oversold, s.rsi_overbought
        ),
        format!("  ATR:                  {}", s.atr_period),
        format!(
            "  ADX:                  {} (weak {}, strong {})",
            s.adx_period, s.weak_trend_adx, s.strong_trend_adx
        ),
        format!(
            "  MACD:                 {}/{}/{}",
            s.macd_fast, s.macd_slow, s.macd_signal
        ),
        format!(
            "  Stochastic:           {}/{}/{} ({}/{})",
            s.stoch_period, s.stoch_smooth_k, s.stoch_smooth_d, s.stoch_oversold, s.stoch_overbought
        ),
        format!(
            "  Bollinger:            {} x {}",
            s.bollinger_period, s.bollinger_multiplier
        ),
        format!("  S/R lookback:         {}", s.sr_lookback),
        format!("  Warm-up bars:         {}", s.warmup_bars),
        format!(
            "  Volatility min/low:   {}% / {}%",
            s.min_volatility_pct, s.low_volatility_pct
        ),
        format!(
            "  Target / stop:        {}% / {}%",
            s.profit_target_pct, s.stop_loss_pct
        ),
        format!(
            "  Trailing act/offset:  {}% / {}%",
            s.trailing_activation_pct, s.trailing_offset_pct
        ),
        format!(
            "  Risk / max position:  {}% / {}%",
            s.risk_pct, s.max_position_pct
        ),
        format!("  Leverage:             {}x", s.leverage),
    ];
    lines.join("\n")
}

fn run_info(config_path: &Path, ticker: &str, interval: &str) -> ExitCode {
    let interval: Interval = match parse_interval(Some(interval)) {
        Ok(i) => i,
        Err(e) => return exit_with(e),
    };
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return exit_with(e),
    };
    let source = match open_bar_source(&adapter) {
        Ok(s) => s,
        Err(e) => return exit_with(e),
    };
    run_info_with(&*source, ticker, interval)
}

pub fn run_info_with(source: &dyn BarSource, ticker: &str, interval: Interval) -> ExitCode {
    match source.data_range(ticker, interval) {
        Ok(Some((first, last, count))) => {
            println!("{ticker} {interval}: {first} to {last} ({count} bars)");
            ExitCode::SUCCESS
        }
        Ok(None) => exit_with(SimError::NoData {
            ticker: ticker.to_string(),
            interval,
        }),
        Err(e) => exit_with(e),
    }
}

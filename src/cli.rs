//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::comparison::{compare_strategies, Comparison};
use crate::domain::config_validation::{
    parse_strategy_keys, read_date_range, read_f64, read_usize, validate_backtest_config,
};
use crate::domain::error::SigtraderError;
use crate::domain::position::Thresholds;
use crate::domain::scorer::ScoreWeights;
use crate::domain::signal::RsiBounds;
use crate::domain::strategy::{
    BandParams, BollingerRsiParams, CombinedParams, CrossoverParams, MacdParams, MacdRsiParams,
    Strategy, StrategyKind,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_REPORT: &str = "report.json";

#[derive(Parser, Debug)]
#[command(name = "sigtrader", version, about = "Weighted-signal strategy backtester")]
pub struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy, or compare several, over a symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Strategy key; repeat to compare (overrides [backtest] strategies)
        #[arg(short, long)]
        strategy: Vec<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file and the strategies it names
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(long)]
        data_dir: PathBuf,
    },
    /// Show bar count and date range for a symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            strategy,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref(), &strategy)
            } else {
                run_backtest_command(&config, symbol.as_deref(), &strategy, output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir } => run_list_symbols(&data_dir),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    }
}

fn fail(err: &SigtraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Everything one pipeline run needs besides its ports.
pub struct PipelineRequest<'a> {
    pub symbol: &'a str,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub strategies: &'a [Strategy],
    pub config: &'a BacktestConfig,
    pub output: &'a Path,
}

#[derive(Debug)]
pub enum PipelineOutput {
    Single(Box<BacktestResult>),
    Compared(Comparison),
}

fn run_backtest_command(
    config_path: &Path,
    symbol_override: Option<&str>,
    strategy_overrides: &[String],
    output_override: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load config
    info!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate backtest config
    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }

    // Stage 3: Build strategies
    let keys = resolve_strategy_keys(strategy_overrides, &adapter);
    let strategies = match build_strategies(&adapter, &keys) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    for strategy in &strategies {
        info!("Loaded strategy: {}", strategy);
    }

    // Stage 4: Build BacktestConfig and resolve the run
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let (start, end) = match read_date_range(&adapter) {
        Ok(range) => range,
        Err(e) => return fail(&e),
    };
    let symbol = match resolve_symbol(symbol_override, &adapter) {
        Some(s) => s,
        None => {
            return fail(&SigtraderError::ConfigMissing {
                section: "backtest".into(),
                key: "symbol".into(),
            })
        }
    };
    let output = resolve_output(output_override, &adapter);

    // Stages 5-7: Data port dependent pipeline
    let data_port = CsvAdapter::new(resolve_data_dir(&adapter));
    let request = PipelineRequest {
        symbol: &symbol,
        start,
        end,
        strategies: &strategies,
        config: &bt_config,
        output: &output,
    };
    match run_pipeline(&data_port, &JsonReportAdapter::new(), &request) {
        Ok(_) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn run_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    request: &PipelineRequest<'_>,
) -> Result<PipelineOutput, SigtraderError> {
    // Stage 5: Fetch bars
    info!(
        "Fetching {} from {} to {}",
        request.symbol, request.start, request.end
    );
    let bars = data_port.fetch_bars(request.symbol, request.start, request.end)?;
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return Err(SigtraderError::NoData {
            symbol: request.symbol.to_string(),
        });
    };
    info!(
        "Running {} strateg{} over {} bars, {} to {}",
        request.strategies.len(),
        if request.strategies.len() == 1 { "y" } else { "ies" },
        bars.len(),
        first.date(),
        last.date()
    );

    // Stages 6-7: Simulate, print summary, write report
    match request.strategies {
        [] => Err(SigtraderError::ConfigMissing {
            section: "backtest".into(),
            key: "strategies".into(),
        }),
        [strategy] => {
            let result = run_backtest(&bars, strategy, request.config)?;
            print_result(request.symbol, &result);
            report_port.write(&result, request.output)?;
            Ok(PipelineOutput::Single(Box::new(result)))
        }
        many => {
            let comparison = compare_strategies(&bars, many, request.config)?;
            eprintln!("\n=== {} Strategy Comparison (ranked by Sharpe) ===", request.symbol);
            eprint!("{comparison}");
            report_port.write_comparison(&comparison, request.output)?;
            Ok(PipelineOutput::Compared(comparison))
        }
    }
}

fn print_result(symbol: &str, result: &BacktestResult) {
    eprintln!("\n=== {}: {} ===", symbol, result.strategy_name);
    eprintln!("{}", result.metrics);

    if !result.trades.is_empty() {
        eprintln!("\n=== Trades ===");
        for trade in &result.trades {
            eprintln!(
                "  {} -> {}  {:.2} -> {:.2}  {:+.2}%{}",
                trade.entry_time.date(),
                trade.exit_time.date(),
                trade.entry_price,
                trade.exit_price,
                trade.profit_pct,
                if trade.is_winner() { "" } else { "  (loss)" },
            );
        }
    }
    if let Some(open) = &result.open_trade {
        eprintln!(
            "\nOpen position since {} at {:.2}: {:+.2}% at last close",
            open.entry_time.date(),
            open.entry_price,
            open.profit_pct
        );
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SigtraderError> {
    let defaults = BacktestConfig::default();
    let config = BacktestConfig {
        initial_capital: read_f64(
            adapter,
            "backtest",
            "initial_capital",
            defaults.initial_capital,
        )?,
        commission_pct: read_f64(adapter, "backtest", "commission_pct", defaults.commission_pct)?,
        risk_free_rate: read_f64(adapter, "backtest", "risk_free_rate", defaults.risk_free_rate)?,
        close_open_position: adapter.get_bool(
            "backtest",
            "close_open_position",
            defaults.close_open_position,
        ),
    };
    config.validate()?;
    Ok(config)
}

pub fn resolve_symbol(symbol_override: Option<&str>, config: &dyn ConfigPort) -> Option<String> {
    symbol_override
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "symbol"))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

/// Command-line keys win over `[backtest] strategies`. Duplicates are dropped.
pub fn resolve_strategy_keys(overrides: &[String], config: &dyn ConfigPort) -> Vec<String> {
    let raw: Vec<String> = if overrides.is_empty() {
        config
            .get_string("backtest", "strategies")
            .map(|s| parse_strategy_keys(&s))
            .unwrap_or_default()
    } else {
        overrides.iter().flat_map(|s| parse_strategy_keys(s)).collect()
    };

    let mut keys: Vec<String> = Vec::with_capacity(raw.len());
    for key in raw {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

pub fn resolve_data_dir(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_string("backtest", "data_dir")
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn resolve_output(output_override: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    output_override
        .map(Path::to_path_buf)
        .or_else(|| {
            config
                .get_string("report", "output")
                .filter(|s| !s.trim().is_empty())
                .map(|s| PathBuf::from(s.trim()))
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT))
}

pub fn build_strategies(
    adapter: &dyn ConfigPort,
    keys: &[String],
) -> Result<Vec<Strategy>, SigtraderError> {
    if keys.is_empty() {
        return Err(SigtraderError::ConfigMissing {
            section: "backtest".into(),
            key: "strategies".into(),
        });
    }
    keys.iter().map(|key| build_strategy(adapter, key)).collect()
}

/// Strategy for `key` with parameters from the section of the same name.
/// Missing keys take the defaults; an optional `name` key overrides the label.
pub fn build_strategy(adapter: &dyn ConfigPort, key: &str) -> Result<Strategy, SigtraderError> {
    let key = key.trim().to_ascii_lowercase();
    let Some(default_kind) = StrategyKind::from_key(&key) else {
        return Strategy::from_key(&key);
    };
    let name = adapter
        .get_string(&key, "name")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_kind.label().to_string());

    let kind = match default_kind {
        StrategyKind::BuyAndHold => StrategyKind::BuyAndHold,
        StrategyKind::SmaCrossover(defaults) => StrategyKind::SmaCrossover(read_crossover(
            adapter,
            &key,
            ("fast_period", "slow_period"),
            defaults,
        )?),
        StrategyKind::EmaCrossover(defaults) => StrategyKind::EmaCrossover(read_crossover(
            adapter,
            &key,
            ("fast_period", "slow_period"),
            defaults,
        )?),
        StrategyKind::MacdRsi(defaults) => {
            let (rsi_period, rsi) = read_rsi(adapter, &key, defaults.rsi_period, defaults.rsi)?;
            StrategyKind::MacdRsi(MacdRsiParams {
                macd: read_macd(adapter, &key, defaults.macd)?,
                rsi_period,
                rsi,
                ema_period: read_usize(adapter, &key, "ema_period", defaults.ema_period)?,
            })
        }
        StrategyKind::BollingerRsi(defaults) => {
            let (rsi_period, rsi) = read_rsi(adapter, &key, defaults.rsi_period, defaults.rsi)?;
            StrategyKind::BollingerRsi(BollingerRsiParams {
                bands: read_bands(adapter, &key, defaults.bands)?,
                rsi_period,
                rsi,
            })
        }
        StrategyKind::Combined(defaults) => {
            StrategyKind::Combined(read_combined(adapter, &key, &name, defaults)?)
        }
    };

    Strategy::new(name, kind)
}

fn read_crossover(
    adapter: &dyn ConfigPort,
    section: &str,
    (fast_key, slow_key): (&str, &str),
    defaults: CrossoverParams,
) -> Result<CrossoverParams, SigtraderError> {
    Ok(CrossoverParams {
        fast_period: read_usize(adapter, section, fast_key, defaults.fast_period)?,
        slow_period: read_usize(adapter, section, slow_key, defaults.slow_period)?,
    })
}

fn read_macd(
    adapter: &dyn ConfigPort,
    section: &str,
    defaults: MacdParams,
) -> Result<MacdParams, SigtraderError> {
    Ok(MacdParams {
        fast: read_usize(adapter, section, "macd_fast", defaults.fast)?,
        slow: read_usize(adapter, section, "macd_slow", defaults.slow)?,
        signal: read_usize(adapter, section, "macd_signal", defaults.signal)?,
    })
}

fn read_bands(
    adapter: &dyn ConfigPort,
    section: &str,
    defaults: BandParams,
) -> Result<BandParams, SigtraderError> {
    Ok(BandParams {
        period: read_usize(adapter, section, "bb_period", defaults.period)?,
        dev: read_f64(adapter, section, "bb_dev", defaults.dev)?,
    })
}

/// Bounds are range-checked later by `Strategy::new`.
fn read_rsi(
    adapter: &dyn ConfigPort,
    section: &str,
    default_period: usize,
    defaults: RsiBounds,
) -> Result<(usize, RsiBounds), SigtraderError> {
    let period = read_usize(adapter, section, "rsi_period", default_period)?;
    let bounds = RsiBounds {
        oversold: read_f64(adapter, section, "rsi_oversold", defaults.oversold)?,
        overbought: read_f64(adapter, section, "rsi_overbought", defaults.overbought)?,
    };
    Ok((period, bounds))
}

fn read_combined(
    adapter: &dyn ConfigPort,
    section: &str,
    name: &str,
    defaults: CombinedParams,
) -> Result<CombinedParams, SigtraderError> {
    let (rsi_period, rsi) = read_rsi(adapter, section, defaults.rsi_period, defaults.rsi)?;
    let buy = read_f64(adapter, section, "buy_threshold", defaults.thresholds.buy())?;
    let sell = read_f64(adapter, section, "sell_threshold", defaults.thresholds.sell())?;
    let thresholds = Thresholds::new(buy, sell).map_err(|e| attribute(e, name))?;

    Ok(CombinedParams {
        sma: read_crossover(adapter, section, ("fast_ma", "slow_ma"), defaults.sma)?,
        ema: read_crossover(adapter, section, ("ema_fast", "ema_slow"), defaults.ema)?,
        macd: read_macd(adapter, section, defaults.macd)?,
        rsi_period,
        rsi,
        bands: read_bands(adapter, section, defaults.bands)?,
        thresholds,
        weights: read_weights(adapter, section, defaults.weights)?,
    })
}

fn read_weights(
    adapter: &dyn ConfigPort,
    section: &str,
    defaults: ScoreWeights,
) -> Result<ScoreWeights, SigtraderError> {
    let w = |key: &str, default: f64| read_f64(adapter, section, key, default);
    Ok(ScoreWeights {
        sma_cross: w("weight_sma_cross", defaults.sma_cross)?,
        ema_cross: w("weight_ema_cross", defaults.ema_cross)?,
        close_vs_slow_sma: w("weight_close_vs_slow_sma", defaults.close_vs_slow_sma)?,
        macd_cross: w("weight_macd_cross", defaults.macd_cross)?,
        macd_histogram: w("weight_macd_histogram", defaults.macd_histogram)?,
        rsi_extreme: w("weight_rsi_extreme", defaults.rsi_extreme)?,
        rsi_direction: w("weight_rsi_direction", defaults.rsi_direction)?,
        band_touch: w("weight_band_touch", defaults.band_touch)?,
        close_vs_middle_band: w("weight_close_vs_middle_band", defaults.close_vs_middle_band)?,
    })
}

fn attribute(err: SigtraderError, strategy: &str) -> SigtraderError {
    match err {
        SigtraderError::InvalidStrategy { reason, .. } => {
            SigtraderError::invalid_strategy(strategy, reason)
        }
        other => other,
    }
}

pub fn run_dry_run(
    config_path: &Path,
    symbol_override: Option<&str>,
    strategy_overrides: &[String],
) -> ExitCode {
    info!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let keys = resolve_strategy_keys(strategy_overrides, &adapter);
    let strategies = match build_strategies(&adapter, &keys) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let (start, end) = match read_date_range(&adapter) {
        Ok(range) => range,
        Err(e) => return fail(&e),
    };

    eprintln!("Config validated successfully");

    eprintln!("\nRun:");
    eprintln!(
        "  symbol:   {}",
        resolve_symbol(symbol_override, &adapter).unwrap_or_default()
    );
    eprintln!("  period:   {} to {}", start, end);
    eprintln!("  data dir: {}", resolve_data_dir(&adapter).display());
    eprintln!("  report:   {}", resolve_output(None, &adapter).display());
    eprintln!(
        "  capital:  {:.2}, commission {}%, risk-free {}",
        bt_config.initial_capital, bt_config.commission_pct, bt_config.risk_free_rate
    );

    eprintln!("\nStrategies:");
    for strategy in &strategies {
        eprintln!("  {}", strategy);
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(&e);
    }
    if let Err(e) = build_backtest_config(&adapter) {
        return fail(&e);
    }

    let keys = resolve_strategy_keys(&[], &adapter);
    let strategies = match build_strategies(&adapter, &keys) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    for strategy in &strategies {
        eprintln!("  ok: {}", strategy);
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, symbol_override: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let Some(symbol) = resolve_symbol(symbol_override, &config) else {
        return fail(&SigtraderError::ConfigMissing {
            section: "backtest".into(),
            key: "symbol".into(),
        });
    };

    let data_port = CsvAdapter::new(resolve_data_dir(&config));
    match symbol_info(&data_port, &symbol) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// One-line summary of every bar on file for `symbol`.
pub fn symbol_info(data_port: &dyn DataPort, symbol: &str) -> Result<String, SigtraderError> {
    let bars = data_port.fetch_bars(symbol, NaiveDate::MIN, NaiveDate::MAX)?;
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => Ok(format!(
            "{}: {} bars, {} to {}",
            symbol,
            bars.len(),
            first.timestamp,
            last.timestamp
        )),
        _ => Err(SigtraderError::NoData {
            symbol: symbol.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn cli_parses_repeated_strategies() {
        let cli = Cli::try_parse_from([
            "sigtrader",
            "-v",
            "backtest",
            "-c",
            "run.ini",
            "--strategy",
            "sma",
            "-s",
            "combined",
            "--dry-run",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Backtest {
                strategy, dry_run, ..
            } => {
                assert_eq!(strategy, vec!["sma", "combined"]);
                assert!(dry_run);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn cli_parses_list_symbols() {
        let cli = Cli::try_parse_from(["sigtrader", "list-symbols", "--data-dir", "prices"])
            .unwrap();
        assert!(matches!(cli.command, Command::ListSymbols { .. }));
    }

    #[test]
    fn resolve_strategy_keys_prefers_overrides_and_dedups() {
        let c = config("[backtest]\nstrategies = sma, ema\n");
        assert_eq!(resolve_strategy_keys(&[], &c), vec!["sma", "ema"]);
        let overrides = vec!["COMBINED".to_string(), "combined, buy_hold".to_string()];
        assert_eq!(
            resolve_strategy_keys(&overrides, &c),
            vec!["combined", "buy_hold"]
        );
    }

    #[test]
    fn resolve_output_precedence() {
        let c = config("[report]\noutput = from_config.json\n");
        assert_eq!(
            resolve_output(Some(Path::new("cli.json")), &c),
            PathBuf::from("cli.json")
        );
        assert_eq!(resolve_output(None, &c), PathBuf::from("from_config.json"));
        assert_eq!(
            resolve_output(None, &config("[backtest]\n")),
            PathBuf::from(DEFAULT_REPORT)
        );
    }

    #[test]
    fn attribute_renames_strategy_errors_only() {
        let err = attribute(
            SigtraderError::invalid_strategy("thresholds", "bad"),
            "My Combined",
        );
        assert!(
            matches!(err, SigtraderError::InvalidStrategy { ref strategy, .. } if strategy == "My Combined")
        );
        let other = attribute(
            SigtraderError::NoData {
                symbol: "X".into(),
            },
            "ignored",
        );
        assert!(matches!(other, SigtraderError::NoData { .. }));
    }
}

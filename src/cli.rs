//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::bar::BarSeries;
use crate::domain::engine::run_backtest;
use crate::domain::error::PivotraderError;
use crate::domain::metrics::Metrics;
use crate::domain::pivot::PivotKind;
use crate::domain::pivot_detect::detect_pivots;
use crate::domain::rules::RuleConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "pivotrader", about = "Pivot-structure trading rule backtester")]
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
        /// Override the bar data directory from the config
        #[arg(long)]
        data: Option<PathBuf>,
        /// Override the symbol from the config
        #[arg(long)]
        symbol: Option<String>,
        /// Trade report CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Detect and print pivots without trading
    Pivots {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a rule configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for the configured symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            output,
        } => run_backtest_command(&config, data.as_ref(), symbol.as_deref(), output.as_ref()),
        Command::Pivots {
            config,
            data,
            symbol,
        } => run_pivots(&config, data.as_ref(), symbol.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            config,
            data,
            symbol,
        } => run_info(&config, data.as_ref(), symbol.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PivotraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Assemble the rule set from the `[rules]` section, falling back to the
/// documented defaults for any missing key.
pub fn build_rule_config(adapter: &dyn ConfigPort) -> RuleConfig {
    let defaults = RuleConfig::default();
    RuleConfig {
        entry_lph_lpl: adapter.get_bool("rules", "entry_lph_lpl", defaults.entry_lph_lpl),
        entry_sph_above_lph: adapter.get_bool(
            "rules",
            "entry_sph_above_lph",
            defaults.entry_sph_above_lph,
        ),
        gap_handling: adapter.get_bool("rules", "gap_handling", defaults.gap_handling),
        daily_reset: adapter.get_bool("rules", "daily_reset", defaults.daily_reset),
        stop_loss: adapter.get_bool("rules", "stop_loss", defaults.stop_loss),
        stop_loss_percent: adapter.get_double(
            "rules",
            "stop_loss_percent",
            defaults.stop_loss_percent,
        ),
        eod_exit: adapter.get_bool("rules", "eod_exit", defaults.eod_exit),
        trailing_spl: adapter.get_bool("rules", "trailing_spl", defaults.trailing_spl),
        aggressive_profit: adapter.get_bool(
            "rules",
            "aggressive_profit",
            defaults.aggressive_profit,
        ),
        aggressive_profit_percent: adapter.get_double(
            "rules",
            "aggressive_profit_percent",
            defaults.aggressive_profit_percent,
        ),
    }
}

/// Resolve the data directory and symbol from overrides or the `[data]`
/// section.
fn resolve_data(
    adapter: &dyn ConfigPort,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> Result<(PathBuf, String), PivotraderError> {
    let path = match data_override {
        Some(p) => p.clone(),
        None => adapter
            .get_string("data", "path")
            .map(PathBuf::from)
            .ok_or_else(|| PivotraderError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };
    let symbol = match symbol_override {
        Some(s) => s.to_string(),
        None => adapter
            .get_string("data", "symbol")
            .ok_or_else(|| PivotraderError::ConfigMissing {
                section: "data".into(),
                key: "symbol".into(),
            })?,
    };
    Ok((path, symbol))
}

fn load_series(
    adapter: &dyn ConfigPort,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> Result<(BarSeries, String), PivotraderError> {
    let (path, symbol) = resolve_data(adapter, data_override, symbol_override)?;
    eprintln!("Loading bars for {} from {}", symbol, path.display());
    let data_port = CsvAdapter::new(path);
    let bars = data_port.fetch_bars(&symbol)?;
    let series = BarSeries::new(bars)?;
    eprintln!("Loaded {} bars", series.len());
    Ok((series, symbol))
}

fn run_backtest_command(
    config_path: &PathBuf,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
    output_override: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = build_rule_config(&adapter);

    let (series, symbol) = match load_series(&adapter, data_override, symbol_override) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    eprintln!("Detecting pivots...");
    let pivots = detect_pivots(series.bars());
    eprintln!(
        "Found {} SPH, {} SPL, {} LPH, {} LPL",
        pivots.sph.len(),
        pivots.spl.len(),
        pivots.lph.len(),
        pivots.lpl.len()
    );

    eprintln!("Running backtest...");
    let report = match run_backtest(series.bars(), &pivots, &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    let metrics = Metrics::from_trades(&report.trades);
    println!("Backtest of {}: {} trades", symbol, metrics.total_trades);
    println!(
        "  points {:+.2}, win rate {:.1}%, profit factor {:.2}",
        metrics.total_points, metrics.win_rate, metrics.profit_factor
    );
    if let Some(position) = &report.open_position {
        println!(
            "  open at end of data: {} from bar {} at {:.2}",
            position.direction, position.entry_bar, position.entry_price
        );
    }

    let output = output_override
        .map(|p| p.display().to_string())
        .or_else(|| adapter.get_string("report", "output"));
    if let Some(output) = output {
        if let Err(e) = CsvReportAdapter::new().write(&report, &metrics, &output) {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
        eprintln!("Report written to {}", output);
    }

    ExitCode::SUCCESS
}

fn run_pivots(
    config_path: &PathBuf,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (series, symbol) = match load_series(&adapter, data_override, symbol_override) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    let set = detect_pivots(series.bars());
    println!("Pivots for {}:", symbol);
    for kind in [PivotKind::Sph, PivotKind::Spl, PivotKind::Lph, PivotKind::Lpl] {
        let pivots = set.pivots(kind, series.bars());
        println!("  {:?} ({}):", kind, pivots.len());
        for pivot in pivots {
            println!(
                "    bar {:>5}  {}  {:.2}",
                pivot.bar_index,
                series.bars()[pivot.bar_index].timestamp,
                pivot.price
            );
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = build_rule_config(&adapter);
    match config.validate() {
        Ok(warnings) => {
            println!("Configuration OK");
            for warning in warnings {
                println!("warning: {warning}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_info(
    config_path: &PathBuf,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (path, symbol) = match resolve_data(&adapter, data_override, symbol_override) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    let data_port = CsvAdapter::new(path);
    match data_port.data_range(&symbol) {
        Ok(Some((first, last, count))) => {
            println!("{}: {} bars, {} to {}", symbol, count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("{}: no data", symbol);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_config_defaults_when_section_is_empty() {
        let adapter = FileConfigAdapter::from_string("[rules]\n").unwrap();
        let config = build_rule_config(&adapter);
        assert_eq!(config, RuleConfig::default());
    }

    #[test]
    fn rule_config_reads_overrides() {
        let adapter = FileConfigAdapter::from_string(
            "[rules]\n\
             entry_lph_lpl = false\n\
             entry_sph_above_lph = true\n\
             gap_handling = true\n\
             stop_loss = true\n\
             stop_loss_percent = 2.5\n\
             eod_exit = true\n",
        )
        .unwrap();
        let config = build_rule_config(&adapter);
        assert!(!config.entry_lph_lpl);
        assert!(config.entry_sph_above_lph);
        assert!(config.gap_handling);
        assert!(config.stop_loss);
        assert_eq!(config.stop_loss_percent, 2.5);
        assert!(config.eod_exit);
        assert!(!config.trailing_spl);
    }

    #[test]
    fn resolve_data_prefers_overrides() {
        let adapter =
            FileConfigAdapter::from_string("[data]\npath = /cfg/bars\nsymbol = XJO\n").unwrap();

        let (path, symbol) = resolve_data(&adapter, None, None).unwrap();
        assert_eq!(path, PathBuf::from("/cfg/bars"));
        assert_eq!(symbol, "XJO");

        let cli_path = PathBuf::from("/cli/bars");
        let (path, symbol) = resolve_data(&adapter, Some(&cli_path), Some("SPI")).unwrap();
        assert_eq!(path, cli_path);
        assert_eq!(symbol, "SPI");
    }

    #[test]
    fn resolve_data_reports_missing_keys() {
        let adapter = FileConfigAdapter::from_string("[data]\npath = /cfg/bars\n").unwrap();
        let err = resolve_data(&adapter, None, None).unwrap_err();
        assert!(matches!(err, PivotraderError::ConfigMissing { .. }));
    }
}

//! End-to-end tests: data port -> series validation -> pivot detection ->
//! backtest -> report.

mod common;

use common::{make_bars, make_day_bars, MockDataPort};
use pivotrader::adapters::csv_adapter::CsvAdapter;
use pivotrader::adapters::csv_report_adapter::CsvReportAdapter;
use pivotrader::adapters::file_config_adapter::FileConfigAdapter;
use pivotrader::cli::build_rule_config;
use pivotrader::domain::bar::BarSeries;
use pivotrader::domain::engine::run_backtest;
use pivotrader::domain::entry::EntryRule;
use pivotrader::domain::exit::ExitRule;
use pivotrader::domain::metrics::Metrics;
use pivotrader::domain::pivot::PivotSet;
use pivotrader::domain::pivot_detect::detect_pivots;
use pivotrader::domain::position::Direction;
use pivotrader::domain::rules::RuleConfig;
use pivotrader::ports::data_port::DataPort;
use pivotrader::ports::report_port::ReportPort;
use proptest::prelude::*;

/// Uptrend with pullbacks, a breakdown through the 97 low, and a closing
/// rally through the 113 high. Detection worked by hand: SPH at 0/5/9,
/// SPL at 2/7/13, LPH at 9 (113.0), LPL at 2 (97.0) and 13 (96.0).
fn zigzag_rally() -> Vec<common::Bar> {
    make_day_bars(&[
        (100.0, 105.0, 99.0, 104.0),
        (103.0, 104.0, 98.0, 100.0),
        (99.0, 103.0, 97.0, 99.0),
        (100.0, 106.0, 100.0, 105.0),
        (105.0, 110.0, 104.0, 109.0),
        (109.0, 111.0, 103.5, 105.0),
        (104.0, 106.0, 102.0, 103.0),
        (103.0, 107.0, 101.0, 106.5),
        (106.0, 112.0, 105.0, 111.0),
        (110.0, 113.0, 104.0, 108.0),
        (107.0, 108.0, 103.0, 104.0),
        (104.0, 106.0, 100.0, 105.0),
        (105.0, 107.0, 99.0, 101.0),
        (100.0, 104.0, 96.0, 97.0),
        (97.5, 99.0, 96.5, 98.5),
        (99.0, 105.0, 98.5, 104.0),
        (104.0, 110.0, 103.0, 109.0),
        (109.0, 114.0, 108.0, 113.5),
    ])
}

#[test]
fn full_pipeline_detects_and_trades() {
    let port = MockDataPort::new().with_bars("XJO", zigzag_rally());
    let bars = port.fetch_bars("XJO").unwrap();
    let series = BarSeries::new(bars).unwrap();

    let pivots = detect_pivots(series.bars());
    assert_eq!(pivots.sph, vec![0, 5, 9]);
    assert_eq!(pivots.spl, vec![2, 7, 13]);
    assert_eq!(pivots.lph, vec![9]);
    assert_eq!(pivots.lpl, vec![2, 13]);

    let config = RuleConfig {
        stop_loss: true,
        eod_exit: true,
        ..RuleConfig::default()
    };
    let report = run_backtest(series.bars(), &pivots, &config).unwrap();

    assert_eq!(report.trades.len(), 2);
    assert!(report.open_position.is_none());

    // Bar 13 trades through the 97.0 LPL; the next bar runs the stop.
    let short = &report.trades[0];
    assert_eq!(short.direction, Direction::Short);
    assert_eq!(short.entry_bar, 13);
    assert!((short.entry_price - 96.95).abs() < 1e-9);
    assert_eq!(short.exit_bar, 14);
    assert_eq!(short.exit_rule, ExitRule::StopLoss);
    assert!((short.exit_price - 97.95).abs() < 1e-9);
    assert!((short.points - (-1.0)).abs() < 1e-9);
    assert!(!short.is_win);

    // The final bar breaks the 113.0 LPH and closes the same bar on EOD.
    let long = &report.trades[1];
    assert_eq!(long.direction, Direction::Long);
    assert_eq!(long.entry_rule, EntryRule::LevelBreakout);
    assert_eq!(long.entry_bar, 17);
    assert!((long.entry_price - 113.05).abs() < 1e-9);
    assert_eq!(long.exit_bar, 17);
    assert_eq!(long.exit_rule, ExitRule::EndOfDay);
    assert!((long.exit_price - 113.5).abs() < 1e-9);
    assert!(long.is_win);
}

#[test]
fn open_position_is_reported_when_eod_exit_is_disabled() {
    let series = BarSeries::new(zigzag_rally()).unwrap();
    let pivots = detect_pivots(series.bars());
    let config = RuleConfig {
        stop_loss: true,
        eod_exit: false,
        ..RuleConfig::default()
    };
    let report = run_backtest(series.bars(), &pivots, &config).unwrap();

    // Only the stop-out completes; the final-bar long stays open.
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].exit_rule, ExitRule::StopLoss);

    let open = report.open_position.expect("position should remain open");
    assert_eq!(open.direction, Direction::Long);
    assert_eq!(open.entry_bar, 17);
    assert!((open.entry_price - 113.05).abs() < 1e-9);
}

#[test]
fn traded_level_persists_across_days_without_daily_reset() {
    let bars = make_bars(&[
        (15, 104.0, 105.0, 103.0, 104.5),
        (15, 104.0, 104.5, 103.5, 104.0),
        (15, 104.5, 106.0, 104.0, 105.5), // trades the 105 level
        (16, 105.5, 106.5, 105.2, 106.0), // breaks again, never retests
        (16, 106.0, 107.0, 105.8, 106.8),
    ]);
    let pivots = PivotSet {
        lph: vec![0],
        ..PivotSet::default()
    };

    let keep = RuleConfig {
        eod_exit: true,
        daily_reset: false,
        ..RuleConfig::default()
    };
    let report = run_backtest(&bars, &pivots, &keep).unwrap();
    assert_eq!(report.trades.len(), 1);

    let reset = RuleConfig {
        eod_exit: true,
        daily_reset: true,
        ..RuleConfig::default()
    };
    let report = run_backtest(&bars, &pivots, &reset).unwrap();
    assert_eq!(report.trades.len(), 2);
}

#[test]
fn csv_files_round_trip_through_the_report() {
    use std::fmt::Write as _;
    use std::io::Write as _;

    let dir = tempfile::TempDir::new().unwrap();
    let mut csv = String::from("timestamp,open,high,low,close,volume\n");
    for bar in zigzag_rally() {
        writeln!(
            csv,
            "{},{},{},{},{},{}",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        )
        .unwrap();
    }
    let mut file = std::fs::File::create(dir.path().join("XJO.csv")).unwrap();
    file.write_all(csv.as_bytes()).unwrap();

    let config_adapter = FileConfigAdapter::from_string(
        "[rules]\nstop_loss = true\neod_exit = true\n",
    )
    .unwrap();
    let config = build_rule_config(&config_adapter);

    let data_port = CsvAdapter::new(dir.path().to_path_buf());
    let series = BarSeries::new(data_port.fetch_bars("XJO").unwrap()).unwrap();
    let pivots = detect_pivots(series.bars());
    let report = run_backtest(series.bars(), &pivots, &config).unwrap();
    let metrics = Metrics::from_trades(&report.trades);

    let output = dir.path().join("trades.csv");
    CsvReportAdapter::new()
        .write(&report, &metrics, output.to_str().unwrap())
        .unwrap();

    let trades_csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(trades_csv.lines().count(), 3); // header + two trades
    assert!(trades_csv.contains("Short"));
    assert!(trades_csv.contains("Long"));

    let summary = std::fs::read_to_string(dir.path().join("trades.txt")).unwrap();
    assert!(summary.contains("Trades:                 2"));
    assert!(summary.contains("Wins / Losses:          1 / 1"));
}

fn arb_bars(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<common::Bar>> {
    prop::collection::vec(
        (50.0f64..150.0, 50.0f64..150.0, 0.0f64..5.0, 0.0f64..5.0),
        min_len..=max_len,
    )
    .prop_map(|rows| {
        let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(open, close, up, down))| common::Bar {
                index: i,
                timestamp: base + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + up,
                low: open.min(close) - down,
                close,
                volume: 1000,
            })
            .collect()
    })
}

proptest! {
    /// Trade conservation and points sign hold on arbitrary data.
    #[test]
    fn backtest_invariants_hold(bars in arb_bars(3, 80)) {
        let pivots = detect_pivots(&bars);
        let config = RuleConfig {
            stop_loss: true,
            eod_exit: true,
            ..RuleConfig::default()
        };
        let report = run_backtest(&bars, &pivots, &config).unwrap();

        // EOD exit force-closes anything still open.
        prop_assert!(report.open_position.is_none());

        let mut last_exit = 0usize;
        for trade in &report.trades {
            prop_assert!(trade.exit_bar >= trade.entry_bar);
            prop_assert!(trade.entry_bar >= last_exit);
            last_exit = trade.exit_bar;

            let expected = (trade.exit_price - trade.entry_price) * trade.direction.sign();
            prop_assert!((trade.points - expected).abs() < 1e-9);
            prop_assert_eq!(trade.is_win, trade.points > 0.0);
            prop_assert_eq!(trade.duration_bars, trade.exit_bar - trade.entry_bar);
        }
    }
}

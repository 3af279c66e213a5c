//! CSV trade report adapter.
//!
//! Writes the trade list as CSV at the requested path and a plain-text
//! summary next to it (same stem, `.txt` extension).

use crate::domain::engine::BacktestReport;
use crate::domain::error::PivotraderError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn format_summary(report: &BacktestReport, metrics: &Metrics) -> String {
        let mut out = String::new();
        out.push_str("Backtest Summary\n");
        out.push_str("================\n");
        out.push_str(&format!("Trades:                 {}\n", metrics.total_trades));
        out.push_str(&format!(
            "Wins / Losses:          {} / {}\n",
            metrics.wins, metrics.losses
        ));
        out.push_str(&format!("Win rate:               {:.1}%\n", metrics.win_rate));
        out.push_str(&format!("Total points:           {:.2}\n", metrics.total_points));
        out.push_str(&format!(
            "Profit factor:          {:.2}\n",
            metrics.profit_factor
        ));
        out.push_str(&format!(
            "Average win / loss:     {:.2} / {:.2}\n",
            metrics.average_win, metrics.average_loss
        ));
        out.push_str(&format!(
            "Largest win / loss:     {:.2} / {:.2}\n",
            metrics.largest_win, metrics.largest_loss
        ));
        out.push_str(&format!(
            "Average duration:       {:.1} bars\n",
            metrics.average_duration_bars
        ));
        out.push_str(&format!(
            "Max consecutive losses: {}\n",
            metrics.max_consecutive_losses
        ));

        if let Some(position) = &report.open_position {
            out.push_str(&format!(
                "\nOpen position at end of data: {} from bar {} at {:.2} ({})\n",
                position.direction, position.entry_bar, position.entry_price,
                position.entry_label
            ));
        }
        for warning in &report.warnings {
            out.push_str(&format!("\nWarning: {}\n", warning));
        }
        out
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        report: &BacktestReport,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), PivotraderError> {
        let mut writer = csv::Writer::from_path(output_path).map_err(|e| {
            PivotraderError::Data {
                reason: format!("failed to open {}: {}", output_path, e),
            }
        })?;

        writer
            .write_record([
                "trade_id",
                "direction",
                "entry_bar",
                "entry_price",
                "entry_rule",
                "exit_bar",
                "exit_price",
                "exit_rule",
                "points",
                "duration_bars",
                "win",
            ])
            .map_err(|e| PivotraderError::Data {
                reason: format!("CSV write error: {}", e),
            })?;

        for trade in &report.trades {
            writer
                .write_record([
                    trade.trade_id.to_string(),
                    trade.direction.to_string(),
                    trade.entry_bar.to_string(),
                    format!("{:.2}", trade.entry_price),
                    trade.entry_label.to_string(),
                    trade.exit_bar.to_string(),
                    format!("{:.2}", trade.exit_price),
                    trade.exit_label.to_string(),
                    format!("{:.2}", trade.points),
                    trade.duration_bars.to_string(),
                    trade.is_win.to_string(),
                ])
                .map_err(|e| PivotraderError::Data {
                    reason: format!("CSV write error: {}", e),
                })?;
        }
        writer.flush()?;

        let summary_path = Path::new(output_path).with_extension("txt");
        fs::write(&summary_path, Self::format_summary(report, metrics))?;
        Ok(())
    }
}

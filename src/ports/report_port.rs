//! Report generation port trait.

use crate::domain::engine::BacktestReport;
use crate::domain::error::PivotraderError;
use crate::domain::metrics::Metrics;

pub trait ReportPort {
    fn write(
        &self,
        report: &BacktestReport,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), PivotraderError>;
}

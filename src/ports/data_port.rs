//! Bar data access port trait.

use crate::domain::bar::Bar;
use crate::domain::error::PivotraderError;
use chrono::NaiveDateTime;

pub trait DataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, PivotraderError>;

    /// First timestamp, last timestamp and bar count, or `None` when the
    /// symbol has no data.
    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, PivotraderError>;
}

//! CSV file data adapter.
//!
//! Expects one file per symbol under the base path, named `<symbol>.csv`,
//! with the header `timestamp,open,high,low,close,volume`.

use crate::domain::bar::Bar;
use crate::domain::error::PivotraderError;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Intraday timestamps, or a bare date normalized to midnight.
    fn parse_timestamp(value: &str) -> Result<NaiveDateTime, PivotraderError> {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
            return Ok(ts);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
            .map_err(|e| PivotraderError::Data {
                reason: format!("invalid timestamp {:?}: {}", value, e),
            })
    }

    fn field<'a>(
        record: &'a csv::StringRecord,
        index: usize,
        name: &str,
        row: usize,
    ) -> Result<&'a str, PivotraderError> {
        record.get(index).ok_or_else(|| PivotraderError::Data {
            reason: format!("row {}: missing {} column", row, name),
        })
    }

    fn parse_number<T: std::str::FromStr>(
        value: &str,
        name: &str,
        row: usize,
    ) -> Result<T, PivotraderError>
    where
        T::Err: std::fmt::Display,
    {
        value.parse().map_err(|e| PivotraderError::Data {
            reason: format!("row {}: invalid {} value {:?}: {}", row, name, value, e),
        })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, PivotraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| PivotraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| PivotraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp = Self::parse_timestamp(Self::field(&record, 0, "timestamp", row)?)?;
            let open = Self::parse_number(Self::field(&record, 1, "open", row)?, "open", row)?;
            let high = Self::parse_number(Self::field(&record, 2, "high", row)?, "high", row)?;
            let low = Self::parse_number(Self::field(&record, 3, "low", row)?, "low", row)?;
            let close = Self::parse_number(Self::field(&record, 4, "close", row)?, "close", row)?;
            let volume =
                Self::parse_number(Self::field(&record, 5, "volume", row)?, "volume", row)?;

            bars.push(Bar {
                index: 0,
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.index = i;
        }
        Ok(bars)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, PivotraderError> {
        let bars = self.fetch_bars(symbol)?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => {
                Ok(Some((first.timestamp, last.timestamp, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

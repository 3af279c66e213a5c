#![allow(dead_code)]

use chrono::NaiveDate;
pub use pivotrader::domain::bar::Bar;
use pivotrader::domain::error::PivotraderError;
use pivotrader::ports::data_port::DataPort;
use std::collections::HashMap;

/// Build bars from `(day, open, high, low, close)` rows, one minute apart,
/// all in January 2024.
pub fn make_bars(rows: &[(u32, f64, f64, f64, f64)]) -> Vec<Bar> {
    rows.iter()
        .enumerate()
        .map(|(i, &(day, open, high, low, close))| Bar {
            index: i,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, i as u32, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume: 100,
        })
        .collect()
}

/// Same rows, single trading day.
pub fn make_day_bars(rows: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let with_day: Vec<(u32, f64, f64, f64, f64)> = rows
        .iter()
        .map(|&(o, h, l, c)| (15u32, o, h, l, c))
        .collect();
    make_bars(&with_day)
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, PivotraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(PivotraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(chrono::NaiveDateTime, chrono::NaiveDateTime, usize)>, PivotraderError>
    {
        let bars = self.fetch_bars(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }
}
